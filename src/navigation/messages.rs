use serde::{Deserialize, Serialize};

use crate::capture::capture_model::{ElementRecord, PageRecord};
use crate::registry::registry_model::RegistryMap;

/// Messages exchanged between the background service, page contexts and
/// the popup. Serialized as `{"action": "<name>", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    EnableCapture,
    DisableCapture,
    CheckPendingNavigation { resume_capture: bool },
    CaptureModeChanged { is_enabled: bool },
    TemporaryDisableForNavigation { last_element_id: String },
    SetPlatformKey { platform_key: String },
    ImportIdRegistry { data: RegistryMap },
    LogCapturedElement { data: ElementRecord },
    LogCapturedPage { data: PageRecord },
}

impl Message {
    pub fn action(&self) -> &'static str {
        match self {
            Message::EnableCapture => "enableCapture",
            Message::DisableCapture => "disableCapture",
            Message::CheckPendingNavigation { .. } => "checkPendingNavigation",
            Message::CaptureModeChanged { .. } => "captureModeChanged",
            Message::TemporaryDisableForNavigation { .. } => "temporaryDisableForNavigation",
            Message::SetPlatformKey { .. } => "setPlatformKey",
            Message::ImportIdRegistry { .. } => "importIdRegistry",
            Message::LogCapturedElement { .. } => "logCapturedElement",
            Message::LogCapturedPage { .. } => "logCapturedPage",
        }
    }

    /// Whether a page context receiving this message should be capturing.
    /// `None` for messages that do not change capture mode.
    pub fn capture_intent(&self) -> Option<bool> {
        match self {
            Message::EnableCapture => Some(true),
            Message::DisableCapture => Some(false),
            Message::CaptureModeChanged { is_enabled } => Some(*is_enabled),
            Message::CheckPendingNavigation { resume_capture } => resume_capture.then_some(true),
            _ => None,
        }
    }
}
