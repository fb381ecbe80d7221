use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dom::dom_model::DomElement;
use crate::export::export_model::ExportReport;

use super::error::JourneyError;

/// An operator session written down as YAML, replayed through the capture
/// system by `JourneyRunner`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JourneyScript {
    pub name: String,

    /// Platform key set before the first step. The active platform is kept
    /// when omitted.
    #[serde(default)]
    pub platform: Option<String>,

    pub steps: Vec<JourneyStep>,
}

impl JourneyScript {
    pub fn from_yaml(content: &str) -> Result<Self, JourneyError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, JourneyError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| JourneyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum JourneyStep {
    /// Popup toggle on
    EnableCapture,

    /// Popup toggle off
    DisableCapture,

    /// Navigate the tab to a new page. The old page context is torn down and
    /// a new one attached once the page has loaded.
    Visit {
        url: String,
        title: String,
        #[serde(default)]
        framework: Option<String>,
        /// Delay between load-complete and the page context attaching,
        /// for pages whose capture surface comes up late.
        #[serde(default)]
        attach_delay_ms: Option<u64>,
    },

    MarkPage,

    MarkElement {
        element: DomElement,
        description: String,
        #[serde(default)]
        kpi: Option<String>,
        #[serde(default)]
        navigates: bool,
    },

    /// Load-complete without navigation (a reload).
    PageLoaded,

    Wait {
        duration_ms: u64,
    },

    ResetSession,
}

impl JourneyStep {
    pub fn action(&self) -> &'static str {
        match self {
            JourneyStep::EnableCapture => "enable_capture",
            JourneyStep::DisableCapture => "disable_capture",
            JourneyStep::Visit { .. } => "visit",
            JourneyStep::MarkPage => "mark_page",
            JourneyStep::MarkElement { .. } => "mark_element",
            JourneyStep::PageLoaded => "page_loaded",
            JourneyStep::Wait { .. } => "wait",
            JourneyStep::ResetSession => "reset_session",
        }
    }
}

/// Result of replaying a journey script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyResult {
    pub name: String,

    /// Every step succeeded
    pub passed: bool,

    pub steps_run: usize,

    /// Error that stopped the replay
    pub error: Option<String>,

    /// Export taken after the last step, if the service was still reachable
    pub export: Option<ExportReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_parse_from_yaml() {
        let script = JourneyScript::from_yaml(
            r#"
name: settings flow
platform: crm
steps:
  - action: enable_capture
  - action: visit
    url: https://crm.example.com/dashboard
    title: Dashboard
  - action: mark_element
    element:
      tag: button
      attributes:
        id: settings-button
    description: go to settings
    navigates: true
  - action: wait
    duration_ms: 250
"#,
        )
        .unwrap();

        assert_eq!(script.platform.as_deref(), Some("crm"));
        assert_eq!(script.steps.len(), 4);
        assert_eq!(script.steps[0], JourneyStep::EnableCapture);
        match &script.steps[2] {
            JourneyStep::MarkElement {
                element,
                navigates,
                kpi,
                ..
            } => {
                assert_eq!(element.id(), Some("settings-button"));
                assert!(*navigates);
                assert!(kpi.is_none());
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(script.steps[3].action(), "wait");
    }

    #[test]
    fn unknown_actions_are_rejected() {
        let err = JourneyScript::from_yaml("name: x\nsteps:\n  - action: teleport\n").unwrap_err();
        assert!(matches!(err, JourneyError::Parse(_)));
    }
}
