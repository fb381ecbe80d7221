use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::store::{Store, StoreError};

/// Coordinator states. Only the coordinator's process holds this; the
/// durable side is `CaptureSessionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Idle,
    Active,
    SuspendedForNavigation,
    ResumeScheduled,
}

/// Durable capture flags for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSessionState {
    pub capture_mode: bool,

    /// Continuity anchor: the most recently captured element.
    pub last_element_id: Option<String>,

    /// Drives the "navigating..." banner; not the resume trigger.
    pub pending_navigation: bool,

    pub last_navigation_element_id: Option<String>,
}

impl CaptureSessionState {
    pub fn load(store: &dyn Store, platform: &str) -> Result<Self, StoreError> {
        Ok(Self {
            capture_mode: keys::read(store, &keys::scoped(platform, keys::CAPTURE_MODE))?
                .unwrap_or(false),
            last_element_id: keys::read(store, &keys::scoped(platform, keys::LAST_ELEMENT_ID))?,
            pending_navigation: keys::read(
                store,
                &keys::scoped(platform, keys::PENDING_NAVIGATION),
            )?
            .unwrap_or(false),
            last_navigation_element_id: keys::read(
                store,
                &keys::scoped(platform, keys::LAST_NAVIGATION_ELEMENT_ID),
            )?,
        })
    }

    pub fn save(&self, store: &mut dyn Store, platform: &str) -> Result<(), StoreError> {
        keys::write(store, &keys::scoped(platform, keys::CAPTURE_MODE), &self.capture_mode)?;
        keys::write_optional(
            store,
            &keys::scoped(platform, keys::LAST_ELEMENT_ID),
            self.last_element_id.as_ref(),
        )?;
        keys::write(
            store,
            &keys::scoped(platform, keys::PENDING_NAVIGATION),
            &self.pending_navigation,
        )?;
        keys::write_optional(
            store,
            &keys::scoped(platform, keys::LAST_NAVIGATION_ELEMENT_ID),
            self.last_navigation_element_id.as_ref(),
        )
    }

    /// Remove every platform-scoped key, records included.
    pub fn clear(store: &mut dyn Store, platform: &str) -> Result<(), StoreError> {
        for key in keys::PLATFORM_SCOPED {
            store.remove(&keys::scoped(platform, key))?;
        }
        Ok(())
    }
}
