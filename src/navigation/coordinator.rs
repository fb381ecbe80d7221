use std::time::Duration;

use tracing::{debug, info, warn};

use super::channel::TabId;
use super::messages::Message;
use super::session_state::{CaptureSessionState, CaptureState};

/// How long the pending-navigation banner may stay up without a confirmed
/// resume.
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(5);

/// Side effects requested by a transition. The caller owns the channel and
/// the timers and carries these out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Single fire-and-forget send.
    Notify { tab: TabId, message: Message },
    /// Send under the retry policy and report back via `resume_settled`.
    Resume { tab: TabId, message: Message },
    /// (Re)start the banner timer.
    ArmBannerClear,
    DisarmBannerClear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("capture is not active (state {0:?})")]
    NotActive(CaptureState),
}

/// Capture-mode state machine that survives page loads.
///
/// The resume latch is in-memory only. After a restart the coordinator is
/// rebuilt with `recover`, the latch is gone, and pages pick capture back up
/// through the ordinary capture-mode check.
#[derive(Debug, Clone)]
pub struct NavigationCoordinator {
    state: CaptureState,
    resume_latch: bool,
}

impl Default for NavigationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationCoordinator {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            resume_latch: false,
        }
    }

    /// Rebuild from durable state after a (re)start.
    pub fn recover(session: &CaptureSessionState) -> Self {
        let state = if session.capture_mode {
            CaptureState::Active
        } else {
            CaptureState::Idle
        };
        Self {
            state,
            resume_latch: false,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn resume_latched(&self) -> bool {
        self.resume_latch
    }

    pub fn is_capturing(&self) -> bool {
        self.state == CaptureState::Active
    }

    /// Idle -> Active. Idempotent when capture is already on.
    pub fn toggle_on(&mut self, session: &mut CaptureSessionState, tab: Option<TabId>) -> Vec<Effect> {
        if self.state == CaptureState::Idle {
            self.state = CaptureState::Active;
            info!("capture enabled");
        }
        session.capture_mode = true;

        tab.map(|tab| Effect::Notify {
            tab,
            message: Message::EnableCapture,
        })
        .into_iter()
        .collect()
    }

    /// Any state -> Idle. Cancels a pending resume.
    pub fn toggle_off(&mut self, session: &mut CaptureSessionState, tab: Option<TabId>) -> Vec<Effect> {
        if self.resume_latch {
            debug!("cancelling pending resume");
        }
        self.state = CaptureState::Idle;
        self.resume_latch = false;
        session.capture_mode = false;
        session.pending_navigation = false;
        info!("capture disabled");

        let mut effects = vec![Effect::DisarmBannerClear];
        if let Some(tab) = tab {
            effects.push(Effect::Notify {
                tab,
                message: Message::DisableCapture,
            });
        }
        effects
    }

    /// An element was captured. With `navigates` set this suspends capture
    /// until the next page finishes loading; `capture_mode` stays on because
    /// the suspension only concerns the current page instance.
    pub fn element_captured(
        &mut self,
        session: &mut CaptureSessionState,
        element_id: &str,
        navigates: bool,
    ) -> Result<Vec<Effect>, TransitionError> {
        if self.state != CaptureState::Active {
            return Err(TransitionError::NotActive(self.state));
        }

        session.last_element_id = Some(element_id.to_string());
        if !navigates {
            return Ok(Vec::new());
        }

        self.state = CaptureState::SuspendedForNavigation;
        self.resume_latch = true;
        session.pending_navigation = true;
        session.last_navigation_element_id = Some(element_id.to_string());
        info!(element_id, "capture suspended for navigation");

        Ok(vec![Effect::ArmBannerClear])
    }

    /// The browser reports that the page in `tab` finished loading.
    pub fn page_loaded(&mut self, session: &CaptureSessionState, tab: TabId) -> Vec<Effect> {
        if self.state == CaptureState::SuspendedForNavigation && self.resume_latch {
            self.state = CaptureState::ResumeScheduled;
            self.resume_latch = false;
            info!(%tab, "page loaded, resuming capture");
            return vec![Effect::Resume {
                tab,
                message: Message::CheckPendingNavigation {
                    resume_capture: true,
                },
            }];
        }

        if session.capture_mode {
            return vec![Effect::Notify {
                tab,
                message: Message::CaptureModeChanged { is_enabled: true },
            }];
        }

        Vec::new()
    }

    /// Outcome of the resume delivery started by `page_loaded`. Either way the
    /// coordinator goes back to Active; an unconfirmed resume leaves the
    /// banner to its timer and the operator to re-toggle if needed.
    pub fn resume_settled(&mut self, session: &mut CaptureSessionState, delivered: bool) -> Vec<Effect> {
        if self.state != CaptureState::ResumeScheduled {
            debug!(state = ?self.state, "ignoring stale resume result");
            return Vec::new();
        }

        self.state = CaptureState::Active;
        if delivered {
            session.pending_navigation = false;
            vec![Effect::DisarmBannerClear]
        } else {
            warn!("resume was not confirmed by the page; capture may need re-enabling");
            Vec::new()
        }
    }

    /// The banner timer fired. Only the durable flag is touched.
    pub fn banner_expired(&mut self, session: &mut CaptureSessionState) {
        if session.pending_navigation {
            debug!("clearing stale pending-navigation banner");
        }
        session.pending_navigation = false;
    }

    /// Operator reset: back to Idle with an empty session.
    pub fn reset(&mut self, session: &mut CaptureSessionState) -> Vec<Effect> {
        self.state = CaptureState::Idle;
        self.resume_latch = false;
        *session = CaptureSessionState::default();
        vec![Effect::DisarmBannerClear]
    }
}
