use std::time::Duration;

use tracing::{debug, info, warn};

use crate::background::handle::BackgroundHandle;
use crate::capture::page_context::PageContext;
use crate::navigation::channel::{InMemoryChannel, TabId};
use crate::navigation::session_state::CaptureState;

use super::error::JourneyError;
use super::journey_model::{JourneyResult, JourneyScript, JourneyStep};

const SETTLE_POLL: Duration = Duration::from_millis(25);

/// Replays a journey script against a running background service.
///
/// The runner plays the browser: it owns one tab on an `InMemoryChannel`,
/// tears page contexts down on navigation and attaches fresh ones, and
/// hands every message the background sends to the current page.
pub struct JourneyRunner {
    handle: BackgroundHandle,
    channel: InMemoryChannel,
    tab: TabId,
    page: Option<PageContext>,
}

impl JourneyRunner {
    pub fn new(handle: BackgroundHandle, channel: InMemoryChannel, tab: TabId) -> Self {
        Self {
            handle,
            channel,
            tab,
            page: None,
        }
    }

    /// The page context currently attached, if any.
    pub fn page(&self) -> Option<&PageContext> {
        self.page.as_ref()
    }

    /// Run every step in order, stopping at the first error.
    pub async fn run(&mut self, script: &JourneyScript) -> JourneyResult {
        info!(journey = %script.name, steps = script.steps.len(), "replaying journey");

        let mut steps_run = 0;
        let mut error = None;

        if let Some(platform) = &script.platform {
            if let Err(e) = self.handle.set_platform(platform).await {
                error = Some(format!("Failed to set platform '{}': {}", platform, e));
            }
        }

        if error.is_none() {
            for (i, step) in script.steps.iter().enumerate() {
                steps_run = i + 1;
                if let Err(e) = self.execute_step(step).await {
                    warn!(step = i, action = step.action(), error = %e, "journey step failed");
                    error = Some(format!("Step {} ({}) failed: {}", i, step.action(), e));
                    break;
                }
                self.deliver_inbox();
            }
        }

        let export = match self.handle.export().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "export after replay failed");
                None
            }
        };

        JourneyResult {
            name: script.name.clone(),
            passed: error.is_none(),
            steps_run,
            error,
            export,
        }
    }

    async fn execute_step(&mut self, step: &JourneyStep) -> Result<(), JourneyError> {
        debug!(action = step.action(), "journey step");
        match step {
            JourneyStep::EnableCapture => Ok(self.handle.enable_capture(Some(self.tab)).await?),

            JourneyStep::DisableCapture => Ok(self.handle.disable_capture(Some(self.tab)).await?),

            JourneyStep::Visit {
                url,
                title,
                framework,
                attach_delay_ms,
            } => {
                self.teardown();

                match attach_delay_ms {
                    Some(delay) => {
                        self.handle.page_loaded(self.tab).await?;
                        tokio::time::sleep(Duration::from_millis(*delay)).await;
                        self.attach(url, title, framework.as_deref()).await?;
                    }
                    None => {
                        self.attach(url, title, framework.as_deref()).await?;
                        self.handle.page_loaded(self.tab).await?;
                    }
                }
                self.settle().await
            }

            JourneyStep::MarkPage => {
                let page = self.page.as_mut().ok_or(JourneyError::NoPage("mark_page"))?;
                page.mark_page().await?;
                Ok(())
            }

            JourneyStep::MarkElement {
                element,
                description,
                kpi,
                navigates,
            } => {
                let page = self.page.as_mut().ok_or(JourneyError::NoPage("mark_element"))?;
                page.mark_element(element, description, kpi.as_deref(), *navigates)
                    .await?;
                Ok(())
            }

            JourneyStep::PageLoaded => {
                self.handle.page_loaded(self.tab).await?;
                self.settle().await
            }

            JourneyStep::Wait { duration_ms } => {
                tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
                Ok(())
            }

            JourneyStep::ResetSession => Ok(self.handle.reset_session(Some(self.tab)).await?),
        }
    }

    fn teardown(&mut self) {
        if self.page.take().is_some() {
            debug!(tab = %self.tab, "page context torn down");
        }
        self.channel.detach(self.tab);
    }

    async fn attach(&mut self, url: &str, title: &str, framework: Option<&str>) -> Result<(), JourneyError> {
        self.channel.attach(self.tab);
        let page = PageContext::attach(self.handle.clone(), self.tab, url, title, framework).await?;
        self.page = Some(page);
        Ok(())
    }

    /// Wait until a scheduled resume has been delivered or given up on.
    async fn settle(&mut self) -> Result<(), JourneyError> {
        loop {
            self.deliver_inbox();
            if self.handle.session().await?.state != CaptureState::ResumeScheduled {
                return Ok(());
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
    }

    fn deliver_inbox(&mut self) {
        let messages = self.channel.drain(self.tab);
        match self.page.as_mut() {
            Some(page) => {
                for message in &messages {
                    page.handle_message(message);
                }
            }
            None if !messages.is_empty() => {
                debug!(count = messages.len(), "dropping messages for a tab with no page");
            }
            None => {}
        }
    }
}
