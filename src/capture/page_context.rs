use tracing::{debug, info};

use crate::background::error::BackgroundError;
use crate::background::handle::{BackgroundHandle, ElementCapture, PageVisit};
use crate::dom::dom_model::DomElement;
use crate::navigation::channel::TabId;
use crate::navigation::messages::Message;

use super::capture_model::ElementRecord;
use super::error::CaptureError;
use super::orchestrator::validate_description;

/// Per-page capture surface. One instance lives for one page load; a
/// navigation tears it down and the next page attaches a fresh one.
#[derive(Debug)]
pub struct PageContext {
    handle: BackgroundHandle,
    tab: TabId,
    url: String,
    title: String,
    framework: Option<String>,
    page_id: Option<String>,
    capturing: bool,
}

impl PageContext {
    /// Attach to a freshly loaded page and pick up the durable capture mode.
    pub async fn attach(
        handle: BackgroundHandle,
        tab: TabId,
        url: &str,
        title: &str,
        framework: Option<&str>,
    ) -> Result<Self, BackgroundError> {
        let capturing = handle.session().await?.session.capture_mode;
        debug!(%tab, url, capturing, "page context attached");

        Ok(Self {
            handle,
            tab,
            url: url.to_string(),
            title: title.to_string(),
            framework: framework.map(str::to_string),
            page_id: None,
            capturing,
        })
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn page_id(&self) -> Option<&str> {
        self.page_id.as_deref()
    }

    /// Record this page. Safe to call repeatedly.
    pub async fn mark_page(&mut self) -> Result<String, BackgroundError> {
        let visit = PageVisit {
            url: self.url.clone(),
            title: self.title.clone(),
            framework: self.framework.clone(),
        };
        let capture = self.handle.capture_page(visit, Some(self.tab)).await?;
        let page_id = capture.page_id().to_string();
        self.page_id = Some(page_id.clone());
        Ok(page_id)
    }

    /// Capture `element` with an operator description. The page is marked
    /// first when that has not happened yet. A `navigates` capture stops
    /// local capture until the background resumes it on the next page.
    pub async fn mark_element(
        &mut self,
        element: &DomElement,
        description: &str,
        kpi: Option<&str>,
        navigates: bool,
    ) -> Result<ElementRecord, BackgroundError> {
        if !self.capturing {
            return Err(CaptureError::CaptureDisabled.into());
        }
        let description = validate_description(description)?;

        let page_id = match &self.page_id {
            Some(id) => id.clone(),
            None => self.mark_page().await?,
        };

        let capture = ElementCapture {
            page_id,
            element: element.clone(),
            description,
            kpi: kpi.map(str::to_string),
            navigates,
        };
        let record = self.handle.capture_element(capture, Some(self.tab)).await?;

        if navigates {
            self.capturing = false;
            info!(tab = %self.tab, element_id = %record.element_id, "navigating, capture paused on this page");
        }
        Ok(record)
    }

    /// Apply a message delivered by the background service.
    pub fn handle_message(&mut self, message: &Message) {
        match message.capture_intent() {
            Some(enabled) => {
                if enabled != self.capturing {
                    debug!(tab = %self.tab, action = message.action(), enabled, "capture mode changed");
                }
                self.capturing = enabled;
            }
            None => debug!(tab = %self.tab, action = message.action(), "ignoring message"),
        }
    }
}
