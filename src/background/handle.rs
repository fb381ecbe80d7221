use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::capture::capture_model::ElementRecord;
use crate::capture::orchestrator::PageCapture;
use crate::dom::dom_model::DomElement;
use crate::export::export_model::ExportReport;
use crate::navigation::channel::TabId;
use crate::navigation::messages::Message;
use crate::navigation::session_state::{CaptureSessionState, CaptureState};
use crate::registry::registry_model::RegistryMap;

use super::error::BackgroundError;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, BackgroundError>>;

/// Element capture request as sent by a page context.
#[derive(Debug, Clone)]
pub struct ElementCapture {
    pub page_id: String,
    pub element: DomElement,
    pub description: String,
    pub kpi: Option<String>,
    /// The click on this element will navigate away.
    pub navigates: bool,
}

/// Page capture request as sent by a page context.
#[derive(Debug, Clone)]
pub struct PageVisit {
    pub url: String,
    pub title: String,
    pub framework: Option<String>,
}

/// Point-in-time view of the coordinator and the durable session flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub platform: String,
    pub state: CaptureState,
    pub resume_latched: bool,
    pub session: CaptureSessionState,
}

pub(crate) enum Request {
    SetPlatform { platform: String, reply: Reply<()> },
    EnableCapture { tab: Option<TabId>, reply: Reply<()> },
    DisableCapture { tab: Option<TabId>, reply: Reply<()> },
    CapturePage { visit: PageVisit, tab: Option<TabId>, reply: Reply<PageCapture> },
    CaptureElement { capture: ElementCapture, tab: Option<TabId>, reply: Reply<ElementRecord> },
    PageLoaded { tab: TabId, reply: Reply<()> },
    Dispatch { message: Message, tab: Option<TabId>, reply: Reply<()> },
    Session { reply: Reply<SessionSnapshot> },
    Registries { reply: Reply<RegistryMap> },
    Export { reply: Reply<ExportReport> },
    ImportRegistries { data: RegistryMap, reply: Reply<()> },
    ResetRegistry { platform: Option<String>, reply: Reply<()> },
    ResetSession { tab: Option<TabId>, reply: Reply<()> },
    Shutdown { reply: Reply<()> },
}

/// Cloneable client of the background service. Every call is a serialized
/// request/response round trip; the service stops once all handles drop.
#[derive(Debug, Clone)]
pub struct BackgroundHandle {
    tx: mpsc::Sender<Request>,
}

impl BackgroundHandle {
    pub(crate) fn new(tx: mpsc::Sender<Request>) -> Self {
        Self { tx }
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> Result<T, BackgroundError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| BackgroundError::Stopped)?;
        rx.await.map_err(|_| BackgroundError::Stopped)?
    }

    pub async fn set_platform(&self, platform: &str) -> Result<(), BackgroundError> {
        let platform = platform.to_string();
        self.call(|reply| Request::SetPlatform { platform, reply }).await
    }

    pub async fn enable_capture(&self, tab: Option<TabId>) -> Result<(), BackgroundError> {
        self.call(|reply| Request::EnableCapture { tab, reply }).await
    }

    pub async fn disable_capture(&self, tab: Option<TabId>) -> Result<(), BackgroundError> {
        self.call(|reply| Request::DisableCapture { tab, reply }).await
    }

    pub async fn capture_page(
        &self,
        visit: PageVisit,
        tab: Option<TabId>,
    ) -> Result<PageCapture, BackgroundError> {
        self.call(|reply| Request::CapturePage { visit, tab, reply }).await
    }

    pub async fn capture_element(
        &self,
        capture: ElementCapture,
        tab: Option<TabId>,
    ) -> Result<ElementRecord, BackgroundError> {
        self.call(|reply| Request::CaptureElement { capture, tab, reply }).await
    }

    /// Browser load-complete event for `tab`.
    pub async fn page_loaded(&self, tab: TabId) -> Result<(), BackgroundError> {
        self.call(|reply| Request::PageLoaded { tab, reply }).await
    }

    /// Deliver an inbound message from a page context or the popup.
    pub async fn dispatch(&self, message: Message, tab: Option<TabId>) -> Result<(), BackgroundError> {
        self.call(|reply| Request::Dispatch { message, tab, reply }).await
    }

    pub async fn session(&self) -> Result<SessionSnapshot, BackgroundError> {
        self.call(|reply| Request::Session { reply }).await
    }

    pub async fn registries(&self) -> Result<RegistryMap, BackgroundError> {
        self.call(|reply| Request::Registries { reply }).await
    }

    pub async fn export(&self) -> Result<ExportReport, BackgroundError> {
        self.call(|reply| Request::Export { reply }).await
    }

    pub async fn import_registries(&self, data: RegistryMap) -> Result<(), BackgroundError> {
        self.call(|reply| Request::ImportRegistries { data, reply }).await
    }

    /// Reset `platform`'s registry, or the active platform's when `None`.
    pub async fn reset_registry(&self, platform: Option<&str>) -> Result<(), BackgroundError> {
        let platform = platform.map(str::to_string);
        self.call(|reply| Request::ResetRegistry { platform, reply }).await
    }

    /// Destructive reset of the active platform's capture session and records.
    pub async fn reset_session(&self, tab: Option<TabId>) -> Result<(), BackgroundError> {
        self.call(|reply| Request::ResetSession { tab, reply }).await
    }

    /// Stop the service after the requests queued ahead of this one.
    pub async fn shutdown(&self) -> Result<(), BackgroundError> {
        self.call(|reply| Request::Shutdown { reply }).await
    }
}
