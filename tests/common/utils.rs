use std::sync::Arc;
use std::time::Duration;

use journey_capture::background::handle::{BackgroundHandle, ElementCapture, PageVisit};
use journey_capture::background::service::{BackgroundConfig, BackgroundService};
use journey_capture::dom::dom_model::DomElement;
use journey_capture::navigation::channel::InMemoryChannel;
use journey_capture::navigation::session_state::CaptureState;
use journey_capture::store::store::MemoryStore;
use journey_capture::trace::journal::CaptureJournal;

pub const PLATFORM: &str = "crm";

/// Service over a shared `MemoryStore` with the default timing.
pub fn spawn_service(store: &MemoryStore) -> (BackgroundHandle, InMemoryChannel) {
    spawn_with(store, BackgroundConfig {
        default_platform: PLATFORM.to_string(),
        ..BackgroundConfig::default()
    })
}

pub fn spawn_with(store: &MemoryStore, config: BackgroundConfig) -> (BackgroundHandle, InMemoryChannel) {
    let channel = InMemoryChannel::new();
    let handle = BackgroundService::spawn(
        store.clone(),
        Arc::new(channel.clone()),
        CaptureJournal::disabled(),
        config,
    );
    (handle, channel)
}

pub fn button(id: &str) -> DomElement {
    DomElement::new("button").with_attr("id", id)
}

pub fn link(href: &str, text: &str) -> DomElement {
    DomElement::new("a").with_attr("href", href).with_text(text)
}

/// Poll the service until it reports `state`, for at most `limit`.
pub async fn wait_for_state(handle: &BackgroundHandle, state: CaptureState, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        match handle.session().await {
            Ok(snapshot) if snapshot.state == state => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn visit(url: &str, title: &str) -> PageVisit {
    PageVisit {
        url: url.to_string(),
        title: title.to_string(),
        framework: None,
    }
}

pub fn element_capture(page_id: &str, element: DomElement, description: &str, navigates: bool) -> ElementCapture {
    ElementCapture {
        page_id: page_id.to_string(),
        element,
        description: description.to_string(),
        kpi: None,
        navigates,
    }
}
