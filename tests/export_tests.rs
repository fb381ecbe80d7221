use journey_capture::{
    export::export_model::{ExportFile, ImportPayload},
    navigation::channel::TabId,
    store::store::MemoryStore,
};

use crate::common::utils::{PLATFORM, button, element_capture, spawn_service, visit};

mod common;

const TAB: TabId = TabId(1);

// =========================================================================
// Export
// =========================================================================

#[tokio::test]
async fn export_of_a_captured_flow_is_valid() {
    let store = MemoryStore::new();
    let (handle, _channel) = spawn_service(&store);
    handle.enable_capture(None).await.unwrap();

    let page = handle.capture_page(visit("/dashboard", "Dashboard"), Some(TAB)).await.unwrap();
    for (id, description) in [("settings-button", "go to settings"), ("add-button", "add user")] {
        handle
            .capture_element(element_capture(page.page_id(), button(id), description, false), Some(TAB))
            .await
            .unwrap();
    }

    let report = handle.export().await.unwrap();
    assert!(report.valid, "violations: {:?}", report.violations);
    assert_eq!(report.file.platform, PLATFORM);
    assert_eq!(report.file.pages.len(), 1);
    assert_eq!(report.file.elements.len(), 2);
    assert_eq!(report.file.registries[PLATFORM].counters.element, 1002);

    let json = serde_json::to_value(&report.file).unwrap();
    for key in ["pages", "elements", "platform", "registries", "exportedAt"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
}

#[tokio::test]
async fn invalid_export_is_still_produced() {
    let store = MemoryStore::new();
    let (handle, _channel) = spawn_service(&store);
    handle.enable_capture(None).await.unwrap();

    // Element recorded against a page that was never captured.
    handle
        .capture_element(element_capture("ghost_1000", button("save"), "save", false), None)
        .await
        .unwrap();

    let report = handle.export().await.unwrap();
    assert!(!report.valid);
    assert_eq!(report.file.elements.len(), 1, "raw data kept");
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].path, "elements[0].page_id");
}

// =========================================================================
// Import
// =========================================================================

#[tokio::test]
async fn export_file_imports_into_a_fresh_store() {
    let source = MemoryStore::new();
    let (handle, _channel) = spawn_service(&source);
    handle.capture_page(visit("/dashboard", "Dashboard"), None).await.unwrap();
    let exported = serde_json::to_string(&handle.export().await.unwrap().file).unwrap();

    let target = MemoryStore::new();
    let (handle, _channel) = spawn_service(&target);
    let payload: ImportPayload = serde_json::from_str(&exported).unwrap();
    handle.import_registries(payload.into_registries()).await.unwrap();

    let page = handle.capture_page(visit("/dashboard?x=1", "Dashboard"), None).await.unwrap();
    assert_eq!(page.page_id(), "dashboard_1000", "imported id reused");
    let next = handle.capture_page(visit("/users", "Users"), None).await.unwrap();
    assert_eq!(next.page_id(), "users_1001", "counter continues from import");
}

#[tokio::test]
async fn export_round_trips_through_json() {
    let store = MemoryStore::new();
    let (handle, _channel) = spawn_service(&store);
    handle.capture_page(visit("/", "Home"), None).await.unwrap();

    let file = handle.export().await.unwrap().file;
    let back: ExportFile = serde_json::from_str(&serde_json::to_string_pretty(&file).unwrap()).unwrap();
    assert_eq!(back, file);
    assert_eq!(back.pages[0].page_id, "home_1000");
}
