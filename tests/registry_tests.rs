use journey_capture::{
    dom::{dom_model::DomElement, selector::generate_selector},
    registry::{
        identity::IdentityRegistry,
        registry_model::{COUNTER_SEED, IdStyle},
    },
    store::{
        keys,
        store::{MemoryStore, Store},
    },
};

use crate::common::utils::{PLATFORM, button};

mod common;

fn element_id(registry: &mut IdentityRegistry<'_>, page_id: &str, el: &DomElement) -> String {
    registry.ensure_element_id(PLATFORM, page_id, &generate_selector(el), el)
}

// =========================================================================
// Fingerprint idempotency
// =========================================================================

#[test]
fn same_fingerprint_returns_same_id_and_advances_once() {
    let mut store = MemoryStore::new();
    let style = IdStyle::default();
    let mut registry = IdentityRegistry::new(&mut store, &style);

    let first = registry.ensure_page_id(PLATFORM, "/dashboard");
    let second = registry.ensure_page_id(PLATFORM, "/dashboard");
    assert_eq!(first, second);
    assert_eq!(first, "dashboard_1000");

    let el = button("settings-button");
    let a = element_id(&mut registry, &first, &el);
    let b = element_id(&mut registry, &first, &el);
    assert_eq!(a, b);
    assert_eq!(a, "button_settings-button_1000");

    let counters = registry.get_registry(PLATFORM).counters;
    assert_eq!(counters.page, COUNTER_SEED + 1, "page counter advanced exactly once");
    assert_eq!(counters.element, COUNTER_SEED + 1, "element counter advanced exactly once");
}

#[test]
fn same_selector_on_different_pages_gets_different_ids() {
    let mut store = MemoryStore::new();
    let style = IdStyle::default();
    let mut registry = IdentityRegistry::new(&mut store, &style);

    let el = button("save");
    let on_orders = element_id(&mut registry, "orders_1000", &el);
    let on_users = element_id(&mut registry, "users_1001", &el);
    assert_ne!(on_orders, on_users);
}

// =========================================================================
// Counter monotonicity
// =========================================================================

#[test]
fn counters_equal_seed_plus_distinct_creations() {
    let mut store = MemoryStore::new();
    let style = IdStyle::default();
    let mut registry = IdentityRegistry::new(&mut store, &style);

    let paths = ["/a", "/b", "/c", "/b", "/d", "/a"];
    let ids: Vec<String> = paths
        .iter()
        .map(|p| registry.ensure_page_id(PLATFORM, p))
        .collect();

    assert_eq!(ids, vec!["a_1000", "b_1001", "c_1002", "b_1001", "d_1003", "a_1000"]);
    assert_eq!(registry.get_registry(PLATFORM).counters.page, COUNTER_SEED + 4);
    assert_eq!(registry.get_registry(PLATFORM).counters.element, COUNTER_SEED);
}

#[test]
fn platforms_are_independent() {
    let mut store = MemoryStore::new();
    let style = IdStyle::default();
    let mut registry = IdentityRegistry::new(&mut store, &style);

    assert_eq!(registry.ensure_page_id("crm", "/home"), "home_1000");
    assert_eq!(registry.ensure_page_id("billing", "/home"), "home_1000");
    assert_eq!(registry.ensure_page_id("crm", "/reports"), "reports_1001");
    assert_eq!(registry.get_registry("billing").counters.page, COUNTER_SEED + 1);
}

#[test]
fn page_and_element_ids_never_collide() {
    let mut store = MemoryStore::new();
    let style = IdStyle::default();
    let mut registry = IdentityRegistry::new(&mut store, &style);

    let page = registry.ensure_page_id(PLATFORM, "/button_save");
    let element = element_id(&mut registry, "home_1000", &button("save"));
    assert_eq!(page, "button_save_1000");
    assert_ne!(page, element);

    let snapshot = registry.get_registry(PLATFORM);
    for id in [&page, &element] {
        let uses = snapshot
            .pages
            .values()
            .chain(snapshot.elements.values())
            .filter(|v| *v == id)
            .count();
        assert_eq!(uses, 1, "{} is assigned exactly once", id);
    }

    // The skipped value stays skipped for later elements too.
    let next = element_id(&mut registry, "home_1000", &button("cancel"));
    assert_eq!(next, "button_cancel_1002");
}

// =========================================================================
// Export / import / reset
// =========================================================================

#[test]
fn import_of_export_is_a_no_op() {
    let mut store = MemoryStore::new();
    let style = IdStyle::default();
    let mut registry = IdentityRegistry::new(&mut store, &style);

    let page = registry.ensure_page_id("crm", "/dashboard");
    element_id(&mut registry, &page, &button("settings-button"));
    registry.ensure_page_id("billing", "/");

    let before = registry.export_all().unwrap();
    registry.import_all(before.clone()).unwrap();
    assert_eq!(registry.export_all().unwrap(), before);
}

#[test]
fn import_replaces_everything() {
    let mut source = MemoryStore::new();
    let mut target = MemoryStore::new();
    let style = IdStyle::default();

    let exported = {
        let mut registry = IdentityRegistry::new(&mut source, &style);
        registry.ensure_page_id("crm", "/dashboard");
        registry.export_all().unwrap()
    };

    let mut registry = IdentityRegistry::new(&mut target, &style);
    registry.ensure_page_id("legacy", "/old");
    registry.import_all(exported.clone()).unwrap();

    assert_eq!(registry.export_all().unwrap(), exported);
    assert_eq!(
        registry.ensure_page_id("crm", "/dashboard"),
        "dashboard_1000",
        "imported IDs are reused"
    );
    assert_eq!(registry.ensure_page_id("crm", "/users"), "users_1001");
}

#[test]
fn reset_starts_the_platform_over() {
    let mut store = MemoryStore::new();
    let style = IdStyle::default();
    let mut registry = IdentityRegistry::new(&mut store, &style);

    registry.ensure_page_id("crm", "/a");
    registry.ensure_page_id("crm", "/b");
    registry.ensure_page_id("billing", "/a");
    registry.reset_registry("crm").unwrap();

    assert_eq!(registry.ensure_page_id("crm", "/b"), "b_1000");
    assert_eq!(registry.ensure_page_id("billing", "/a"), "a_1000");
}

// =========================================================================
// Degraded store
// =========================================================================

#[test]
fn unreadable_registry_falls_back_to_timestamp_ids() {
    let mut store = MemoryStore::new();
    store.make_unreadable(keys::ID_REGISTRY);
    let style = IdStyle::default();

    let id = {
        let mut registry = IdentityRegistry::new(&mut store, &style);
        registry.ensure_page_id(PLATFORM, "/dashboard")
    };

    let (stem, millis) = id.rsplit_once('_').unwrap();
    assert_eq!(stem, "dashboard");
    assert!(millis.parse::<i64>().unwrap() > 1_600_000_000_000, "unix-millis suffix");

    store.restore_key(keys::ID_REGISTRY);
    assert!(store.get(keys::ID_REGISTRY).unwrap().is_none(), "nothing was persisted");
}

#[test]
fn prefixes_apply_to_new_ids() {
    let mut store = MemoryStore::new();
    let style = IdStyle {
        page_prefix: "page_".into(),
        element_prefix: "elem_".into(),
    };
    let mut registry = IdentityRegistry::new(&mut store, &style);

    let page = registry.ensure_page_id(PLATFORM, "/dashboard");
    assert_eq!(page, "page_dashboard_1000");
    assert_eq!(
        element_id(&mut registry, &page, &button("settings-button")),
        "elem_button_settings-button_1000"
    );
}
