use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// First value handed out by both counters.
pub const COUNTER_SEED: u64 = 1000;

/// Registries for every platform, keyed by platform key.
pub type RegistryMap = BTreeMap<String, PlatformRegistry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Page,
    Element,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default = "default_seed")]
    pub page: u64,
    #[serde(default = "default_seed")]
    pub element: u64,
}

fn default_seed() -> u64 {
    COUNTER_SEED
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            page: COUNTER_SEED,
            element: COUNTER_SEED,
        }
    }
}

impl Counters {
    /// Hand out the current value for `kind` and move past it.
    pub fn advance(&mut self, kind: IdKind) -> u64 {
        let counter = match kind {
            IdKind::Page => &mut self.page,
            IdKind::Element => &mut self.element,
        };
        let value = *counter;
        *counter += 1;
        value
    }
}

/// Identity state for one platform: fingerprint -> assigned ID, per kind.
///
/// Append-only: once a fingerprint has an ID it keeps it for the lifetime of
/// the registry (until an explicit reset or import replaces the registry).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRegistry {
    #[serde(default)]
    pub pages: BTreeMap<String, String>,
    #[serde(default)]
    pub elements: BTreeMap<String, String>,
    #[serde(default)]
    pub counters: Counters,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, kind: IdKind, fingerprint: &str) -> Option<&str> {
        self.table(kind).get(fingerprint).map(String::as_str)
    }

    /// Return the ID for `fingerprint`, assigning `<stem>_<counter>` if the
    /// fingerprint is new. The boolean is true when an ID was created.
    pub fn assign(&mut self, kind: IdKind, fingerprint: &str, stem: &str) -> (String, bool) {
        if let Some(existing) = self.lookup(kind, fingerprint) {
            return (existing.to_string(), false);
        }

        // Pages and elements share one ID space; skip values already taken.
        let id = loop {
            let candidate = format!("{}_{}", stem, self.counters.advance(kind));
            if !self.contains_id(&candidate) {
                break candidate;
            }
        };
        self.table_mut(kind).insert(fingerprint.to_string(), id.clone());
        (id, true)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.pages.values().chain(self.elements.values()).any(|v| v == id)
    }

    fn table(&self, kind: IdKind) -> &BTreeMap<String, String> {
        match kind {
            IdKind::Page => &self.pages,
            IdKind::Element => &self.elements,
        }
    }

    fn table_mut(&mut self, kind: IdKind) -> &mut BTreeMap<String, String> {
        match kind {
            IdKind::Page => &mut self.pages,
            IdKind::Element => &mut self.elements,
        }
    }
}

/// Element fingerprints are scoped to their page: `<page_id>|<selector>`.
pub fn element_fingerprint(page_id: &str, selector: &str) -> String {
    format!("{}|{}", page_id, selector)
}

/// Optional prefixes prepended to every generated ID stem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdStyle {
    #[serde(default)]
    pub page_prefix: String,
    #[serde(default)]
    pub element_prefix: String,
}

impl IdStyle {
    pub fn prefix(&self, kind: IdKind) -> &str {
        match kind {
            IdKind::Page => &self.page_prefix,
            IdKind::Element => &self.element_prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_seed_and_advance_by_one() {
        let mut counters = Counters::default();
        assert_eq!(counters.advance(IdKind::Page), 1000);
        assert_eq!(counters.advance(IdKind::Page), 1001);
        assert_eq!(counters.page, 1002);
        assert_eq!(counters.element, COUNTER_SEED);
    }

    #[test]
    fn assign_is_idempotent_per_fingerprint() {
        let mut reg = PlatformRegistry::new();
        let (first, created) = reg.assign(IdKind::Element, "p|#a", "button_a");
        assert!(created);
        let (again, created) = reg.assign(IdKind::Element, "p|#a", "button_other");
        assert!(!created);
        assert_eq!(first, again);
        assert_eq!(reg.counters.element, COUNTER_SEED + 1);
    }

    #[test]
    fn same_stem_gets_distinct_ids() {
        let mut reg = PlatformRegistry::new();
        let (a, _) = reg.assign(IdKind::Element, "p|div.card:nth-of-type(1)", "div_card");
        let (b, _) = reg.assign(IdKind::Element, "p|div.card:nth-of-type(2)", "div_card");
        assert_ne!(a, b);
        assert!(reg.contains_id(&a) && reg.contains_id(&b));
    }

    #[test]
    fn page_and_element_with_equal_stems_do_not_share_an_id() {
        let mut reg = PlatformRegistry::new();
        let (page, _) = reg.assign(IdKind::Page, "/button_save", "button_save");
        let (element, _) = reg.assign(IdKind::Element, "home_1000|#save", "button_save");
        assert_eq!(page, "button_save_1000");
        assert_eq!(element, "button_save_1001");
        assert_eq!(reg.counters.element, COUNTER_SEED + 2);
    }

    #[test]
    fn partial_counters_fall_back_to_seed() {
        let reg: PlatformRegistry = serde_json::from_str(r#"{"counters": {"page": 1004}}"#).unwrap();
        assert_eq!(reg.counters.page, 1004);
        assert_eq!(reg.counters.element, COUNTER_SEED);
        assert!(reg.pages.is_empty());
    }
}
