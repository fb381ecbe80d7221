use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::capture_model::{ElementRecord, PageRecord, load_elements, load_pages};
use crate::registry::identity::IdentityRegistry;
use crate::registry::registry_model::{IdStyle, RegistryMap};
use crate::store::store::{Store, StoreError};

use super::validate::{SchemaViolation, validate_export};

/// Journey export for one platform plus every platform's registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub pages: Vec<PageRecord>,
    pub elements: Vec<ElementRecord>,
    pub platform: String,
    pub registries: RegistryMap,
    pub exported_at: DateTime<Utc>,
}

impl ExportFile {
    pub fn collect(store: &mut dyn Store, platform: &str) -> Result<Self, StoreError> {
        let pages = load_pages(&*store, platform)?;
        let elements = load_elements(&*store, platform)?;
        let style = IdStyle::default();
        let registries = IdentityRegistry::new(store, &style).export_all()?;

        Ok(Self {
            pages,
            elements,
            platform: platform.to_string(),
            registries,
            exported_at: Utc::now(),
        })
    }
}

/// An export together with its validation result. Invalid exports are still
/// produced; whether to use them is the operator's call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub file: ExportFile,
    pub valid: bool,
    pub violations: Vec<SchemaViolation>,
}

impl ExportReport {
    pub fn new(file: ExportFile) -> Self {
        let violations = validate_export(&file);
        Self {
            valid: violations.is_empty(),
            file,
            violations,
        }
    }
}

/// Registry payload accepted by import: a full export file, or a bare
/// platform -> registry map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImportPayload {
    Export(Box<ExportFile>),
    Registries(RegistryMap),
}

impl ImportPayload {
    pub fn into_registries(self) -> RegistryMap {
        match self {
            ImportPayload::Export(file) => file.registries,
            ImportPayload::Registries(map) => map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_accepts_bare_registry_maps() {
        let payload: ImportPayload = serde_json::from_value(json!({
            "crm": {"pages": {"/home": "home_1000"}, "elements": {}, "counters": {"page": 1001, "element": 1000}}
        }))
        .unwrap();
        let map = payload.into_registries();
        assert_eq!(map["crm"].pages["/home"], "home_1000");
    }

    #[test]
    fn import_accepts_export_files() {
        let payload: ImportPayload = serde_json::from_value(json!({
            "pages": [],
            "elements": [],
            "platform": "crm",
            "registries": {"crm": {"counters": {"page": 1003, "element": 1000}}},
            "exportedAt": "2026-10-16T09:30:00Z"
        }))
        .unwrap();
        assert!(matches!(payload, ImportPayload::Export(_)));
        assert_eq!(payload.into_registries()["crm"].counters.page, 1003);
    }
}
