use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::export_model::ExportFile;

/// One problem found in an export. Collected, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// JSON-pointer-ish location, e.g. `elements[3].from[0].node`.
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(path: String, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

/// Structural checks over an export: required fields, duplicate IDs, and
/// references between records.
pub fn validate_export(file: &ExportFile) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();

    if file.platform.trim().is_empty() {
        violations.push(SchemaViolation::new("platform".into(), "platform is empty"));
    }

    let mut page_ids = HashSet::new();
    for (i, page) in file.pages.iter().enumerate() {
        if page.page_id.trim().is_empty() {
            violations.push(SchemaViolation::new(format!("pages[{}].page_id", i), "page_id is empty"));
        } else if !page_ids.insert(page.page_id.as_str()) {
            violations.push(SchemaViolation::new(
                format!("pages[{}].page_id", i),
                format!("duplicate page_id '{}'", page.page_id),
            ));
        }
        if !page.url_pattern.starts_with('/') {
            violations.push(SchemaViolation::new(
                format!("pages[{}].url_pattern", i),
                "url_pattern must be an absolute path",
            ));
        }
    }

    let element_ids: HashSet<&str> = file.elements.iter().map(|e| e.element_id.as_str()).collect();
    let mut seen_elements = HashSet::new();

    for (i, element) in file.elements.iter().enumerate() {
        let at = |field: &str| format!("elements[{}].{}", i, field);

        if element.element_id.trim().is_empty() {
            violations.push(SchemaViolation::new(at("element_id"), "element_id is empty"));
        } else if !seen_elements.insert(element.element_id.as_str()) {
            violations.push(SchemaViolation::new(
                at("element_id"),
                format!("duplicate element_id '{}'", element.element_id),
            ));
        }

        if element.description.trim().is_empty() {
            violations.push(SchemaViolation::new(at("description"), "description is empty"));
        }

        if element.dom_selector.trim().is_empty() {
            violations.push(SchemaViolation::new(at("dom_selector"), "dom_selector is empty"));
        }

        if !page_ids.contains(element.page_id.as_str()) {
            violations.push(SchemaViolation::new(
                at("page_id"),
                format!("unknown page '{}'", element.page_id),
            ));
        }

        if let Some(edges) = &element.from {
            if edges.is_empty() {
                violations.push(SchemaViolation::new(at("from"), "from must be null or non-empty"));
            }
            for (j, edge) in edges.iter().enumerate() {
                if !element_ids.contains(edge.node.as_str()) {
                    violations.push(SchemaViolation::new(
                        format!("elements[{}].from[{}].node", i, j),
                        format!("unknown element '{}'", edge.node),
                    ));
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::capture_model::{ElementRecord, ElementStatus, FromEdge, PageRecord};
    use chrono::Utc;

    fn page(id: &str, pattern: &str) -> PageRecord {
        PageRecord {
            page_id: id.into(),
            url_pattern: pattern.into(),
            framework: "unknown".into(),
            description: "Page".into(),
            updated_at: Utc::now(),
        }
    }

    fn element(id: &str, page_id: &str, from: Option<&str>) -> ElementRecord {
        ElementRecord {
            element_id: id.into(),
            page_id: page_id.into(),
            element_type: "button".into(),
            dom_selector: format!("#{}", id),
            description: "click it".into(),
            kpi: None,
            status: ElementStatus::Active,
            from: from.map(|f| vec![FromEdge::click(f)]),
        }
    }

    fn export(pages: Vec<PageRecord>, elements: Vec<ElementRecord>) -> ExportFile {
        ExportFile {
            pages,
            elements,
            platform: "crm".into(),
            registries: Default::default(),
            exported_at: Utc::now(),
        }
    }

    #[test]
    fn consistent_export_has_no_violations() {
        let file = export(
            vec![page("home_1000", "/home")],
            vec![
                element("button_a_1000", "home_1000", None),
                element("button_b_1001", "home_1000", Some("button_a_1000")),
            ],
        );
        assert!(validate_export(&file).is_empty());
    }

    #[test]
    fn dangling_references_are_reported() {
        let file = export(
            vec![page("home_1000", "/home")],
            vec![element("button_b_1001", "settings_1001", Some("button_a_1000"))],
        );
        let paths: Vec<_> = validate_export(&file).into_iter().map(|v| v.path).collect();
        assert_eq!(paths, vec!["elements[0].page_id", "elements[0].from[0].node"]);
    }

    #[test]
    fn duplicates_are_reported() {
        let file = export(
            vec![page("home_1000", "/home"), page("home_1000", "/home2")],
            vec![
                element("button_a_1000", "home_1000", None),
                element("button_a_1000", "home_1000", None),
            ],
        );
        let violations = validate_export(&file);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("duplicate page_id"));
        assert!(violations[1].message.contains("duplicate element_id"));
    }
}
