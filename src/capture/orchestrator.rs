use chrono::Utc;
use tracing::{debug, info};

use crate::dom::dom_model::DomElement;
use crate::dom::selector::generate_selector;
use crate::registry::identity::IdentityRegistry;
use crate::registry::registry_model::IdStyle;
use crate::store::keys;
use crate::store::store::Store;

use super::capture_model::{
    ElementRecord, ElementStatus, FromEdge, PageRecord, load_elements, load_pages, save_elements,
    save_pages,
};
use super::error::CaptureError;
use super::page_info::{detect_framework, url_pattern};

/// Result of a page capture request.
#[derive(Debug, Clone, PartialEq)]
pub enum PageCapture {
    Created(PageRecord),
    /// A record with the same URL pattern already existed; nothing changed.
    Existing { page_id: String },
}

impl PageCapture {
    pub fn page_id(&self) -> &str {
        match self {
            PageCapture::Created(record) => &record.page_id,
            PageCapture::Existing { page_id } => page_id,
        }
    }
}

/// Turns capture requests into registry lookups and stored records.
pub struct CaptureOrchestrator<'a> {
    store: &'a mut dyn Store,
    style: &'a IdStyle,
}

impl<'a> CaptureOrchestrator<'a> {
    pub fn new(store: &'a mut dyn Store, style: &'a IdStyle) -> Self {
        Self { store, style }
    }

    /// Record the page at `url` unless its URL pattern is already known.
    pub fn capture_page(
        &mut self,
        platform: &str,
        url: &str,
        title: &str,
        framework_hint: Option<&str>,
    ) -> Result<PageCapture, CaptureError> {
        let pattern = url_pattern(url)?;
        let mut pages = load_pages(&*self.store, platform)?;

        if let Some(existing) = pages.iter().find(|p| p.url_pattern == pattern) {
            debug!(platform, url_pattern = %pattern, page_id = %existing.page_id, "page already captured");
            return Ok(PageCapture::Existing {
                page_id: existing.page_id.clone(),
            });
        }

        let page_id = IdentityRegistry::new(&mut *self.store, self.style).ensure_page_id(platform, &pattern);
        let record = PageRecord {
            page_id,
            url_pattern: pattern,
            framework: detect_framework(framework_hint),
            description: title.trim().to_string(),
            updated_at: Utc::now(),
        };

        pages.push(record.clone());
        save_pages(&mut *self.store, platform, &pages)?;

        info!(platform, page_id = %record.page_id, url_pattern = %record.url_pattern, "captured page");
        Ok(PageCapture::Created(record))
    }

    /// Record `element` on `page_id`, linking it to the continuity anchor.
    ///
    /// Capturing an element that already has a record updates that record in
    /// place instead of adding a second one. Edges it already has are kept and
    /// the new anchor is appended to them.
    pub fn capture_element(
        &mut self,
        platform: &str,
        page_id: &str,
        element: &DomElement,
        description: &str,
        kpi: Option<&str>,
    ) -> Result<ElementRecord, CaptureError> {
        let description = validate_description(description)?;

        let selector = generate_selector(element);
        let element_id = IdentityRegistry::new(&mut *self.store, self.style).ensure_element_id(
            platform,
            page_id,
            &selector,
            element,
        );

        let anchor_key = keys::scoped(platform, keys::LAST_ELEMENT_ID);
        let anchor: Option<String> = keys::read(&*self.store, &anchor_key)?;

        // Re-capturing the anchor itself must not produce a self-loop.
        let edge = anchor
            .filter(|a| *a != element_id)
            .map(|a| FromEdge::click(&a));

        let mut elements = load_elements(&*self.store, platform)?;
        let record = match elements.iter_mut().find(|e| e.element_id == element_id) {
            Some(existing) => {
                existing.description = description;
                existing.kpi = clean_kpi(kpi);
                existing.dom_selector = selector;
                if let Some(edge) = edge {
                    let edges = existing.from.get_or_insert_with(Vec::new);
                    if !edges.iter().any(|e| e.node == edge.node) {
                        edges.push(edge);
                    }
                }
                existing.clone()
            }
            None => {
                let record = ElementRecord {
                    element_id: element_id.clone(),
                    page_id: page_id.to_string(),
                    element_type: element.semantic_type(),
                    dom_selector: selector,
                    description,
                    kpi: clean_kpi(kpi),
                    status: ElementStatus::Active,
                    from: edge.map(|e| vec![e]),
                };
                elements.push(record.clone());
                record
            }
        };

        save_elements(&mut *self.store, platform, &elements)?;
        keys::write(&mut *self.store, &anchor_key, &record.element_id)?;

        info!(
            platform,
            element_id = %record.element_id,
            page_id = %record.page_id,
            selector = %record.dom_selector,
            "captured element"
        );
        Ok(record)
    }
}

/// Trimmed description, or a validation error when it is blank.
pub fn validate_description(description: &str) -> Result<String, CaptureError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(CaptureError::Validation {
            field: "description",
        });
    }
    Ok(trimmed.to_string())
}

fn clean_kpi(kpi: Option<&str>) -> Option<String> {
    kpi.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::store::MemoryStore;

    #[test]
    fn blank_description_persists_nothing() {
        let mut store = MemoryStore::new();
        let style = IdStyle::default();
        let mut orchestrator = CaptureOrchestrator::new(&mut store, &style);

        let el = DomElement::new("button").with_attr("id", "save");
        let err = orchestrator
            .capture_element("crm", "orders_1000", &el, "   ", None)
            .unwrap_err();
        assert!(matches!(err, CaptureError::Validation { field: "description" }));
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn recapturing_an_element_updates_its_record() {
        let mut store = MemoryStore::new();
        let style = IdStyle::default();
        let mut orchestrator = CaptureOrchestrator::new(&mut store, &style);
        let el = DomElement::new("button").with_attr("id", "save");

        let first = orchestrator
            .capture_element("crm", "orders_1000", &el, "save", None)
            .unwrap();
        let second = orchestrator
            .capture_element("crm", "orders_1000", &el, "save order", Some(" saves "))
            .unwrap();

        assert_eq!(first.element_id, second.element_id);
        assert_eq!(second.from, None, "no self-loop on the anchor");
        let elements = load_elements(&store, "crm").unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].description, "save order");
        assert_eq!(elements[0].kpi.as_deref(), Some("saves"));
    }
}
