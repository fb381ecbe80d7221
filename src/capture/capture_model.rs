use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::store::{Store, StoreError};

/// A captured page. One per distinct URL pattern per platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_id: String,

    /// URL path with query string and fragment removed.
    pub url_pattern: String,

    /// Best-effort framework name, `unknown` when nothing was detected.
    pub framework: String,

    /// Page title at capture time.
    pub description: String,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementStatus {
    #[default]
    Active,
    Inactive,
    Deprecated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeAction {
    #[default]
    Click,
}

/// Incoming edge: the element captured immediately before this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromEdge {
    pub node: String,
    pub action: EdgeAction,
}

impl FromEdge {
    pub fn click(node: &str) -> Self {
        Self {
            node: node.to_string(),
            action: EdgeAction::Click,
        }
    }
}

/// A captured element. The journey graph is rebuilt from `from` pointers;
/// outgoing edges are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub element_id: String,
    pub page_id: String,

    #[serde(rename = "type")]
    pub element_type: String,

    pub dom_selector: String,
    pub description: String,

    #[serde(rename = "KPI", default, skip_serializing_if = "Option::is_none")]
    pub kpi: Option<String>,

    #[serde(default)]
    pub status: ElementStatus,

    /// `None` for the first node of a flow. List-shaped so a node can carry
    /// more than one predecessor, though capture only ever records one.
    pub from: Option<Vec<FromEdge>>,
}

// ============================================================================
// Platform-scoped record lists
// ============================================================================

pub fn load_pages(store: &dyn Store, platform: &str) -> Result<Vec<PageRecord>, StoreError> {
    Ok(keys::read(store, &keys::scoped(platform, keys::PAGE_DATA))?.unwrap_or_default())
}

pub fn save_pages(
    store: &mut dyn Store,
    platform: &str,
    pages: &[PageRecord],
) -> Result<(), StoreError> {
    keys::write(store, &keys::scoped(platform, keys::PAGE_DATA), &pages)
}

pub fn load_elements(store: &dyn Store, platform: &str) -> Result<Vec<ElementRecord>, StoreError> {
    Ok(keys::read(store, &keys::scoped(platform, keys::ELEMENT_DATA))?.unwrap_or_default())
}

pub fn save_elements(
    store: &mut dyn Store,
    platform: &str,
    elements: &[ElementRecord],
) -> Result<(), StoreError> {
    keys::write(store, &keys::scoped(platform, keys::ELEMENT_DATA), &elements)
}
