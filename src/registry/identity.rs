use chrono::Utc;
use tracing::{debug, warn};

use crate::dom::dom_model::DomElement;
use crate::dom::selector::stable_classes;
use crate::store::keys;
use crate::store::store::{Store, StoreError};

use super::registry_model::{IdKind, IdStyle, PlatformRegistry, RegistryMap, element_fingerprint};

const TEXT_SNIPPET_CHARS: usize = 24;

/// Identity registry over the durable store.
///
/// Every call reads the whole `idRegistry` value, changes it in memory and
/// writes it back. Callers must not run two of these cycles concurrently;
/// the background service guarantees that by owning the store exclusively.
pub struct IdentityRegistry<'a> {
    store: &'a mut dyn Store,
    style: &'a IdStyle,
}

impl<'a> IdentityRegistry<'a> {
    pub fn new(store: &'a mut dyn Store, style: &'a IdStyle) -> Self {
        Self { store, style }
    }

    /// Registry for `platform`, or a fresh one if none exists or the stored
    /// state cannot be read.
    pub fn get_registry(&self, platform: &str) -> PlatformRegistry {
        match self.load_all() {
            Ok(mut all) => all.remove(platform).unwrap_or_default(),
            Err(e) => {
                warn!(platform, error = %e, "identity registry unreadable, using empty registry");
                PlatformRegistry::default()
            }
        }
    }

    /// Page IDs are keyed by URL pattern.
    pub fn ensure_page_id(&mut self, platform: &str, url_pattern: &str) -> String {
        let stem = page_stem(url_pattern);
        self.ensure(platform, IdKind::Page, url_pattern, &stem)
    }

    /// Element IDs are keyed by `<page_id>|<selector>`; `element` only feeds
    /// the readable part of a newly created ID.
    pub fn ensure_element_id(
        &mut self,
        platform: &str,
        page_id: &str,
        selector: &str,
        element: &DomElement,
    ) -> String {
        let fingerprint = element_fingerprint(page_id, selector);
        let stem = element_stem(element);
        self.ensure(platform, IdKind::Element, &fingerprint, &stem)
    }

    /// Replace the platform's registry with an empty one.
    pub fn reset_registry(&mut self, platform: &str) -> Result<(), StoreError> {
        let mut all = self.load_all().unwrap_or_default();
        all.insert(platform.to_string(), PlatformRegistry::default());
        self.save_all(&all)
    }

    pub fn export_all(&self) -> Result<RegistryMap, StoreError> {
        self.load_all()
    }

    /// Overwrite every registry with `data`. No merge, no cross-platform
    /// collision checks.
    pub fn import_all(&mut self, data: RegistryMap) -> Result<(), StoreError> {
        self.save_all(&data)
    }

    fn ensure(&mut self, platform: &str, kind: IdKind, fingerprint: &str, stem: &str) -> String {
        let stem = format!("{}{}", self.style.prefix(kind), stem);

        let mut all = match self.load_all() {
            Ok(all) => all,
            Err(e) => {
                let id = format!("{}_{}", stem, Utc::now().timestamp_millis());
                warn!(
                    platform,
                    fingerprint,
                    id = %id,
                    error = %e,
                    "identity registry unreadable, issuing timestamp id"
                );
                return id;
            }
        };

        let registry = all.entry(platform.to_string()).or_default();
        let (id, created) = registry.assign(kind, fingerprint, &stem);

        if created {
            debug!(platform, fingerprint, id = %id, ?kind, "assigned new id");
            if let Err(e) = self.save_all(&all) {
                warn!(platform, id = %id, error = %e, "failed to persist identity registry");
            }
        }

        id
    }

    fn load_all(&self) -> Result<RegistryMap, StoreError> {
        Ok(keys::read::<RegistryMap>(&*self.store, keys::ID_REGISTRY)?.unwrap_or_default())
    }

    fn save_all(&mut self, all: &RegistryMap) -> Result<(), StoreError> {
        keys::write(&mut *self.store, keys::ID_REGISTRY, all)
    }
}

// ============================================================================
// ID stems
// ============================================================================

/// Readable part of a page ID: the last path segment, or `home` for `/`.
pub fn page_stem(url_pattern: &str) -> String {
    let segment = url_pattern
        .split('/')
        .rev()
        .find(|s| !s.trim().is_empty())
        .unwrap_or("");

    let token = sanitize_token(segment);
    if token.is_empty() { "home".into() } else { token }
}

/// Readable part of an element ID: `<type>_<id | classes | text | unknown>`.
pub fn element_stem(el: &DomElement) -> String {
    let label = el
        .id()
        .map(sanitize_token)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            let classes = stable_classes(el);
            let classes = if classes.is_empty() { el.classes() } else { classes };
            Some(sanitize_token(&classes.join("-"))).filter(|t| !t.is_empty())
        })
        .or_else(|| {
            el.visible_text()
                .map(|t| sanitize_token(&t.chars().take(TEXT_SNIPPET_CHARS).collect::<String>()))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| "unknown".into());

    format!("{}_{}", sanitize_token(&el.semantic_type()), label)
}

/// Lowercase, keep `[a-z0-9_-]`, turn everything else into single dashes.
pub fn sanitize_token(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}
