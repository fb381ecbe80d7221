use serde::Serialize;
use serde::de::DeserializeOwned;

use super::store::{Store, StoreError};

pub const ID_REGISTRY: &str = "idRegistry";
pub const PLATFORM_KEY: &str = "platformKey";

pub const CAPTURE_MODE: &str = "captureMode";
pub const ELEMENT_DATA: &str = "elementData";
pub const PAGE_DATA: &str = "pageData";
pub const LAST_ELEMENT_ID: &str = "lastElementId";
pub const PENDING_NAVIGATION: &str = "pendingNavigation";
pub const LAST_NAVIGATION_ELEMENT_ID: &str = "lastNavigationElementId";

/// Keys that belong to one platform namespace.
pub const PLATFORM_SCOPED: [&str; 6] = [
    CAPTURE_MODE,
    ELEMENT_DATA,
    PAGE_DATA,
    LAST_ELEMENT_ID,
    PENDING_NAVIGATION,
    LAST_NAVIGATION_ELEMENT_ID,
];

/// `<platform>/<key>`
pub fn scoped(platform: &str, key: &str) -> String {
    format!("{}/{}", platform, key)
}

/// Read and deserialize a value. A value of the wrong shape is reported as
/// `StoreError::Corrupt`.
pub fn read<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                context: format!("key '{}'", key),
                source: e,
            }),
    }
}

pub fn write<T: Serialize>(store: &mut dyn Store, key: &str, value: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::Corrupt {
        context: format!("key '{}'", key),
        source: e,
    })?;
    store.set(key, value)
}

/// Write `Some` values, remove the key for `None`.
pub fn write_optional<T: Serialize>(
    store: &mut dyn Store,
    key: &str,
    value: Option<&T>,
) -> Result<(), StoreError> {
    match value {
        Some(v) => write(store, key, v),
        None => store.remove(key),
    }
}
