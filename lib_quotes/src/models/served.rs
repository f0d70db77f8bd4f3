use serde::{Deserialize, Serialize};

/// Any cache-resident value as returned to callers.
///
/// `cached` is attached at response time only; the wrapped value is what
/// gets persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Served<T> {
    #[serde(flatten)]
    pub data: T,
    pub cached: bool,
}

impl<T> Served<T> {
    /// Produced by this request (provider call or synthesis).
    pub fn fresh(data: T) -> Self {
        Self { data, cached: false }
    }

    /// Read back from the cache store.
    pub fn from_cache(data: T) -> Self {
        Self { data, cached: true }
    }
}
