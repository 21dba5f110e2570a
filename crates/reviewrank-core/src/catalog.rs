//! Item context lookup.
//!
//! The engine needs one descriptive text per item (an abstract, or the title
//! when no abstract is stored). [`ItemCatalog`] loads these from the
//! `{item_id: {"abstract": ..., "title": ...}}` metadata file.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::CatalogError;
use crate::obs::emit_missing_context;

/// Context used when an item has neither abstract nor title.
pub const UNKNOWN_ITEM_CONTEXT: &str = "Unknown item";

/// Resolves the context text an item's submissions are judged against.
///
/// Must never fail: unknown items resolve to a placeholder.
pub trait ContextLookup: Send + Sync {
    fn context_for(&self, item_id: &str) -> String;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ItemMetadata {
    pub fn new(abstract_text: Option<&str>, title: Option<&str>) -> Self {
        Self {
            abstract_text: abstract_text.map(str::to_string),
            title: title.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: HashMap<String, ItemMetadata>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item_id: impl Into<String>, metadata: ItemMetadata) {
        self.items.insert(item_id.into(), metadata);
    }

    pub fn with_item(mut self, item_id: impl Into<String>, metadata: ItemMetadata) -> Self {
        self.insert(item_id, metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self {
            items: serde_json::from_str(json)?,
        })
    }

    /// Load the metadata file. A missing file yields an empty catalog, so
    /// every item falls back to the placeholder context.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => {
                let catalog = Self::from_json(&json)?;
                info!(path = %path.display(), items = catalog.len(), "item catalog loaded");
                Ok(catalog)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "no item metadata found, using placeholder contexts");
                Ok(Self::new())
            }
            Err(source) => Err(CatalogError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|t| !t.trim().is_empty())
}

impl ContextLookup for ItemCatalog {
    fn context_for(&self, item_id: &str) -> String {
        let meta = self.items.get(item_id);
        if let Some(abstract_text) = meta.and_then(|m| non_blank(&m.abstract_text)) {
            return abstract_text.to_string();
        }
        let fallback = meta
            .and_then(|m| non_blank(&m.title))
            .unwrap_or(UNKNOWN_ITEM_CONTEXT);
        emit_missing_context(item_id, fallback);
        fallback.to_string()
    }
}
