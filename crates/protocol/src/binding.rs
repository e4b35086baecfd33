use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Route table mapping logical server tags to physical queue names.
///
/// Consulted before every publish. Publishing to a tag that is not bound is a
/// client-side condition, never a broker error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueBinding {
    routes: HashMap<String, String>,
}

impl QueueBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `tag` to the physical queue `queue`, replacing any previous binding.
    pub fn bind(mut self, tag: impl Into<String>, queue: impl Into<String>) -> Self {
        self.routes.insert(tag.into(), queue.into());
        self
    }

    /// Resolves a logical tag to its physical queue name.
    pub fn resolve(&self, tag: &str) -> Option<&str> {
        self.routes.get(tag).map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.routes.contains_key(tag)
    }

    /// Iterates over all bound physical queue names.
    pub fn queues(&self) -> impl Iterator<Item = &str> {
        self.routes.values().map(String::as_str)
    }
}

impl FromIterator<(String, String)> for QueueBinding {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}
