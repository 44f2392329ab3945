//! Source registry: deduplicated process inputs.

use std::collections::HashMap;
use std::fmt;

/// Stable handle for one input file, equal to its position among the
/// process inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

impl SourceId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct SourceEntry {
    path: String,
    uses: usize,
}

/// Assigns identities to file paths in first-seen order and counts how many
/// tiles consume each.
///
/// Scoped to a single compile; iteration order is the order inputs are
/// declared on the command line.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    entries: Vec<SourceEntry>,
    by_path: HashMap<String, SourceId>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity for `path`, assigning the next one if the path is new.
    pub fn register(&mut self, path: &str) -> SourceId {
        if let Some(id) = self.by_path.get(path) {
            return *id;
        }
        let id = SourceId(self.entries.len());
        self.entries.push(SourceEntry {
            path: path.to_string(),
            uses: 0,
        });
        self.by_path.insert(path.to_string(), id);
        id
    }

    /// Record that one more tile consumes `id`.
    pub fn add_use(&mut self, id: SourceId) {
        if let Some(entry) = self.entries.get_mut(id.0) {
            entry.uses += 1;
        }
    }

    /// Register `path` and count one use of it.
    pub fn acquire(&mut self, path: &str) -> SourceId {
        let id = self.register(path);
        self.add_use(id);
        id
    }

    pub fn get(&self, path: &str) -> Option<SourceId> {
        self.by_path.get(path).copied()
    }

    pub fn usage_count(&self, id: SourceId) -> usize {
        self.entries.get(id.0).map_or(0, |entry| entry.uses)
    }

    pub fn path(&self, id: SourceId) -> Option<&str> {
        self.entries.get(id.0).map(|entry| entry.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered sources in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &str)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (SourceId(i), entry.path.as_str()))
    }
}
