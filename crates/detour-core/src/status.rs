use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The configured redirect status codes, each with a display label.
///
/// Deserializes from a JSON object keyed by status code:
///
/// ```
/// use detour_core::StatusTable;
///
/// let json = r#"{"301": "Permanent", "308": "Permanent (308)"}"#;
/// let table: StatusTable = serde_json::from_str(json).unwrap();
/// assert!(table.contains(308));
/// assert!(!table.contains(302));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusTable(BTreeMap<u16, String>);

impl StatusTable {
    /// Creates a table from `(code, label)` pairs.
    pub fn new<I, L>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u16, L)>,
        L: Into<String>,
    {
        Self(
            entries
                .into_iter()
                .map(|(code, label)| (code, label.into()))
                .collect(),
        )
    }

    pub fn contains(&self, status: u16) -> bool {
        self.0.contains_key(&status)
    }

    pub fn label(&self, status: u16) -> Option<&str> {
        self.0.get(&status).map(String::as_str)
    }

    pub fn codes(&self) -> BTreeSet<u16> {
        self.0.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for StatusTable {
    fn default() -> Self {
        Self::new([
            (301, "Permanent (301)"),
            (302, "Normal (302)"),
            (307, "Temporary (307)"),
        ])
    }
}

/// Source of the status codes a resolver may serve.
///
/// Implementations are consulted on every lookup, so a change is visible to
/// the next resolve without touching stored rules.
pub trait StatusCatalog: Send + Sync + 'static {
    fn allowed_statuses(&self) -> BTreeSet<u16>;
}

impl StatusCatalog for StatusTable {
    fn allowed_statuses(&self) -> BTreeSet<u16> {
        self.codes()
    }
}

/// A status table that can be replaced while resolvers hold it.
#[derive(Debug, Clone, Default)]
pub struct SharedStatusTable {
    inner: Arc<RwLock<StatusTable>>,
}

impl SharedStatusTable {
    pub fn new(table: StatusTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Swaps in a new table and returns the previous one.
    pub fn replace(&self, table: StatusTable) -> StatusTable {
        std::mem::replace(&mut *self.inner.write(), table)
    }

    pub fn snapshot(&self) -> StatusTable {
        self.inner.read().clone()
    }
}

impl StatusCatalog for SharedStatusTable {
    fn allowed_statuses(&self) -> BTreeSet<u16> {
        self.inner.read().codes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let table = StatusTable::default();
        assert_eq!(table.codes(), BTreeSet::from([301, 302, 307]));
        assert_eq!(table.label(301), Some("Permanent (301)"));
        assert_eq!(table.label(308), None);
    }

    #[test]
    fn deserialize_from_json_object() {
        let table: StatusTable = serde_json::from_str(r#"{"302": "Found"}"#).unwrap();
        assert_eq!(table.codes(), BTreeSet::from([302]));
        assert_eq!(table.label(302), Some("Found"));
    }

    #[test]
    fn shared_table_replace_is_visible_to_clones() {
        let shared = SharedStatusTable::new(StatusTable::default());
        let observer = shared.clone();

        let previous = shared.replace(StatusTable::new([(308, "Permanent (308)")]));

        assert!(previous.contains(301));
        assert_eq!(observer.allowed_statuses(), BTreeSet::from([308]));
        assert!(observer.snapshot().contains(308));
    }
}
