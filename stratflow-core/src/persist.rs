//! Strategy persistence: the key-value save/load contract and a JSON file
//! implementation.
//!
//! The core is indifferent to the backing store; it requires only that
//! `save` be best-effort idempotent and `load` return exactly what was last
//! saved for an id. Missing or corrupt documents load as `None` rather than
//! erroring (availability over strict validation for persisted data).

use crate::fingerprint::graph_fingerprint;
use crate::graph::edge::Edge;
use crate::graph::node::Node;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The persisted shape of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDoc {
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl StrategyDoc {
    pub fn fingerprint(&self) -> String {
        graph_fingerprint(&self.nodes, &self.edges)
    }
}

/// Key-value save/load contract. Booleans report success; failures are
/// best-effort signals, never panics.
pub trait StrategyStore {
    fn save(&self, id: &str, doc: &StrategyDoc) -> bool;
    fn load(&self, id: &str) -> Option<StrategyDoc>;
    fn delete(&self, id: &str) -> bool;
}

/// One JSON file per strategy id under a base directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn read_doc(path: &Path) -> Option<StrategyDoc> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }
}

impl StrategyStore for JsonFileStore {
    /// Best-effort idempotent: if the stored document has the same
    /// structural fingerprint and name, the write is skipped.
    fn save(&self, id: &str, doc: &StrategyDoc) -> bool {
        if std::fs::create_dir_all(&self.dir).is_err() {
            return false;
        }
        let path = self.path(id);
        if let Some(existing) = Self::read_doc(&path) {
            if existing.name == doc.name && existing.fingerprint() == doc.fingerprint() {
                return true;
            }
        }
        let Ok(json) = serde_json::to_string_pretty(doc) else {
            return false;
        };
        std::fs::write(&path, json).is_ok()
    }

    fn load(&self, id: &str) -> Option<StrategyDoc> {
        Self::read_doc(&self.path(id))
    }

    fn delete(&self, id: &str) -> bool {
        std::fs::remove_file(self.path(id)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::StrategyGraph;

    fn doc(name: &str) -> StrategyDoc {
        let graph = StrategyGraph::new();
        StrategyDoc {
            name: name.to_string(),
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
        }
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let d = doc("breakout");
        assert!(store.save("s1", &d));
        assert_eq!(store.load("s1"), Some(d));
    }

    #[test]
    fn load_missing_or_corrupt_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("nope").is_none());

        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        assert!(store.load("bad").is_none());
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(!store.delete("s1"));
        store.save("s1", &doc("a"));
        assert!(store.delete("s1"));
        assert!(store.load("s1").is_none());
    }

    #[test]
    fn identical_save_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let d = doc("same");
        assert!(store.save("s1", &d));
        let mtime = std::fs::metadata(dir.path().join("s1.json"))
            .unwrap()
            .modified()
            .unwrap();
        assert!(store.save("s1", &d));
        let mtime_after = std::fs::metadata(dir.path().join("s1.json"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(mtime, mtime_after);
    }
}
