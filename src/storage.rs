//! Outcome history persisted as one JSON file per outcome.

use crate::model::ClassificationOutcome;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct HistoryStore {
    root: PathBuf,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<data_local_dir>/spam-check/history`.
    pub fn default_location() -> Result<Self> {
        let base = dirs::data_local_dir().context("no local data directory for this platform")?;
        Ok(Self::new(base.join("spam-check").join("history")))
    }

    fn path_for(&self, outcome: &ClassificationOutcome) -> PathBuf {
        self.root.join(format!("{}.json", outcome.id()))
    }

    pub fn save_outcome(&self, outcome: &ClassificationOutcome) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("create history dir {}", self.root.display()))?;
        let path = self.path_for(outcome);
        let data = serde_json::to_vec_pretty(outcome)?;
        std::fs::write(&path, data).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Most recent outcomes first. Unreadable files are skipped.
    pub fn load_recent(&self, limit: usize) -> Result<Vec<ClassificationOutcome>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.root)
            .with_context(|| format!("read history dir {}", self.root.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read(&path)
                .map_err(anyhow::Error::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<ClassificationOutcome>(&bytes)?));
            match parsed {
                Ok(o) => out.push(o),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable history entry");
                }
            }
        }
        out.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        out.truncate(limit);
        Ok(out)
    }

    pub fn delete_outcome(&self, outcome: &ClassificationOutcome) -> Result<()> {
        let path = self.path_for(outcome);
        std::fs::remove_file(&path).with_context(|| format!("delete {}", path.display()))
    }
}

pub fn export_json(path: &Path, outcome: &ClassificationOutcome) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export dir {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(outcome)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChannelType;
    use time::macros::datetime;

    fn classified(id: &str, ts: time::OffsetDateTime) -> ClassificationOutcome {
        ClassificationOutcome::Classified {
            id: id.into(),
            message: format!("message {id}"),
            channel: ChannelType::Email,
            is_spam: false,
            confidence: 0.02,
            language: "en".into(),
            indicators: Vec::new(),
            timestamp: ts,
        }
    }

    #[test]
    fn load_recent_is_newest_first_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        store
            .save_outcome(&classified("a", datetime!(2026-10-01 08:00 UTC)))
            .unwrap();
        store
            .save_outcome(&classified("b", datetime!(2026-10-03 08:00 UTC)))
            .unwrap();
        store
            .save_outcome(&classified("c", datetime!(2026-10-02 08:00 UTC)))
            .unwrap();

        let all = store.load_recent(10).unwrap();
        let ids: Vec<_> = all.iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let two = store.load_recent(2).unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].id(), "b");
    }

    #[test]
    fn missing_dir_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nope"));
        assert!(store.load_recent(5).unwrap().is_empty());
    }

    #[test]
    fn corrupt_entries_are_skipped_and_delete_works() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        let keep = classified("keep", datetime!(2026-10-05 10:00 UTC));
        store.save_outcome(&keep).unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let loaded = store.load_recent(10).unwrap();
        assert_eq!(loaded, vec![keep.clone()]);

        store.delete_outcome(&keep).unwrap();
        assert!(store.load_recent(10).unwrap().is_empty());
        assert!(store.delete_outcome(&keep).is_err());
    }

    #[test]
    fn export_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("one.json");
        let o = classified("x", datetime!(2026-10-19 09:30 UTC));
        export_json(&path, &o).unwrap();
        let back: ClassificationOutcome =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, o);
    }
}
