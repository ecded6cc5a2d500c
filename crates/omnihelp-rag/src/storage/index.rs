//! In-process cosine vector index with optional JSON snapshots

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::providers::{MetadataFilter, VectorQueryResult};

/// One stored vector with its chunk text and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    vector: Vec<f32>,
    document: String,
    metadata: BTreeMap<String, String>,
}

/// Snapshot file layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    dimensions: Option<usize>,
    entries: BTreeMap<String, IndexEntry>,
}

/// Brute-force cosine index keyed by chunk id
pub struct InMemoryIndex {
    /// Entries keyed by id
    entries: RwLock<BTreeMap<String, IndexEntry>>,
    /// Vector width, fixed by the first insert unless configured
    dimensions: RwLock<Option<usize>>,
    /// Snapshot location
    persist_path: Option<PathBuf>,
    /// Held from serialization through rename so snapshots land in order
    persist_lock: Mutex<()>,
}

impl InMemoryIndex {
    /// Create an empty, memory-only index
    pub fn new(dimensions: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            dimensions: RwLock::new(dimensions),
            persist_path: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Open an index backed by a snapshot file, loading it if present
    pub fn open<P: AsRef<Path>>(path: P, dimensions: Option<usize>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let snapshot = if path.exists() {
            let raw = std::fs::read(&path)?;
            let snapshot: Snapshot = serde_json::from_slice(&raw).map_err(|e| {
                Error::vector_index(format!("Corrupt snapshot {}: {}", path.display(), e))
            })?;
            tracing::info!(
                "Loaded {} vectors from {}",
                snapshot.entries.len(),
                path.display()
            );
            snapshot
        } else {
            Snapshot::default()
        };

        if let (Some(configured), Some(stored)) = (dimensions, snapshot.dimensions) {
            if configured != stored && !snapshot.entries.is_empty() {
                return Err(Error::vector_index(format!(
                    "Snapshot holds {}-dimensional vectors, configured for {}",
                    stored, configured
                )));
            }
        }

        Ok(Self {
            entries: RwLock::new(snapshot.entries),
            dimensions: RwLock::new(snapshot.dimensions.or(dimensions)),
            persist_path: Some(path),
            persist_lock: Mutex::new(()),
        })
    }

    /// Insert or replace entries
    pub fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[BTreeMap<String, String>],
    ) -> Result<()> {
        if ids.len() != vectors.len() || ids.len() != documents.len() || ids.len() != metadatas.len()
        {
            return Err(Error::vector_index(format!(
                "Mismatched upsert lengths: {} ids, {} vectors, {} documents, {} metadatas",
                ids.len(),
                vectors.len(),
                documents.len(),
                metadatas.len()
            )));
        }
        if ids.is_empty() {
            return Ok(());
        }

        {
            let mut dimensions = self.dimensions.write();
            let expected = *dimensions.get_or_insert(vectors[0].len());
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
                return Err(Error::vector_index(format!(
                    "Expected {}-dimensional vector, got {}",
                    expected,
                    bad.len()
                )));
            }

            let mut entries = self.entries.write();
            for (((id, vector), document), metadata) in
                ids.iter().zip(vectors).zip(documents).zip(metadatas)
            {
                entries.insert(
                    id.clone(),
                    IndexEntry {
                        vector: vector.clone(),
                        document: document.clone(),
                        metadata: metadata.clone(),
                    },
                );
            }
        }

        self.persist()
    }

    /// The `k` nearest entries to `vector`, closest first
    pub fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<VectorQueryResult> {
        if let Some(expected) = *self.dimensions.read() {
            if vector.len() != expected {
                return Err(Error::vector_index(format!(
                    "Query vector has {} dimensions, index holds {}",
                    vector.len(),
                    expected
                )));
            }
        }

        let entries = self.entries.read();
        let mut hits: Vec<(f32, &String, &IndexEntry)> = entries
            .iter()
            .filter(|(_, entry)| matches_filter(&entry.metadata, filter))
            .map(|(id, entry)| (cosine_distance(vector, &entry.vector), id, entry))
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        hits.truncate(k);

        let mut result = VectorQueryResult {
            documents: vec![Vec::with_capacity(hits.len())],
            metadatas: vec![Vec::with_capacity(hits.len())],
            distances: vec![Vec::with_capacity(hits.len())],
            ids: vec![Vec::with_capacity(hits.len())],
        };
        for (distance, id, entry) in hits {
            result.documents[0].push(entry.document.clone());
            result.metadatas[0].push(entry.metadata.clone());
            result.distances[0].push(distance);
            result.ids[0].push(id.clone());
        }

        Ok(result)
    }

    /// Remove entries by id and/or metadata predicate
    pub fn delete(&self, ids: Option<&[String]>, filter: Option<&MetadataFilter>) -> Result<usize> {
        if ids.is_none() && filter.is_none() {
            return Ok(0);
        }

        let removed = {
            let mut entries = self.entries.write();
            let before = entries.len();
            entries.retain(|id, entry| {
                let id_hit = ids.map_or(true, |ids| ids.contains(id));
                let meta_hit = filter.map_or(true, |f| matches_filter(&entry.metadata, Some(f)));
                !(id_hit && meta_hit)
            });
            before - entries.len()
        };

        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };

        let _guard = self.persist_lock.lock();

        let bytes = {
            let snapshot = SnapshotRef {
                dimensions: *self.dimensions.read(),
                entries: &self.entries.read(),
            };
            serde_json::to_vec(&snapshot)?
        };

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    dimensions: Option<usize>,
    entries: &'a BTreeMap<String, IndexEntry>,
}

fn matches_filter(metadata: &BTreeMap<String, String>, filter: Option<&MetadataFilter>) -> bool {
    filter.map_or(true, |filter| {
        filter
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value))
    })
}

/// Cosine distance in `[0, 2]`; zero vectors sit at distance 1
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("source".to_string(), source.to_string())])
    }

    fn seeded() -> InMemoryIndex {
        let index = InMemoryIndex::new(Some(2));
        index
            .upsert(
                &["a".into(), "b".into(), "c".into()],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
                &["alpha".into(), "beta".into(), "gamma".into()],
                &[meta("one.pdf"), meta("two.pdf"), meta("one.pdf")],
            )
            .unwrap();
        index
    }

    #[test]
    fn test_query_orders_by_distance() {
        let index = seeded();
        let result = index.query(&[1.0, 0.1], 2, None).unwrap();

        assert_eq!(result.ids[0], vec!["a".to_string(), "c".to_string()]);
        assert!(result.distances[0][0] <= result.distances[0][1]);
        assert_eq!(result.documents[0][0], "alpha");
    }

    #[test]
    fn test_query_applies_metadata_filter() {
        let index = seeded();
        let filter = meta("two.pdf");
        let result = index.query(&[1.0, 0.0], 5, Some(&filter)).unwrap();

        assert_eq!(result.ids[0], vec!["b".to_string()]);
    }

    #[test]
    fn test_empty_index_returns_one_empty_batch() {
        let index = InMemoryIndex::new(None);
        let result = index.query(&[1.0, 0.0], 3, None).unwrap();
        assert_eq!(result.documents.len(), 1);
        assert!(result.documents[0].is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let index = seeded();
        let err = index
            .upsert(&["d".into()], &[vec![1.0, 0.0, 0.0]], &["delta".into()], &[meta("x")])
            .unwrap_err();
        assert!(matches!(err, Error::VectorIndex(_)));
        assert!(index.query(&[1.0], 1, None).is_err());
    }

    #[test]
    fn test_upsert_replaces_existing_id() {
        let index = seeded();
        index
            .upsert(&["a".into()], &[vec![0.0, 1.0]], &["alpha v2".into()], &[meta("one.pdf")])
            .unwrap();

        assert_eq!(index.len(), 3);
        let result = index.query(&[0.0, 1.0], 1, Some(&meta("one.pdf"))).unwrap();
        assert_eq!(result.documents[0][0], "alpha v2");
    }

    #[test]
    fn test_delete_by_filter_and_ids() {
        let index = seeded();
        assert_eq!(index.delete(None, Some(&meta("one.pdf"))).unwrap(), 2);
        assert_eq!(index.delete(Some(&["b".to_string()]), None).unwrap(), 1);
        assert!(index.is_empty());
        assert_eq!(index.delete(None, None).unwrap(), 0);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        {
            let index = InMemoryIndex::open(&path, Some(2)).unwrap();
            index
                .upsert(&["a".into()], &[vec![1.0, 0.0]], &["alpha".into()], &[meta("one.pdf")])
                .unwrap();
        }

        let reopened = InMemoryIndex::open(&path, Some(2)).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(InMemoryIndex::open(&path, Some(3)).is_err());
    }

    #[test]
    fn test_concurrent_upserts_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let index = InMemoryIndex::open(&path, Some(2)).unwrap();

        std::thread::scope(|scope| {
            for t in 0..8 {
                let index = &index;
                scope.spawn(move || {
                    for i in 0..50 {
                        index
                            .upsert(
                                &[format!("doc{}_{}", t, i)],
                                &[vec![1.0, 0.0]],
                                &["chunk".into()],
                                &[meta("manual.pdf")],
                            )
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(index.len(), 400);
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(InMemoryIndex::open(&path, Some(2)).unwrap().len(), 400);
    }

    #[test]
    fn test_cosine_distance_bounds() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
