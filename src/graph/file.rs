//! File-backed knowledge graph store.
//!
//! The graph is a single JSON document, loaded on open and rewritten after
//! every mutation. Writes go through a temp file + rename so a crash never
//! leaves a truncated document behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::data::{GraphData, GRAPH_SCHEMA_VERSION};
use super::traits::{ConceptNode, KnowledgeGraphStore};
use crate::config::graph_path;
use crate::error::{Result, TutorError};

/// JSON file concept graph.
#[derive(Debug)]
pub struct FileGraphStore {
    path: PathBuf,
    graph: RwLock<GraphData>,
}

impl FileGraphStore {
    /// Open the store at the default location.
    ///
    /// Uses `~/.pythagore/graph.json` or `$PYTHAGORE_HOME/graph.json`.
    pub fn new() -> Result<Self> {
        let path = graph_path().ok_or_else(|| {
            TutorError::config("Could not determine graph path (no home directory)")
        })?;
        Self::open(path)
    }

    /// Open or create the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| TutorError::storage(parent, e))?;
            }
        }

        let graph = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| TutorError::storage(&path, e))?;
            let graph: GraphData = serde_json::from_str(&content)?;
            if graph.schema_version > GRAPH_SCHEMA_VERSION {
                return Err(TutorError::serde(format!(
                    "graph schema version {} is newer than supported {}",
                    graph.schema_version, GRAPH_SCHEMA_VERSION
                )));
            }
            graph
        } else {
            GraphData::default()
        };

        debug!(
            path = %path.display(),
            concepts = graph.concepts.len(),
            edges = graph.edges.len(),
            "opened graph file"
        );

        Ok(Self {
            path,
            graph: RwLock::new(graph),
        })
    }

    /// Location of the JSON document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "graph.json".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    /// Write the graph atomically using temp file + rename.
    fn atomic_write(&self, graph: &GraphData) -> Result<()> {
        let temp_path = self.temp_path();
        let json = serde_json::to_string_pretty(graph)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| TutorError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| TutorError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| TutorError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| TutorError::storage(&self.path, e))?;

        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GraphData>> {
        self.graph
            .read()
            .map_err(|_| TutorError::store_unavailable("graph file lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GraphData>> {
        self.graph
            .write()
            .map_err(|_| TutorError::store_unavailable("graph file lock poisoned"))
    }
}

impl KnowledgeGraphStore for FileGraphStore {
    fn prerequisites_of(&self, concept: &str) -> Result<Vec<String>> {
        Ok(self.read()?.prerequisites_of(concept))
    }

    fn next_concepts_of(&self, concept: &str) -> Result<Vec<String>> {
        Ok(self.read()?.next_concepts_of(concept))
    }

    fn record_interaction(
        &self,
        concept: &str,
        mastery: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let mut graph = self.write()?;
        // Mutate a copy so a failed write leaves memory and disk in agreement.
        let mut updated = graph.clone();
        updated.record_interaction(concept, mastery, timestamp)?;
        self.atomic_write(&updated)?;
        *graph = updated;
        Ok(())
    }

    fn concept(&self, name: &str) -> Result<Option<ConceptNode>> {
        Ok(self.read()?.concepts.get(name).cloned())
    }

    fn add_prerequisite(&self, from: &str, to: &str) -> Result<()> {
        let mut graph = self.write()?;
        let mut updated = graph.clone();
        if updated.add_prerequisite(from, to)? {
            self.atomic_write(&updated)?;
            *graph = updated;
        }
        Ok(())
    }

    fn ping(&self) -> bool {
        self.path
            .parent()
            .map(|p| p.as_os_str().is_empty() || p.is_dir())
            .unwrap_or(true)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
