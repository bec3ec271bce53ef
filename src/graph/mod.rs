//! Knowledge graph stores.
//!
//! Concepts and their `PREREQUISITE_OF` relations, plus the last mastery
//! observed for each concept.
//!
//! Available stores:
//! - **Memory**: ephemeral, for tests and one-off runs
//! - **File**: JSON document under the pythagore home directory (default)
//! - **Neo4j**: remote graph over the HTTP transactional API

pub mod data;
pub mod fallback;
pub mod file;
pub mod memory;
pub mod neo4j;
pub mod traits;

pub use data::{GraphData, PrerequisiteEdge, GRAPH_SCHEMA_VERSION};
pub use fallback::FallbackGraphStore;
pub use file::FileGraphStore;
pub use memory::MemoryGraphStore;
pub use neo4j::{Neo4jGraphStore, Neo4jSettings};
pub use traits::{ConceptNode, KnowledgeGraphStore};
