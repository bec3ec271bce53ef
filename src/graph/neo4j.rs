//! Neo4j knowledge graph store.
//!
//! Talks to the Neo4j HTTP transactional endpoint
//! (`POST {uri}/db/{database}/tx/commit`) with basic auth. Every request
//! carries an explicit timeout; expiry is reported as
//! [`TutorError::StoreTimeout`], connection problems as
//! [`TutorError::StoreUnavailable`], and rejected credentials as
//! [`TutorError::Credentials`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::traits::{ConceptNode, KnowledgeGraphStore};
use crate::core::is_valid_mastery;
use crate::error::{Result, TutorError};

const PREREQUISITES_QUERY: &str = "\
MATCH (c:Concept {name: $concept})<-[:PREREQUISITE_OF]-(p:Concept)
RETURN p.name AS prerequisite
ORDER BY prerequisite";

const NEXT_CONCEPTS_QUERY: &str = "\
MATCH (c:Concept {name: $concept})-[:PREREQUISITE_OF]->(n:Concept)
RETURN n.name AS next_concept
ORDER BY next_concept";

const RECORD_INTERACTION_QUERY: &str = "\
MERGE (c:Concept {name: $concept})
SET c.lastMastery = $mastery,
    c.lastInteraction = datetime($timestamp)";

const CONCEPT_QUERY: &str = "\
MATCH (c:Concept {name: $name})
RETURN c.name, c.lastMastery, toString(c.lastInteraction)";

// Returns no row when a path `to -> ... -> from` already exists.
const ADD_PREREQUISITE_QUERY: &str = "\
MERGE (f:Concept {name: $from})
MERGE (t:Concept {name: $to})
WITH f, t
OPTIONAL MATCH p = (t)-[:PREREQUISITE_OF*]->(f)
WITH f, t, count(p) AS cycles
WHERE cycles = 0
MERGE (f)-[:PREREQUISITE_OF]->(t)
RETURN cycles";

const PING_QUERY: &str = "RETURN 1";

/// Connection settings for a Neo4j server.
#[derive(Debug, Clone)]
pub struct Neo4jSettings {
    /// Base HTTP URI, e.g. `http://localhost:7474`.
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Database name (`neo4j` by default).
    pub database: String,
    /// Per-request deadline.
    pub timeout: Duration,
}

impl Neo4jSettings {
    /// Check that the endpoint and credentials are present.
    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(TutorError::config("neo4j uri is empty"));
        }
        if !(self.uri.starts_with("http://") || self.uri.starts_with("https://")) {
            return Err(TutorError::config(format!(
                "neo4j uri '{}' must use http:// or https://",
                self.uri
            )));
        }
        if self.user.trim().is_empty() {
            return Err(TutorError::credentials("neo4j user is empty"));
        }
        if self.password.is_empty() {
            return Err(TutorError::credentials("neo4j password is empty"));
        }
        if self.database.trim().is_empty() {
            return Err(TutorError::config("neo4j database name is empty"));
        }
        if self.timeout.is_zero() {
            return Err(TutorError::config("neo4j timeout must be positive"));
        }
        Ok(())
    }

    /// Transaction commit endpoint.
    pub fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.uri.trim_end_matches('/'),
            self.database
        )
    }
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// Knowledge graph stored in Neo4j.
#[derive(Debug)]
pub struct Neo4jGraphStore {
    settings: Neo4jSettings,
    client: Client,
}

impl Neo4jGraphStore {
    /// Build a store without contacting the server.
    pub fn new(settings: Neo4jSettings) -> Result<Self> {
        settings.validate()?;
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .build()
            .map_err(|e| TutorError::store_unavailable(format!("http client: {}", e)))?;
        Ok(Self { settings, client })
    }

    /// Build a store and verify the server accepts the credentials.
    pub fn connect(settings: Neo4jSettings) -> Result<Self> {
        let store = Self::new(settings)?;
        store.run(PING_QUERY, json!({}))?;
        debug!(uri = %store.settings.uri, "connected to neo4j");
        Ok(store)
    }

    pub fn settings(&self) -> &Neo4jSettings {
        &self.settings
    }

    /// Run one Cypher statement and return its rows.
    fn run(&self, statement: &str, parameters: Value) -> Result<Vec<Vec<Value>>> {
        let body = request_body(statement, parameters);
        let response = self
            .client
            .post(self.settings.commit_url())
            .basic_auth(&self.settings.user, Some(&self.settings.password))
            .json(&body)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TutorError::credentials(format!(
                "neo4j rejected credentials for user '{}'",
                self.settings.user
            )));
        }
        if !status.is_success() {
            return Err(TutorError::store_unavailable(format!(
                "neo4j returned HTTP {}",
                status
            )));
        }

        let text = response.text().map_err(|e| self.transport_error(e))?;
        parse_response(&text)
    }

    fn transport_error(&self, err: reqwest::Error) -> TutorError {
        if err.is_timeout() {
            warn!(uri = %self.settings.uri, "neo4j request timed out");
            TutorError::store_timeout(self.settings.timeout.as_millis() as u64)
        } else {
            TutorError::store_unavailable(err.to_string())
        }
    }

    fn names(&self, statement: &str, concept: &str) -> Result<Vec<String>> {
        let rows = self.run(statement, json!({ "concept": concept }))?;
        rows.into_iter()
            .map(|row| match row.first() {
                Some(Value::String(name)) => Ok(name.clone()),
                other => Err(TutorError::serde(format!(
                    "expected concept name, got {:?}",
                    other
                ))),
            })
            .collect()
    }
}

impl KnowledgeGraphStore for Neo4jGraphStore {
    fn prerequisites_of(&self, concept: &str) -> Result<Vec<String>> {
        self.names(PREREQUISITES_QUERY, concept)
    }

    fn next_concepts_of(&self, concept: &str) -> Result<Vec<String>> {
        self.names(NEXT_CONCEPTS_QUERY, concept)
    }

    fn record_interaction(
        &self,
        concept: &str,
        mastery: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        if !is_valid_mastery(mastery) {
            return Err(TutorError::invalid_input(format!(
                "mastery for '{}' must be in [0, 1], got {}",
                concept, mastery
            )));
        }
        self.run(
            RECORD_INTERACTION_QUERY,
            json!({
                "concept": concept,
                "mastery": mastery,
                "timestamp": timestamp.to_rfc3339(),
            }),
        )?;
        Ok(())
    }

    fn concept(&self, name: &str) -> Result<Option<ConceptNode>> {
        let rows = self.run(CONCEPT_QUERY, json!({ "name": name }))?;
        rows.first().map(|row| parse_concept_row(row)).transpose()
    }

    fn add_prerequisite(&self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Err(TutorError::cyclic_prerequisite(from, to));
        }
        let rows = self.run(ADD_PREREQUISITE_QUERY, json!({ "from": from, "to": to }))?;
        if rows.is_empty() {
            return Err(TutorError::cyclic_prerequisite(from, to));
        }
        Ok(())
    }

    fn ping(&self) -> bool {
        self.run(PING_QUERY, json!({})).is_ok()
    }

    fn name(&self) -> &'static str {
        "neo4j"
    }
}

fn request_body(statement: &str, parameters: Value) -> Value {
    json!({
        "statements": [
            { "statement": statement, "parameters": parameters }
        ]
    })
}

fn parse_response(text: &str) -> Result<Vec<Vec<Value>>> {
    let response: TxResponse = serde_json::from_str(text)?;

    if let Some(err) = response.errors.first() {
        if err.code.starts_with("Neo.ClientError.Security") {
            return Err(TutorError::credentials(err.message.clone()));
        }
        return Err(TutorError::store_unavailable(format!(
            "{}: {}",
            err.code, err.message
        )));
    }

    Ok(response
        .results
        .into_iter()
        .next()
        .map(|r| r.data.into_iter().map(|d| d.row).collect())
        .unwrap_or_default())
}

fn parse_concept_row(row: &[Value]) -> Result<ConceptNode> {
    let name = row
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| TutorError::serde("concept row has no name"))?;

    let last_mastery = row.get(1).and_then(Value::as_f64);

    let last_interaction = match row.get(2).and_then(Value::as_str) {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| TutorError::serde(format!("bad lastInteraction '{}': {}", raw, e)))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(ConceptNode {
        name: name.to_string(),
        last_mastery,
        last_interaction,
    })
}
