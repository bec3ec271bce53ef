//! Configuration loading for Pythagore.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.pythagore/config.toml`)
//! 3. User config (`~/.pythagore/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with the defaults below
//! when no config exists, using a JSON graph file under the home directory.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::encoder::DEFAULT_STATE_DIMENSION;
use crate::error::{Result, TutorError};
use crate::graph::Neo4jSettings;
use crate::trainer::{DEFAULT_GAMMA, DEFAULT_TARGET_SYNC_INTERVAL};

/// Environment variable holding the Neo4j password.
pub const NEO4J_PASSWORD_ENV: &str = "PYTHAGORE_NEO4J_PASSWORD";

/// Main configuration struct for Pythagore.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Decision engine hyperparameters.
    pub engine: EngineConfig,
    /// Knowledge graph backend.
    pub graph: GraphConfig,
    /// Presentation preferences passed to the dialogue layer.
    pub tutor: TutorProfile,
}

/// Decision engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of encoded learner state vectors.
    pub state_dimension: usize,
    /// Discount factor for future value.
    pub gamma: f64,
    /// Optimiser step size.
    pub learning_rate: f64,
    /// Training steps between target network refreshes (0 = never).
    pub target_sync_interval: u64,
    /// Exploration rate used when the caller does not pass one.
    pub epsilon: f64,
    /// Model checkpoint location. Defaults to `<pythagore_home>/model.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<PathBuf>,
    /// Seed for weight initialisation and exploration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Default optimiser step size.
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;

/// Default exploration rate.
pub const DEFAULT_EPSILON: f64 = 0.1;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dimension: DEFAULT_STATE_DIMENSION,
            gamma: DEFAULT_GAMMA,
            learning_rate: DEFAULT_LEARNING_RATE,
            target_sync_interval: DEFAULT_TARGET_SYNC_INTERVAL,
            epsilon: DEFAULT_EPSILON,
            checkpoint: None,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn is_valid_state_dimension(value: usize) -> bool {
        value > 0
    }

    /// Check if a value is a probability (gamma, epsilon).
    pub fn is_valid_probability(value: f64) -> bool {
        value.is_finite() && (0.0..=1.0).contains(&value)
    }

    pub fn is_valid_learning_rate(value: f64) -> bool {
        value.is_finite() && value > 0.0
    }
}

/// Knowledge graph backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GraphBackend {
    Memory,
    #[default]
    File,
    Neo4j,
}

impl GraphBackend {
    pub fn all() -> &'static [GraphBackend] {
        &[GraphBackend::Memory, GraphBackend::File, GraphBackend::Neo4j]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GraphBackend::Memory => "memory",
            GraphBackend::File => "file",
            GraphBackend::Neo4j => "neo4j",
        }
    }
}

impl FromStr for GraphBackend {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        GraphBackend::all()
            .iter()
            .copied()
            .find(|b| b.as_str() == lower)
            .ok_or_else(|| TutorError::config(format!("unknown graph backend '{}'", s)))
    }
}

/// Behaviour when the graph backend cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OnUnavailable {
    /// Propagate the store error.
    #[default]
    Fail,
    /// Answer relationship reads with an empty list.
    EmptyPrerequisites,
}

impl OnUnavailable {
    pub fn all() -> &'static [OnUnavailable] {
        &[OnUnavailable::Fail, OnUnavailable::EmptyPrerequisites]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OnUnavailable::Fail => "fail",
            OnUnavailable::EmptyPrerequisites => "empty-prerequisites",
        }
    }
}

impl FromStr for OnUnavailable {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        OnUnavailable::all()
            .iter()
            .copied()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| TutorError::config(format!("unknown on_unavailable mode '{}'", s)))
    }
}

/// Minimum Neo4j request timeout.
pub const MIN_TIMEOUT_MS: u64 = 1;

/// Knowledge graph configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Backend: "memory", "file", or "neo4j".
    pub backend: GraphBackend,
    /// Graph file for the file backend. Defaults to `<pythagore_home>/graph.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Neo4j HTTP endpoint.
    pub uri: String,
    /// Neo4j user. The password is only read from the environment.
    pub user: String,
    /// Neo4j database name.
    pub database: String,
    /// Per-request timeout for remote backends.
    pub timeout_ms: u64,
    /// "fail" or "empty-prerequisites".
    pub on_unavailable: OnUnavailable,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: GraphBackend::File,
            path: None,
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            database: "neo4j".to_string(),
            timeout_ms: 5000,
            on_unavailable: OnUnavailable::Fail,
        }
    }
}

impl GraphConfig {
    pub fn is_valid_timeout_ms(value: u64) -> bool {
        value >= MIN_TIMEOUT_MS
    }

    /// Whether relationship reads fall back to empty lists on outage.
    pub fn degrades_reads(&self) -> bool {
        self.on_unavailable == OnUnavailable::EmptyPrerequisites
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Graph file path: the configured one, else the default location.
    pub fn file_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(graph_path)
    }

    /// Neo4j connection settings, with the password from the environment.
    pub fn neo4j_settings(&self) -> Result<Neo4jSettings> {
        let password = match env::var(NEO4J_PASSWORD_ENV) {
            Ok(p) if !p.is_empty() => p,
            _ => {
                return Err(TutorError::credentials(format!(
                    "{} is not set",
                    NEO4J_PASSWORD_ENV
                )))
            }
        };
        Ok(Neo4jSettings {
            uri: self.uri.clone(),
            user: self.user.clone(),
            password,
            database: self.database.clone(),
            timeout: self.timeout(),
        })
    }
}

/// Explanation depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    Elementary,
    #[default]
    Highschool,
    College,
    Graduate,
}

impl Depth {
    pub fn all() -> &'static [Depth] {
        &[
            Depth::Elementary,
            Depth::Highschool,
            Depth::College,
            Depth::Graduate,
        ]
    }
}

/// Preferred way of engaging with material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    #[default]
    Active,
    Reflective,
    Visual,
    Verbal,
    Sensing,
    Intuitive,
    Sequential,
    Global,
}

impl LearningStyle {
    pub fn all() -> &'static [LearningStyle] {
        &[
            LearningStyle::Active,
            LearningStyle::Reflective,
            LearningStyle::Visual,
            LearningStyle::Verbal,
            LearningStyle::Sensing,
            LearningStyle::Intuitive,
            LearningStyle::Sequential,
            LearningStyle::Global,
        ]
    }
}

/// How the tutor phrases its turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    Formal,
    Textbook,
    Layman,
    Storytelling,
    #[default]
    Socratic,
}

impl CommunicationStyle {
    pub fn all() -> &'static [CommunicationStyle] {
        &[
            CommunicationStyle::Formal,
            CommunicationStyle::Textbook,
            CommunicationStyle::Layman,
            CommunicationStyle::Storytelling,
            CommunicationStyle::Socratic,
        ]
    }
}

/// Emotional register of the tutor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToneStyle {
    #[default]
    Encouraging,
    Neutral,
    Informative,
    Friendly,
    Humorous,
}

impl ToneStyle {
    pub fn all() -> &'static [ToneStyle] {
        &[
            ToneStyle::Encouraging,
            ToneStyle::Neutral,
            ToneStyle::Informative,
            ToneStyle::Friendly,
            ToneStyle::Humorous,
        ]
    }
}

/// Reasoning style used in explanations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningFramework {
    Deductive,
    Inductive,
    Abductive,
    Analogical,
    #[default]
    Causal,
}

impl ReasoningFramework {
    pub fn all() -> &'static [ReasoningFramework] {
        &[
            ReasoningFramework::Deductive,
            ReasoningFramework::Inductive,
            ReasoningFramework::Abductive,
            ReasoningFramework::Analogical,
            ReasoningFramework::Causal,
        ]
    }
}

/// Dialogue language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    French,
    Spanish,
    German,
    Italian,
    Portuguese,
}

impl Language {
    pub fn all() -> &'static [Language] {
        &[
            Language::English,
            Language::French,
            Language::Spanish,
            Language::German,
            Language::Italian,
            Language::Portuguese,
        ]
    }
}

/// Tutor presentation profile.
///
/// Every field is a closed set, so an unknown style is rejected once at the
/// boundary instead of travelling through the system as free text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TutorProfile {
    pub depth: Depth,
    pub learning_style: LearningStyle,
    pub communication_style: CommunicationStyle,
    pub tone_style: ToneStyle,
    pub reasoning_framework: ReasoningFramework,
    pub use_emojis: bool,
    pub language: Language,
}

impl Default for TutorProfile {
    fn default() -> Self {
        Self {
            depth: Depth::default(),
            learning_style: LearningStyle::default(),
            communication_style: CommunicationStyle::default(),
            tone_style: ToneStyle::default(),
            reasoning_framework: ReasoningFramework::default(),
            use_emojis: true,
            language: Language::default(),
        }
    }
}

impl TutorProfile {
    /// Parse a profile from a JSON object such as
    /// `{"depth": "Highschool", "tone_style": "Encouraging", ...}`.
    ///
    /// String values are matched case-insensitively. Missing fields take
    /// their defaults; unknown fields and values are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a profile from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(TutorError::config("tutor profile must be a JSON object"));
        };
        let normalized = map
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k, Value::String(s.to_lowercase())),
                other => (k, other),
            })
            .collect();
        serde_json::from_value(Value::Object(normalized))
            .map_err(|e| TutorError::config(format!("invalid tutor profile: {}", e)))
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.pythagore/config.toml` in cwd or an ancestor)
    /// 3. User config (`~/.pythagore/config.toml`)
    /// 4. Defaults
    pub fn load() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| TutorError::storage(".", e))?;
        Self::load_from_cwd(&cwd)
    }

    /// Load configuration with a specific working directory.
    ///
    /// Missing files are skipped; a file that exists but does not parse is
    /// an error.
    pub fn load_from_cwd(cwd: &Path) -> Result<Self> {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config()? {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd)? {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_user_config() -> Result<Option<Config>> {
        match pythagore_home() {
            Some(home) => Self::load_optional(&home.join("config.toml")),
            None => Ok(None),
        }
    }

    fn load_project_config(cwd: &Path) -> Result<Option<Config>> {
        Self::load_optional(&project_config_path(cwd))
    }

    fn load_optional(path: &Path) -> Result<Option<Config>> {
        if !path.is_file() {
            return Ok(None);
        }
        Self::load_from_file(path).map(Some)
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| TutorError::storage(path, e))?;
        toml::from_str(&content)
            .map_err(|e| TutorError::config(format!("{}: {}", path.display(), e)))
    }

    /// Apply environment variable overrides.
    ///
    /// Values that fail to parse or are out of range are ignored with a
    /// warning.
    fn apply_env_overrides(&mut self) {
        if let Some(n) = env_override(
            "PYTHAGORE_STATE_DIMENSION",
            |v: &usize| EngineConfig::is_valid_state_dimension(*v),
            "a positive integer",
        ) {
            self.engine.state_dimension = n;
        }
        if let Some(n) = env_override(
            "PYTHAGORE_GAMMA",
            |v: &f64| EngineConfig::is_valid_probability(*v),
            "a number in [0, 1]",
        ) {
            self.engine.gamma = n;
        }
        if let Some(n) = env_override(
            "PYTHAGORE_LEARNING_RATE",
            |v: &f64| EngineConfig::is_valid_learning_rate(*v),
            "a positive number",
        ) {
            self.engine.learning_rate = n;
        }
        if let Some(n) = env_override(
            "PYTHAGORE_TARGET_SYNC_INTERVAL",
            |_: &u64| true,
            "a non-negative integer",
        ) {
            self.engine.target_sync_interval = n;
        }
        if let Some(n) = env_override(
            "PYTHAGORE_EPSILON",
            |v: &f64| EngineConfig::is_valid_probability(*v),
            "a number in [0, 1]",
        ) {
            self.engine.epsilon = n;
        }
        if let Some(n) = env_override("PYTHAGORE_SEED", |_: &u64| true, "a non-negative integer") {
            self.engine.seed = Some(n);
        }
        if let Some(path) = env_path("PYTHAGORE_CHECKPOINT") {
            self.engine.checkpoint = Some(path);
        }

        if let Some(backend) = env_override(
            "PYTHAGORE_GRAPH_BACKEND",
            |_: &GraphBackend| true,
            "one of memory, file, neo4j",
        ) {
            self.graph.backend = backend;
        }
        if let Some(path) = env_path("PYTHAGORE_GRAPH_PATH") {
            self.graph.path = Some(path);
        }
        if let Some(uri) = env_override(
            "PYTHAGORE_NEO4J_URI",
            |v: &String| !v.is_empty(),
            "a non-empty URI",
        ) {
            self.graph.uri = uri;
        }
        if let Some(user) = env_override(
            "PYTHAGORE_NEO4J_USER",
            |v: &String| !v.is_empty(),
            "a non-empty user name",
        ) {
            self.graph.user = user;
        }
        if let Some(database) = env_override(
            "PYTHAGORE_NEO4J_DATABASE",
            |v: &String| !v.is_empty(),
            "a non-empty database name",
        ) {
            self.graph.database = database;
        }
        if let Some(n) = env_override(
            "PYTHAGORE_NEO4J_TIMEOUT_MS",
            |v: &u64| GraphConfig::is_valid_timeout_ms(*v),
            "a positive integer",
        ) {
            self.graph.timeout_ms = n;
        }
        if let Some(mode) = env_override(
            "PYTHAGORE_GRAPH_ON_UNAVAILABLE",
            |_: &OnUnavailable| true,
            "one of fail, empty-prerequisites",
        ) {
            self.graph.on_unavailable = mode;
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence, field by field: every value in
    /// `other` that differs from the default replaces the value in `self`.
    /// A layer therefore cannot reset a lower layer's value back to the
    /// default.
    fn merge(mut self, other: Config) -> Self {
        let default_engine = EngineConfig::default();
        if other.engine.state_dimension != default_engine.state_dimension {
            self.engine.state_dimension = other.engine.state_dimension;
        }
        if other.engine.gamma != default_engine.gamma {
            self.engine.gamma = other.engine.gamma;
        }
        if other.engine.learning_rate != default_engine.learning_rate {
            self.engine.learning_rate = other.engine.learning_rate;
        }
        if other.engine.target_sync_interval != default_engine.target_sync_interval {
            self.engine.target_sync_interval = other.engine.target_sync_interval;
        }
        if other.engine.epsilon != default_engine.epsilon {
            self.engine.epsilon = other.engine.epsilon;
        }
        if other.engine.checkpoint.is_some() {
            self.engine.checkpoint = other.engine.checkpoint;
        }
        if other.engine.seed.is_some() {
            self.engine.seed = other.engine.seed;
        }

        let default_graph = GraphConfig::default();
        if other.graph.backend != default_graph.backend {
            self.graph.backend = other.graph.backend;
        }
        if other.graph.path.is_some() {
            self.graph.path = other.graph.path;
        }
        if other.graph.uri != default_graph.uri {
            self.graph.uri = other.graph.uri;
        }
        if other.graph.user != default_graph.user {
            self.graph.user = other.graph.user;
        }
        if other.graph.database != default_graph.database {
            self.graph.database = other.graph.database;
        }
        if other.graph.timeout_ms != default_graph.timeout_ms {
            self.graph.timeout_ms = other.graph.timeout_ms;
        }
        if other.graph.on_unavailable != default_graph.on_unavailable {
            self.graph.on_unavailable = other.graph.on_unavailable;
        }

        let default_tutor = TutorProfile::default();
        if other.tutor.depth != default_tutor.depth {
            self.tutor.depth = other.tutor.depth;
        }
        if other.tutor.learning_style != default_tutor.learning_style {
            self.tutor.learning_style = other.tutor.learning_style;
        }
        if other.tutor.communication_style != default_tutor.communication_style {
            self.tutor.communication_style = other.tutor.communication_style;
        }
        if other.tutor.tone_style != default_tutor.tone_style {
            self.tutor.tone_style = other.tutor.tone_style;
        }
        if other.tutor.reasoning_framework != default_tutor.reasoning_framework {
            self.tutor.reasoning_framework = other.tutor.reasoning_framework;
        }
        if other.tutor.use_emojis != default_tutor.use_emojis {
            self.tutor.use_emojis = other.tutor.use_emojis;
        }
        if other.tutor.language != default_tutor.language {
            self.tutor.language = other.tutor.language;
        }

        self
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if !EngineConfig::is_valid_state_dimension(engine.state_dimension) {
            return Err(TutorError::config("engine.state_dimension must be at least 1"));
        }
        if !EngineConfig::is_valid_probability(engine.gamma) {
            return Err(TutorError::config(format!(
                "engine.gamma must be in [0, 1], got {}",
                engine.gamma
            )));
        }
        if !EngineConfig::is_valid_learning_rate(engine.learning_rate) {
            return Err(TutorError::config(format!(
                "engine.learning_rate must be positive, got {}",
                engine.learning_rate
            )));
        }
        if !EngineConfig::is_valid_probability(engine.epsilon) {
            return Err(TutorError::config(format!(
                "engine.epsilon must be in [0, 1], got {}",
                engine.epsilon
            )));
        }

        if !GraphConfig::is_valid_timeout_ms(self.graph.timeout_ms) {
            return Err(TutorError::config("graph.timeout_ms must be positive"));
        }

        Ok(())
    }

    /// Checkpoint path: the configured one, else the default location.
    pub fn checkpoint_path(&self) -> Option<PathBuf> {
        self.engine.checkpoint.clone().or_else(model_path)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TutorError::config(e.to_string()))
    }
}

/// Read and parse an environment variable, warning when it is unusable.
fn env_override<T, F>(name: &str, is_valid: F, expected: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&T) -> bool,
{
    let raw = env::var(name).ok()?;
    match raw.parse::<T>() {
        Ok(value) if is_valid(&value) => Some(value),
        _ => {
            warn!(
                variable = name,
                value = %raw,
                "ignoring invalid environment override, expected {}",
                expected
            );
            None
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    match env::var(name) {
        Ok(raw) if !raw.is_empty() => Some(PathBuf::from(raw)),
        Ok(_) => {
            warn!(variable = name, "ignoring empty environment override");
            None
        }
        Err(_) => None,
    }
}

/// Get the Pythagore home directory.
///
/// Checks `PYTHAGORE_HOME` first, then falls back to `~/.pythagore`.
/// An empty `PYTHAGORE_HOME` is ignored. Relative values are canonicalized
/// when they exist and used as-is otherwise.
pub fn pythagore_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("PYTHAGORE_HOME") {
        if home.is_empty() {
            warn!("PYTHAGORE_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            warn!("PYTHAGORE_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    dirs::home_dir().map(|home| home.join(".pythagore"))
}

/// Default graph file: `<pythagore_home>/graph.json`.
pub fn graph_path() -> Option<PathBuf> {
    pythagore_home().map(|h| h.join("graph.json"))
}

/// Default checkpoint file: `<pythagore_home>/model.json`.
pub fn model_path() -> Option<PathBuf> {
    pythagore_home().map(|h| h.join("model.json"))
}

/// Project config file for a working directory.
///
/// Uses the nearest ancestor containing a `.pythagore/` directory, else
/// `<cwd>/.pythagore/config.toml`.
pub fn project_config_path(cwd: &Path) -> PathBuf {
    let root = cwd
        .ancestors()
        .find(|a| a.join(".pythagore").is_dir())
        .unwrap_or(cwd);
    root.join(".pythagore").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Point `PYTHAGORE_HOME` at an empty temp dir so the user's real
    /// config never leaks into a test.
    fn isolated_home() -> TempDir {
        let home = TempDir::new().unwrap();
        env::set_var("PYTHAGORE_HOME", home.path());
        home
    }

    const ENV_VARS: &[&str] = &[
        "PYTHAGORE_STATE_DIMENSION",
        "PYTHAGORE_GAMMA",
        "PYTHAGORE_LEARNING_RATE",
        "PYTHAGORE_TARGET_SYNC_INTERVAL",
        "PYTHAGORE_EPSILON",
        "PYTHAGORE_SEED",
        "PYTHAGORE_CHECKPOINT",
        "PYTHAGORE_GRAPH_BACKEND",
        "PYTHAGORE_GRAPH_PATH",
        "PYTHAGORE_NEO4J_URI",
        "PYTHAGORE_NEO4J_USER",
        "PYTHAGORE_NEO4J_DATABASE",
        "PYTHAGORE_NEO4J_TIMEOUT_MS",
        "PYTHAGORE_GRAPH_ON_UNAVAILABLE",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
        env::remove_var("PYTHAGORE_HOME");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.engine.state_dimension, 100);
        assert!((config.engine.gamma - 0.99).abs() < f64::EPSILON);
        assert!((config.engine.learning_rate - 0.001).abs() < f64::EPSILON);
        assert_eq!(config.engine.target_sync_interval, 100);
        assert!((config.engine.epsilon - 0.1).abs() < f64::EPSILON);
        assert!(config.engine.checkpoint.is_none());

        assert_eq!(config.graph.backend, GraphBackend::File);
        assert_eq!(config.graph.database, "neo4j");
        assert_eq!(config.graph.timeout_ms, 5000);
        assert_eq!(config.graph.on_unavailable, OnUnavailable::Fail);
        assert!(!config.graph.degrades_reads());

        assert_eq!(config.tutor.depth, Depth::Highschool);
        assert_eq!(config.tutor.communication_style, CommunicationStyle::Socratic);
        assert!(config.tutor.use_emojis);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[engine]
state_dimension = 64
epsilon = 0.25

[graph]
backend = "memory"
on_unavailable = "empty-prerequisites"

[tutor]
depth = "graduate"
tone_style = "humorous"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.engine.state_dimension, 64);
        assert!((config.engine.epsilon - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.graph.backend, GraphBackend::Memory);
        assert!(config.graph.degrades_reads());
        assert_eq!(config.tutor.depth, Depth::Graduate);
        assert_eq!(config.tutor.tone_style, ToneStyle::Humorous);

        // Other fields should be defaults
        assert_eq!(config.engine.target_sync_interval, 100);
        assert_eq!(config.tutor.language, Language::English);
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = Config::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(TutorError::Storage { .. })));
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        assert!(matches!(
            Config::load_from_file(&config_path),
            Err(TutorError::Config { .. })
        ));
    }

    #[test]
    fn test_unknown_graph_values_rejected_at_parse() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "[graph]\nbackend = \"sqlite\"\n").unwrap();
        assert!(matches!(
            Config::load_from_file(&config_path),
            Err(TutorError::Config { .. })
        ));

        fs::write(&config_path, "[graph]\non_unavailable = \"ignore\"\n").unwrap();
        assert!(matches!(
            Config::load_from_file(&config_path),
            Err(TutorError::Config { .. })
        ));
    }

    #[test]
    fn test_graph_enums_from_str() {
        assert_eq!("Neo4j".parse::<GraphBackend>().unwrap(), GraphBackend::Neo4j);
        assert_eq!("memory".parse::<GraphBackend>().unwrap(), GraphBackend::Memory);
        assert!("postgres".parse::<GraphBackend>().is_err());
        assert_eq!(
            "empty-prerequisites".parse::<OnUnavailable>().unwrap(),
            OnUnavailable::EmptyPrerequisites
        );
        assert!("retry".parse::<OnUnavailable>().is_err());
        for backend in GraphBackend::all() {
            assert_eq!(backend.as_str().parse::<GraphBackend>().unwrap(), *backend);
        }
    }

    #[test]
    fn test_unknown_tutor_value_rejected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[tutor]\ndepth = \"kindergarten\"\n").unwrap();

        assert!(Config::load_from_file(&config_path).is_err());
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        clear_env();
        let home = isolated_home();
        fs::write(
            home.path().join("config.toml"),
            "[engine]\nepsilon = 0.3\nstate_dimension = 50\n",
        )
        .unwrap();

        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".pythagore");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "[engine]\nepsilon = 0.05\n").unwrap();

        let config = Config::load_from_cwd(dir.path()).unwrap();

        // Project overrides user
        assert!((config.engine.epsilon - 0.05).abs() < f64::EPSILON);
        // User value survives where project is silent
        assert_eq!(config.engine.state_dimension, 50);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_project_config_found_from_subdirectory() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".pythagore");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "[graph]\nbackend = \"memory\"\n").unwrap();
        let nested = dir.path().join("lessons").join("geometry");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::load_from_cwd(&nested).unwrap();
        assert_eq!(config.graph.backend, GraphBackend::Memory);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_broken_project_config_is_an_error() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".pythagore");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "[engine\n").unwrap();

        assert!(Config::load_from_cwd(dir.path()).is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        clear_env();
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".pythagore");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "[engine]\nepsilon = 0.05\n").unwrap();

        env::set_var("PYTHAGORE_EPSILON", "0.5");

        let config = Config::load_from_cwd(dir.path()).unwrap();
        assert!((config.engine.epsilon - 0.5).abs() < f64::EPSILON);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_env();
        let _home = isolated_home();
        env::set_var("PYTHAGORE_STATE_DIMENSION", "32");
        env::set_var("PYTHAGORE_GAMMA", "0.9");
        env::set_var("PYTHAGORE_LEARNING_RATE", "0.01");
        env::set_var("PYTHAGORE_TARGET_SYNC_INTERVAL", "0");
        env::set_var("PYTHAGORE_SEED", "42");
        env::set_var("PYTHAGORE_CHECKPOINT", "/tmp/model.json");
        env::set_var("PYTHAGORE_GRAPH_BACKEND", "neo4j");
        env::set_var("PYTHAGORE_NEO4J_URI", "http://graph:7474");
        env::set_var("PYTHAGORE_NEO4J_USER", "tutor");
        env::set_var("PYTHAGORE_NEO4J_DATABASE", "concepts");
        env::set_var("PYTHAGORE_NEO4J_TIMEOUT_MS", "250");
        env::set_var("PYTHAGORE_GRAPH_ON_UNAVAILABLE", "empty-prerequisites");

        let dir = TempDir::new().unwrap();
        let config = Config::load_from_cwd(dir.path()).unwrap();

        assert_eq!(config.engine.state_dimension, 32);
        assert!((config.engine.gamma - 0.9).abs() < f64::EPSILON);
        assert!((config.engine.learning_rate - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.engine.target_sync_interval, 0);
        assert_eq!(config.engine.seed, Some(42));
        assert_eq!(
            config.engine.checkpoint,
            Some(PathBuf::from("/tmp/model.json"))
        );
        assert_eq!(config.graph.backend, GraphBackend::Neo4j);
        assert_eq!(config.graph.uri, "http://graph:7474");
        assert_eq!(config.graph.user, "tutor");
        assert_eq!(config.graph.database, "concepts");
        assert_eq!(config.graph.timeout_ms, 250);
        assert!(config.graph.degrades_reads());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_ignored() {
        clear_env();
        let _home = isolated_home();
        env::set_var("PYTHAGORE_STATE_DIMENSION", "0");
        env::set_var("PYTHAGORE_GAMMA", "1.5");
        env::set_var("PYTHAGORE_EPSILON", "lots");
        env::set_var("PYTHAGORE_GRAPH_BACKEND", "postgres");
        env::set_var("PYTHAGORE_NEO4J_TIMEOUT_MS", "0");
        env::set_var("PYTHAGORE_GRAPH_ON_UNAVAILABLE", "retry");

        let dir = TempDir::new().unwrap();
        let config = Config::load_from_cwd(dir.path()).unwrap();

        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    fn test_merge_field_by_field() {
        let mut user = Config::default();
        user.engine.gamma = 0.5;
        user.graph.backend = GraphBackend::Memory;
        user.tutor.language = Language::French;

        let mut project = Config::default();
        project.engine.epsilon = 0.2;
        project.tutor.depth = Depth::College;

        let merged = Config::default().merge(user).merge(project);

        assert!((merged.engine.gamma - 0.5).abs() < f64::EPSILON);
        assert!((merged.engine.epsilon - 0.2).abs() < f64::EPSILON);
        assert_eq!(merged.graph.backend, GraphBackend::Memory);
        assert_eq!(merged.tutor.language, Language::French);
        assert_eq!(merged.tutor.depth, Depth::College);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = Config::default();
        config.engine.epsilon = 1.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.state_dimension = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graph.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_toml_roundtrip() {
        let mut config = Config::default();
        config.engine.checkpoint = Some(PathBuf::from("/data/model.json"));
        config.graph.on_unavailable = OnUnavailable::EmptyPrerequisites;
        config.graph.backend = GraphBackend::Neo4j;
        config.tutor.reasoning_framework = ReasoningFramework::Analogical;

        let toml = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_tutor_profile_from_frontend_json() {
        let json = r#"{
            "depth": "Highschool",
            "learning_style": "Active",
            "communication_style": "Socratic",
            "tone_style": "Encouraging",
            "reasoning_framework": "Causal",
            "use_emojis": true,
            "language": "English"
        }"#;
        let profile = TutorProfile::from_json(json).unwrap();
        assert_eq!(profile, TutorProfile::default());
    }

    #[test]
    fn test_tutor_profile_partial_json() {
        let profile = TutorProfile::from_json(r#"{"depth": "Graduate", "use_emojis": false}"#)
            .unwrap();
        assert_eq!(profile.depth, Depth::Graduate);
        assert!(!profile.use_emojis);
        assert_eq!(profile.tone_style, ToneStyle::Encouraging);
    }

    #[test]
    fn test_tutor_profile_rejects_unknowns() {
        assert!(TutorProfile::from_json(r#"{"depth": "Kindergarten"}"#).is_err());
        assert!(TutorProfile::from_json(r#"{"mood": "grumpy"}"#).is_err());
        assert!(TutorProfile::from_json(r#"["depth"]"#).is_err());
    }

    #[test]
    fn test_enum_lists_are_complete() {
        assert_eq!(Depth::all().len(), 4);
        assert_eq!(LearningStyle::all().len(), 8);
        assert_eq!(CommunicationStyle::all().len(), 5);
        assert_eq!(ToneStyle::all().len(), 5);
        assert_eq!(ReasoningFramework::all().len(), 5);
        assert_eq!(Language::all().len(), 6);
    }

    #[test]
    #[serial]
    fn test_neo4j_settings_need_password() {
        env::remove_var(NEO4J_PASSWORD_ENV);
        let graph = GraphConfig::default();
        assert!(matches!(
            graph.neo4j_settings(),
            Err(TutorError::Credentials { .. })
        ));

        env::set_var(NEO4J_PASSWORD_ENV, "secret");
        let settings = graph.neo4j_settings().unwrap();
        assert_eq!(settings.password, "secret");
        assert_eq!(settings.timeout, Duration::from_millis(5000));
        env::remove_var(NEO4J_PASSWORD_ENV);
    }

    #[test]
    #[serial]
    fn test_pythagore_home_with_env() {
        env::set_var("PYTHAGORE_HOME", "/custom/pythagore");
        assert_eq!(pythagore_home(), Some(PathBuf::from("/custom/pythagore")));
        assert_eq!(
            graph_path(),
            Some(PathBuf::from("/custom/pythagore/graph.json"))
        );
        assert_eq!(
            model_path(),
            Some(PathBuf::from("/custom/pythagore/model.json"))
        );
        env::remove_var("PYTHAGORE_HOME");
    }

    #[test]
    #[serial]
    fn test_pythagore_home_empty_env() {
        env::set_var("PYTHAGORE_HOME", "");
        let home = pythagore_home();
        if let Some(dir) = dirs::home_dir() {
            assert_eq!(home, Some(dir.join(".pythagore")));
        }
        env::remove_var("PYTHAGORE_HOME");
    }

    #[test]
    #[serial]
    fn test_checkpoint_path_prefers_config() {
        env::set_var("PYTHAGORE_HOME", "/custom/pythagore");
        let mut config = Config::default();
        assert_eq!(
            config.checkpoint_path(),
            Some(PathBuf::from("/custom/pythagore/model.json"))
        );
        config.engine.checkpoint = Some(PathBuf::from("/elsewhere/model.json"));
        assert_eq!(
            config.checkpoint_path(),
            Some(PathBuf::from("/elsewhere/model.json"))
        );
        env::remove_var("PYTHAGORE_HOME");
    }
}
