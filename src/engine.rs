//! The reasoning engine facade.
//!
//! [`ReasoningEngine`] owns the online/target networks, the state encoder,
//! the trainer and a handle to the knowledge graph. It is built once and
//! shared by reference (typically behind an `Arc`); there is no global
//! instance.
//!
//! Action selection takes a read lock on the networks, so concurrent
//! selections run in parallel. Training takes the write lock, so updates
//! are applied one at a time.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{Config, EngineConfig, GraphBackend, GraphConfig};
use crate::core::{Action, LearnerState};
use crate::encoder::StateEncoder;
use crate::error::{Result, TutorError};
use crate::graph::{
    FallbackGraphStore, FileGraphStore, KnowledgeGraphStore, MemoryGraphStore, Neo4jGraphStore,
};
use crate::network::{QNetworks, CHECKPOINT_SCHEMA_VERSION};
use crate::policy::{validate_epsilon, PolicySelector};
use crate::trainer::{TrainReport, Trainer};

/// Adaptive tutoring decision engine.
pub struct ReasoningEngine {
    networks: RwLock<QNetworks>,
    encoder: StateEncoder,
    trainer: Trainer,
    store: Arc<dyn KnowledgeGraphStore>,
    epsilon: f64,
    rng: Mutex<StdRng>,
}

impl ReasoningEngine {
    /// Create an engine with freshly initialised networks.
    pub fn new(store: Arc<dyn KnowledgeGraphStore>, config: &EngineConfig) -> Result<Self> {
        StateEncoder::new(config.state_dimension)?;
        if !EngineConfig::is_valid_learning_rate(config.learning_rate) {
            return Err(TutorError::config(format!(
                "learning_rate must be positive, got {}",
                config.learning_rate
            )));
        }
        let mut rng = seeded_rng(config.seed);
        let networks = QNetworks::new(config.state_dimension, config.learning_rate as f32, &mut rng);
        Self::assemble(store, config, networks, rng)
    }

    /// Create an engine around existing networks.
    ///
    /// Fails with `DimensionMismatch` if the networks expect a different
    /// state dimension than `config`.
    pub fn with_networks(
        store: Arc<dyn KnowledgeGraphStore>,
        config: &EngineConfig,
        networks: QNetworks,
    ) -> Result<Self> {
        networks.validate()?;
        if networks.input_dim() != config.state_dimension {
            return Err(TutorError::dimension_mismatch(
                config.state_dimension,
                networks.input_dim(),
            ));
        }
        Self::assemble(store, config, networks, seeded_rng(config.seed))
    }

    /// Create an engine from a checkpoint file, or fresh networks if the
    /// file does not exist yet.
    pub fn with_checkpoint(
        store: Arc<dyn KnowledgeGraphStore>,
        config: &EngineConfig,
        path: &Path,
    ) -> Result<Self> {
        if path.exists() {
            let networks = load_checkpoint(path)?;
            info!(path = %path.display(), steps = networks.steps, "loaded checkpoint");
            Self::with_networks(store, config, networks)
        } else {
            debug!(path = %path.display(), "no checkpoint, starting fresh");
            Self::new(store, config)
        }
    }

    /// Build the store and engine described by `config`.
    ///
    /// Missing Neo4j credentials are fatal. Networks are restored from the
    /// configured checkpoint when it exists.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn KnowledgeGraphStore> = Arc::new(build_store(&config.graph)?);
        match config.checkpoint_path() {
            Some(path) => Self::with_checkpoint(store, &config.engine, &path),
            None => Self::new(store, &config.engine),
        }
    }

    fn assemble(
        store: Arc<dyn KnowledgeGraphStore>,
        config: &EngineConfig,
        networks: QNetworks,
        rng: StdRng,
    ) -> Result<Self> {
        validate_epsilon(config.epsilon)?;
        let encoder = StateEncoder::new(config.state_dimension)?;
        let trainer = Trainer::new(config.gamma, config.target_sync_interval)?;

        debug!(
            store = store.name(),
            dimension = encoder.dimension(),
            parameters = networks.online.num_parameters(),
            "reasoning engine ready"
        );

        Ok(Self {
            networks: RwLock::new(networks),
            encoder,
            trainer,
            store,
            epsilon: config.epsilon,
            rng: Mutex::new(rng),
        })
    }

    /// Choose the next action with the engine's own random source.
    pub fn select_action(&self, state: &LearnerState, epsilon: f64) -> Result<Action> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.select_action_with_rng(state, epsilon, &mut *rng)
    }

    /// Choose the next action using the configured exploration rate.
    pub fn select_default(&self, state: &LearnerState) -> Result<Action> {
        self.select_action(state, self.epsilon)
    }

    /// Choose the next action with a caller-supplied random source.
    pub fn select_action_with_rng<R: Rng + ?Sized>(
        &self,
        state: &LearnerState,
        epsilon: f64,
        rng: &mut R,
    ) -> Result<Action> {
        let networks = self.read_networks();
        PolicySelector::select(&networks, &self.encoder, &*self.store, state, epsilon, rng)
    }

    /// Estimated value per action type, in declaration order.
    pub fn q_values(&self, state: &LearnerState) -> Result<Vec<f32>> {
        state.validate()?;
        let networks = self.read_networks();
        Ok(networks.online.evaluate(&self.encoder.encode(state))?.to_vec())
    }

    /// Apply one temporal-difference update for an observed transition.
    pub fn train(
        &self,
        state: &LearnerState,
        action: &Action,
        reward: f64,
        next_state: &LearnerState,
    ) -> Result<TrainReport> {
        let mut networks = self.write_networks();
        self.trainer.train(
            &mut networks,
            &self.encoder,
            state,
            action.action_type,
            reward,
            next_state,
        )
    }

    /// Record the learner's mastery of the action's concept in the graph.
    ///
    /// Fails with `MissingMastery` if `state` has no entry for the concept;
    /// the graph is not touched in that case.
    pub fn update_knowledge_graph(
        &self,
        state: &LearnerState,
        action: &Action,
        reward: f64,
    ) -> Result<()> {
        let mastery = state
            .mastery(&action.concept)
            .ok_or_else(|| TutorError::missing_mastery(&action.concept))?;

        self.store
            .record_interaction(&action.concept, mastery, Utc::now())?;

        debug!(
            concept = %action.concept,
            mastery,
            reward,
            "recorded interaction"
        );
        Ok(())
    }

    /// Copy online parameters into the target network now.
    pub fn sync_target(&self) {
        self.write_networks().sync_target();
    }

    /// Number of training steps applied so far.
    pub fn training_steps(&self) -> u64 {
        self.read_networks().steps
    }

    /// Snapshot of the current networks.
    pub fn networks(&self) -> QNetworks {
        self.read_networks().clone()
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    /// The knowledge graph this engine reads and writes.
    pub fn store(&self) -> &Arc<dyn KnowledgeGraphStore> {
        &self.store
    }

    /// Write the networks to `path` atomically.
    pub fn save_checkpoint(&self, path: &Path) -> Result<()> {
        let json = {
            let networks = self.read_networks();
            serde_json::to_string(&*networks)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| TutorError::storage(parent, e))?;
            }
        }

        let temp_path = temp_path_for(path);
        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| TutorError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| TutorError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| TutorError::storage(&temp_path, e))?;
        }
        fs::rename(&temp_path, path).map_err(|e| TutorError::storage(path, e))?;

        info!(path = %path.display(), steps = self.training_steps(), "saved checkpoint");
        Ok(())
    }

    fn read_networks(&self) -> RwLockReadGuard<'_, QNetworks> {
        self.networks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_networks(&self) -> RwLockWriteGuard<'_, QNetworks> {
        self.networks.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read and validate a checkpoint file.
pub fn load_checkpoint(path: &Path) -> Result<QNetworks> {
    let content = fs::read_to_string(path).map_err(|e| TutorError::storage(path, e))?;
    let networks: QNetworks = serde_json::from_str(&content)?;
    if networks.schema_version > CHECKPOINT_SCHEMA_VERSION {
        return Err(TutorError::serde(format!(
            "checkpoint schema version {} is newer than supported {}",
            networks.schema_version, CHECKPOINT_SCHEMA_VERSION
        )));
    }
    networks.validate()?;
    Ok(networks)
}

/// Build the graph store selected by `graph.backend`.
///
/// The result is always wrapped in a [`FallbackGraphStore`], which only
/// degrades reads when `graph.on_unavailable` asks for it.
pub fn build_store(graph: &GraphConfig) -> Result<FallbackGraphStore> {
    let degrade = graph.degrades_reads();
    let primary: Box<dyn KnowledgeGraphStore> = match graph.backend {
        GraphBackend::Memory => Box::new(MemoryGraphStore::new()),
        GraphBackend::File => {
            let path = graph.file_path().ok_or_else(|| {
                TutorError::config("Could not determine graph path (no home directory)")
            })?;
            Box::new(FileGraphStore::open(path)?)
        }
        GraphBackend::Neo4j => {
            let settings = graph.neo4j_settings()?;
            match Neo4jGraphStore::connect(settings.clone()) {
                Ok(store) => Box::new(store),
                Err(err) if degrade && err.is_store_failure() => {
                    warn!(uri = %settings.uri, error = %err, "neo4j unreachable at startup");
                    Box::new(Neo4jGraphStore::new(settings)?)
                }
                Err(err) => return Err(err),
            }
        }
    };
    Ok(FallbackGraphStore::new(primary, degrade))
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model.json".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
