// Application state management

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::PredictionEngine;

pub type SharedState = Arc<Mutex<AppState>>;

/// Bumped when the persisted layout changes
const STATE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize state: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported state version {0}")]
    Version(u32),
}

#[derive(Serialize, Deserialize)]
struct PersistedState {
    version: u32,
    saved_at: String,
    engine: PredictionEngine,
}

pub struct AppState {
    pub engine: PredictionEngine,
    pub state_path: PathBuf,
}

impl AppState {
    /// Fresh engine from config, replaced by the persisted one when present
    pub fn new(config: &Config) -> Self {
        let mut state = Self {
            engine: PredictionEngine::new(config.owner.clone(), config.params),
            state_path: config.state_path.clone(),
        };

        if state.state_path.exists() {
            match load_engine(&state.state_path) {
                Ok(engine) => {
                    if engine.params() != &config.params {
                        warn!("persisted engine parameters differ from configuration, keeping persisted ones");
                    }
                    info!(
                        path = %state.state_path.display(),
                        markets = engine.market_count(),
                        "loaded persisted state"
                    );
                    state.engine = engine;
                }
                Err(e) => warn!(error = %e, "failed to load persisted state, starting fresh"),
            }
        } else {
            info!(path = %state.state_path.display(), "no persisted state found, starting fresh");
        }

        state
    }

    pub fn with_engine(engine: PredictionEngine, state_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            state_path: state_path.into(),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    pub fn save_to_disk(&self) -> Result<(), PersistError> {
        let persisted = PersistedState {
            version: STATE_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            engine: self.engine.clone(),
        };
        let json = serde_json::to_string_pretty(&persisted)?;

        if let Some(parent) = self.state_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PersistError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.state_path, json).map_err(|source| PersistError::Io {
            path: self.state_path.clone(),
            source,
        })?;

        info!(path = %self.state_path.display(), "💾 state saved to disk");
        Ok(())
    }
}

pub fn load_engine(path: &Path) -> Result<PredictionEngine, PersistError> {
    let json = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let persisted: PersistedState = serde_json::from_str(&json)?;
    if persisted.version != STATE_VERSION {
        return Err(PersistError::Version(persisted.version));
    }
    Ok(persisted.engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Call, EngineParams, DEFAULT_CREATION_FEE, UNIT};
    use crate::events::Asset;
    use crate::market_resolve::Outcome;

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut engine = PredictionEngine::new("OWNER", EngineParams::default());
        let t0 = 1_700_000_000;
        engine
            .fund_account(&Call::new("OWNER", t0), "ALICE", Asset::Currency, 10 * UNIT)
            .unwrap();
        let id = engine
            .create_market(&Call::new("ALICE", t0).with_value(DEFAULT_CREATION_FEE), "0xabc", 1000)
            .unwrap();
        engine
            .buy_shares(&Call::new("ALICE", t0).with_value(5 * UNIT), id, Outcome::Pump, 100)
            .unwrap();
        engine.authorize_bot(&Call::new("OWNER", t0), "BOT", true).unwrap();

        let state = AppState::with_engine(engine, &path);
        state.save_to_disk().unwrap();

        let restored = load_engine(&path).unwrap();
        assert_eq!(restored.market_count(), 1);
        assert_eq!(restored.position(id, "ALICE").unwrap()[Outcome::Pump.index()], 100);
        assert_eq!(restored.currency_balance("ALICE"), state.engine.currency_balance("ALICE"));
        assert!(restored.is_authorized_bot("BOT"));
        assert_eq!(restored.recent_events(100).len(), state.engine.recent_events(100).len());
    }

    #[test]
    fn test_missing_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            state_path: dir.path().join("absent.json"),
            ..Config::default()
        };
        let state = AppState::new(&config);
        assert_eq!(state.engine.market_count(), 0);
        assert_eq!(state.engine.owner(), "OWNER");
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_engine(&path), Err(PersistError::Json(_))));
    }
}
