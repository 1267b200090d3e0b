//! Shared setup for commands that talk to the drill engine.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use verbdrill_core::engine::DrillEngine;
use verbdrill_core::model::Identity;
use verbdrill_core::parser::parse_corpus;
use verbdrill_core::store::FileStore;
use verbdrill_oracle::config::{attach_backend, load_config_from, DrillConfig};

/// An engine backed by the configured file store, seeded from the corpus.
pub struct Session {
    pub engine: DrillEngine,
    pub config: DrillConfig,
}

impl Session {
    pub async fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        debug!(?config, "configuration loaded");

        let store = FileStore::open(&config.store_path)?;
        let engine = DrillEngine::new(Arc::new(store), config.engine_config());
        let engine = attach_backend(engine, config.oracle.as_ref())?;

        if config.corpus.exists() {
            let corpus = parse_corpus(&config.corpus)?;
            engine
                .seed(&corpus.verbs)
                .await
                .with_context(|| format!("failed to seed verbs from {}", config.corpus.display()))?;
        } else {
            warn!(
                "corpus {} not found, using verbs already in the store",
                config.corpus.display()
            );
        }

        Ok(Self { engine, config })
    }
}

/// The caller's identity, if one was given.
///
/// Blank ids count as absent so the engine reports them as unauthenticated.
pub fn identity(user: Option<&str>) -> Option<Identity> {
    user.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(Identity::new)
}
