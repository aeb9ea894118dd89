use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::ActorConfig;
use thiserror::Error;
use tracing::{info, warn};

const ACTOR_CONFIG_FILE: &str = "actor.json";

#[derive(Debug, Error)]
pub(crate) enum ActorConfigLoadError {
    #[error("failed to read actor config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid actor config {path} at {json_path}: {message}")]
    Parse {
        path: PathBuf,
        json_path: String,
        message: String,
    },
}

pub(crate) fn actor_config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(ACTOR_CONFIG_FILE)
}

/// Reads the actor config. A missing file yields `Ok(None)`.
pub(crate) fn load_actor_config(path: &Path) -> Result<Option<ActorConfig>, ActorConfigLoadError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ActorConfigLoadError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_actor_config(path, &raw).map(Some)
}

pub(crate) fn load_actor_config_or_default(path: &Path) -> ActorConfig {
    match load_actor_config(path) {
        Ok(Some(config)) => {
            info!(
                path = %path.display(),
                move_speed = config.move_speed,
                attack_cooldown_ticks = config.attack_cooldown_ticks,
                "actor_config_loaded"
            );
            config
        }
        Ok(None) => {
            info!(path = %path.display(), "actor_config_missing_using_builtin");
            ActorConfig::default()
        }
        Err(err) => {
            warn!(error = %err, "actor_config_invalid_using_builtin");
            ActorConfig::default()
        }
    }
}

fn parse_actor_config(path: &Path, raw: &str) -> Result<ActorConfig, ActorConfigLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        ActorConfigLoadError::Parse {
            path: path.to_path_buf(),
            json_path: err.path().to_string(),
            message: err.inner().to_string(),
        }
    })
}
