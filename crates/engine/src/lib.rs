use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod actor;
pub mod app;
pub mod collision;
pub mod level;
pub mod occlusion;
pub mod sim;
mod sprite_keys;

pub use actor::{
    Actor, ActorConfig, ActorConfigError, ActorState, AnimationKey, AnimationTable, AttackVariant,
    Facing, Hitbox, MoveIntent, TickSignals, TransitionCause,
};
pub use app::{
    run_app, AppError, Camera2D, InputAction, InputSnapshot, LoopConfig, LoopMetricsSnapshot,
    Rect, Renderer, Scene, SceneCommand, SceneWorld, Tilemap, TilemapError, Vec2, Viewport,
};
pub use collision::{
    build_collider_cells, ColliderCell, KinematicBody, PhysicsWorld, Polygon,
    StaticColliderRegistry, StepOutcome, TileBlockingMask,
};
pub use level::{load_level, LevelData, LevelErrorCode, LevelLoadError, SourceLocation};
pub use occlusion::{
    sort_scenery, OcclusionRule, OcclusionTable, SceneryCategory, SceneryDraw, SceneryObject,
    SceneryRegistry,
};
pub use sim::{camera_focus, install_level, step_scene, LevelInstallSummary, TickReport};
pub use sprite_keys::SpriteKeyError;

pub const ROOT_ENV_VAR: &str = "TOPDOWN_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub levels_dir: PathBuf,
    pub config_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "{env_var} is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf, env_var: &'static str },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/path/to/topdown\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    Ok(app_paths_for_root(resolve_root()?))
}

pub fn app_paths_for_root(root: PathBuf) -> AppPaths {
    let assets_dir = root.join("assets");
    AppPaths {
        levels_dir: assets_dir.join("levels"),
        config_dir: assets_dir.join("config"),
        assets_dir,
        root,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    path: normalized,
                    env_var: ROOT_ENV_VAR,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
