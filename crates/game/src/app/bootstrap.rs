use engine::{resolve_app_paths, AppError, LoopConfig, Scene};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{actor_config_path, load_actor_config_or_default};
use super::gameplay::GameplayScene;

const LEVEL_ENV_VAR: &str = "TOPDOWN_LEVEL";
const DEFAULT_LEVEL: &str = "courtyard";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Topdown Startup ===");

    let paths = resolve_app_paths()?;
    let level_name = level_name_from_env();
    info!(
        root = %paths.root.display(),
        level = %level_name,
        "app_paths_resolved"
    );

    let actor_config = load_actor_config_or_default(&actor_config_path(&paths.config_dir));
    let scene = GameplayScene::new(paths.levels_dir, level_name.clone(), actor_config);
    let config = LoopConfig {
        window_title: format!("topdown - {level_name}"),
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        scene: Box::new(scene),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn level_name_from_env() -> String {
    parse_level_name(std::env::var(LEVEL_ENV_VAR).ok().as_deref())
}

fn parse_level_name(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_LEVEL)
        .to_string()
}
