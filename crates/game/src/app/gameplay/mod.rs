use std::path::PathBuf;

use engine::{
    camera_focus, install_level, load_level, step_scene, Actor, ActorConfig, InputAction,
    InputSnapshot, Scene, SceneCommand, SceneWorld, TickReport, Vec2,
};
use tracing::{error, info, warn};

/// The single playable scene: one level, one actor.
pub(crate) struct GameplayScene {
    levels_dir: PathBuf,
    level_name: String,
    actor_config: ActorConfig,
    last_report: Option<TickReport>,
    load_failure: Option<String>,
}

impl GameplayScene {
    pub(crate) fn new(levels_dir: PathBuf, level_name: String, actor_config: ActorConfig) -> Self {
        Self {
            levels_dir,
            level_name,
            actor_config,
            last_report: None,
            load_failure: None,
        }
    }

    fn spawn_actor(&self, world: &mut SceneWorld, spawn: Vec2) {
        let actor = match Actor::new(self.actor_config.clone(), spawn) {
            Ok(actor) => actor,
            Err(err) => {
                warn!(error = %err, "actor_config_rejected_using_builtin");
                match Actor::new(ActorConfig::default(), spawn) {
                    Ok(actor) => actor,
                    Err(err) => {
                        error!(error = %err, "actor_spawn_failed");
                        return;
                    }
                }
            }
        };
        world.spawn_actor(actor);
    }
}

impl Scene for GameplayScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.last_report = None;
        self.load_failure = None;

        let level = match load_level(&self.levels_dir, &self.level_name) {
            Ok(level) => level,
            Err(err) => {
                error!(
                    level = %self.level_name,
                    code = ?err.code,
                    error = %err,
                    "level_load_failed"
                );
                self.load_failure = Some(err.to_string());
                return;
            }
        };

        let spawn = level.spawn;
        let spawn_source = level.spawn_source;
        install_level(world, level);
        self.spawn_actor(world, spawn);
        world.camera_mut().position = camera_focus(world);
        world.refresh_draw_list();

        info!(
            level = %self.level_name,
            spawn_x = spawn.x,
            spawn_y = spawn.y,
            spawn_source = ?spawn_source,
            "scene_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        if input.just_pressed(InputAction::ToggleColliderDebug) {
            world.toggle_collider_debug();
            info!(visible = world.collider_debug_visible(), "collider_debug_toggled");
        }

        let report = step_scene(world, input, fixed_dt_seconds);
        world.camera_mut().position = camera_focus(world);
        self.last_report = Some(report);
        SceneCommand::None
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        info!(
            level = %self.level_name,
            ticks = self.last_report.map_or(0, |report| report.tick),
            "scene_unloaded"
        );
        self.last_report = None;
        self.load_failure = None;
    }

    fn debug_title(&self, world: &SceneWorld) -> Option<String> {
        if let Some(failure) = &self.load_failure {
            return Some(format!("topdown - {} | load failed: {failure}", self.level_name));
        }
        let actor = world.actor()?;
        let cells = self.last_report.map_or(0, |report| report.cells_touched);
        Some(format!(
            "topdown - {} | {} | cooldown {} | cells {} | tick {}",
            self.level_name,
            actor.state(),
            actor.attack_cooldown(),
            cells,
            world.tick_count()
        ))
    }
}
