use tracing::{debug, info};

use crate::actor::{ActorState, AttackVariant, MoveIntent, TickSignals, TransitionCause};
use crate::app::{InputAction, InputSnapshot, Rect, SceneWorld, Vec2};
use crate::collision::{StaticColliderRegistry, StepOutcome};
use crate::level::LevelData;

/// Summary of one simulation tick, used for debug logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub state_before: Option<ActorState>,
    pub state_after: Option<ActorState>,
    pub cause: Option<TransitionCause>,
    pub animation_finished: bool,
    pub physics: Option<StepOutcome>,
    pub cells_touched: usize,
}

impl TickReport {
    pub fn state_changed(&self) -> bool {
        self.state_before != self.state_after
    }
}

/// Counts of what `install_level` put into the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInstallSummary {
    pub collider_cells: usize,
    pub scenery_objects: usize,
    pub scenery_rejected: usize,
}

pub fn signals_from_input(input: &InputSnapshot, animation_finished: bool) -> TickSignals {
    let attack = [
        (InputAction::Attack1, AttackVariant::One),
        (InputAction::Attack2, AttackVariant::Two),
        (InputAction::Attack3, AttackVariant::Three),
    ]
    .into_iter()
    .find(|(action, _)| input.just_pressed(*action))
    .map(|(_, variant)| variant);

    TickSignals {
        movement: MoveIntent::from_held(
            input.is_down(InputAction::MoveLeft),
            input.is_down(InputAction::MoveRight),
            input.is_down(InputAction::MoveUp),
            input.is_down(InputAction::MoveDown),
        ),
        attack,
        hurt: input.just_pressed(InputAction::HurtDebug),
        death: input.just_pressed(InputAction::DeathDebug),
        reset: input.just_pressed(InputAction::Reset),
        animation_finished,
    }
}

/// Moves the level's static content into `world`. The actor is spawned separately.
pub fn install_level(world: &mut SceneWorld, level: LevelData) -> LevelInstallSummary {
    let LevelData {
        name,
        tilemap,
        polygons,
        scenery,
        settings,
        ..
    } = level;

    let registry = StaticColliderRegistry::build(&polygons, settings.collision_resolution);
    let collider_cells = registry.len();
    world.set_tilemap(tilemap, settings.blocking_tile);
    world.install_colliders(registry);
    world.set_occlusion(settings.occlusion_table());

    let mut scenery_objects = 0;
    let mut scenery_rejected = 0;
    for object in scenery {
        if world.scenery_mut().insert(object) {
            scenery_objects += 1;
        } else {
            scenery_rejected += 1;
        }
    }
    world.refresh_draw_list();

    info!(
        level = %name,
        collider_cells,
        scenery_objects,
        scenery_rejected,
        blocked_tiles = world.blocking_mask().map_or(0, |mask| mask.blocked_count()),
        "level_installed"
    );
    LevelInstallSummary {
        collider_cells,
        scenery_objects,
        scenery_rejected,
    }
}

/// One fixed simulation tick: cooldown, animation, state machine, physics, occlusion.
pub fn step_scene(
    world: &mut SceneWorld,
    input: &InputSnapshot,
    fixed_dt_seconds: f32,
) -> TickReport {
    world.advance_tick_count();
    let mut report = TickReport {
        tick: world.tick_count(),
        ..TickReport::default()
    };

    let (physics, actor) = world.physics_parts();
    if let Some(actor) = actor {
        report.state_before = Some(actor.state());

        actor.decrement_cooldown();
        report.animation_finished = actor.advance_animation();

        let signals = signals_from_input(input, report.animation_finished);
        let transition = actor.apply_signals(&signals);
        report.cause = Some(transition.cause);

        // Collision response is switched off only by death, and a dead actor stays put.
        if actor.collision_enabled() {
            let mut body = actor.body();
            let mut velocity = actor.velocity();
            report.physics = Some(physics.step(&mut body, &mut velocity, fixed_dt_seconds));
            actor.apply_body(&body, velocity);
        }
        report.state_after = Some(actor.state());
        report.cells_touched = cells_touching(world);
    }

    world.refresh_draw_list();

    if report.state_changed() {
        debug!(
            tick = report.tick,
            from = ?report.state_before,
            to = ?report.state_after,
            cause = ?report.cause,
            "scene_tick_state_changed"
        );
    }
    report
}

fn cells_touching(world: &SceneWorld) -> usize {
    let (Some(colliders), Some(actor)) = (world.colliders(), world.actor()) else {
        return 0;
    };
    let rect = actor.body().rect();
    // Grow by a pixel so cells the body rests flush against count as touched.
    colliders
        .overlapping(&Rect::new(
            rect.x - 1.0,
            rect.y - 1.0,
            rect.width + 2.0,
            rect.height + 2.0,
        ))
        .len()
}

/// Camera target: the actor, or the map center before spawn.
pub fn camera_focus(world: &SceneWorld) -> Vec2 {
    if let Some(actor) = world.actor() {
        return actor.position();
    }
    world.tilemap().map_or(Vec2::ZERO, |tilemap| {
        let size = tilemap.pixel_size();
        Vec2::new(size.x * 0.5, size.y * 0.5)
    })
}
