use super::input::{ActionStates, InputAction};
use crate::actor::Actor;
use crate::collision::{PhysicsWorld, StaticColliderRegistry, TileBlockingMask};
use crate::occlusion::{sort_scenery, OcclusionTable, SceneryDraw, SceneryRegistry};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn just_pressed(&self, action: InputAction) -> bool {
        self.actions.just_pressed(action)
    }

    /// Sets the held state without raising a pressed edge.
    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        let was_pressed = self.actions.just_pressed(action);
        self.actions.set(action, is_down);
        self.actions.force_pressed(action, was_pressed);
        self
    }

    /// Marks the action as pressed this tick (held + edge).
    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.set(action, true);
        self.actions.force_pressed(action, true);
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

/// World coordinates are Tiled pixels: origin at the map's top-left, y grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle, `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self {
            x: min.x,
            y: min.y,
            width: max.x - min.x,
            height: max.y - min.y,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.width * 0.5,
            y: self.y + self.height * 0.5,
        }
    }

    /// Edges inclusive.
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Touching edges do not count as overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

pub const CAMERA_ZOOM_DEFAULT: f32 = 2.0;
pub const CAMERA_ZOOM_MIN: f32 = 1.0;
pub const CAMERA_ZOOM_MAX: f32 = 4.0;

#[derive(Debug, Clone, Copy)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            zoom: CAMERA_ZOOM_DEFAULT,
        }
    }
}

impl Camera2D {
    pub fn effective_zoom(&self) -> f32 {
        clamp_camera_zoom(self.zoom)
    }
}

fn clamp_camera_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}

/// Tile grid in Tiled convention: tile (0,0) covers `[0, tile_width) x [0, tile_height)`.
/// Tile values are gids with flip flags already stripped; 0 means empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    tiles: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("tile size must be non-zero, got {width}x{height}")]
    ZeroTileSize { width: u32, height: u32 },
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        tiles: Vec<u32>,
    ) -> Result<Self, TilemapError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(TilemapError::ZeroTileSize {
                width: tile_width,
                height: tile_height,
            });
        }
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn pixel_size(&self) -> Vec2 {
        Vec2 {
            x: self.width as f32 * self.tile_width as f32,
            y: self.height as f32 * self.tile_height as f32,
        }
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u32> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn tiles(&self) -> &[u32] {
        &self.tiles
    }

    pub fn tile_rect(&self, x: u32, y: u32) -> Rect {
        Rect {
            x: x as f32 * self.tile_width as f32,
            y: y as f32 * self.tile_height as f32,
            width: self.tile_width as f32,
            height: self.tile_height as f32,
        }
    }
}

/// Runtime state of the one loaded level. Owned and mutated only by the scene loop.
#[derive(Debug, Default)]
pub struct SceneWorld {
    camera: Camera2D,
    tilemap: Option<Tilemap>,
    blocking_mask: Option<TileBlockingMask>,
    colliders: Option<StaticColliderRegistry>,
    actor: Option<Actor>,
    scenery: SceneryRegistry,
    occlusion: OcclusionTable,
    draw_list: Vec<SceneryDraw>,
    collider_debug_visible: bool,
    tick_count: u64,
}

impl SceneWorld {
    pub fn clear(&mut self) {
        self.camera = Camera2D::default();
        self.tilemap = None;
        self.blocking_mask = None;
        self.colliders = None;
        self.actor = None;
        self.scenery = SceneryRegistry::default();
        self.occlusion = OcclusionTable::default();
        self.draw_list.clear();
        self.collider_debug_visible = false;
        self.tick_count = 0;
    }

    pub fn set_tilemap(&mut self, tilemap: Tilemap, blocking_tile: u32) {
        self.blocking_mask = Some(TileBlockingMask::from_tilemap(&tilemap, blocking_tile));
        self.tilemap = Some(tilemap);
    }

    pub fn tilemap(&self) -> Option<&Tilemap> {
        self.tilemap.as_ref()
    }

    pub fn blocking_mask(&self) -> Option<&TileBlockingMask> {
        self.blocking_mask.as_ref()
    }

    /// The registry is build-once: a second install is refused and the first one kept.
    pub fn install_colliders(&mut self, registry: StaticColliderRegistry) -> bool {
        if self.colliders.is_some() {
            warn!(
                rejected_cell_count = registry.len(),
                "collider_registry_already_installed"
            );
            return false;
        }
        self.colliders = Some(registry);
        true
    }

    pub fn colliders(&self) -> Option<&StaticColliderRegistry> {
        self.colliders.as_ref()
    }

    pub fn spawn_actor(&mut self, actor: Actor) -> bool {
        if self.actor.is_some() {
            warn!("actor_already_spawned");
            return false;
        }
        self.actor = Some(actor);
        true
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn actor_mut(&mut self) -> Option<&mut Actor> {
        self.actor.as_mut()
    }

    pub fn set_occlusion(&mut self, occlusion: OcclusionTable) {
        self.occlusion = occlusion;
    }

    pub fn occlusion(&self) -> &OcclusionTable {
        &self.occlusion
    }

    pub fn scenery(&self) -> &SceneryRegistry {
        &self.scenery
    }

    pub fn scenery_mut(&mut self) -> &mut SceneryRegistry {
        &mut self.scenery
    }

    pub fn draw_list(&self) -> &[SceneryDraw] {
        &self.draw_list
    }

    /// Re-runs the occlusion sorter against the current actor position.
    pub fn refresh_draw_list(&mut self) {
        let actor_position = self.actor.as_ref().map(Actor::position);
        sort_scenery(
            &self.occlusion,
            &self.scenery,
            actor_position,
            &mut self.draw_list,
        );
    }

    /// Static obstacles alongside the actor they constrain.
    pub(crate) fn physics_parts(&mut self) -> (PhysicsWorld<'_>, Option<&mut Actor>) {
        (
            PhysicsWorld::new(self.colliders.as_ref(), self.blocking_mask.as_ref()),
            self.actor.as_mut(),
        )
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn collider_debug_visible(&self) -> bool {
        self.collider_debug_visible
    }

    pub fn toggle_collider_debug(&mut self) {
        self.collider_debug_visible = !self.collider_debug_visible;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub(crate) fn advance_tick_count(&mut self) {
        self.tick_count = self.tick_count.saturating_add(1);
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn render(&mut self, _world: &SceneWorld) {}
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

pub(crate) struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRuntime {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            world: SceneWorld::default(),
            is_loaded: false,
        }
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if !self.is_loaded {
            return SceneCommand::None;
        }
        self.scene.update(fixed_dt_seconds, input, &mut self.world)
    }

    pub(crate) fn render(&mut self) {
        self.scene.render(&self.world);
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub(crate) fn shutdown(&mut self) {
        if !self.is_loaded {
            return;
        }
        self.scene.unload(&mut self.world);
        self.world.clear();
        self.is_loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{ColliderCell, StaticColliderRegistry};

    fn make_tilemap(width: u32, height: u32, fill: u32) -> Tilemap {
        Tilemap::new(
            width,
            height,
            16,
            16,
            vec![fill; width as usize * height as usize],
        )
        .expect("tilemap")
    }

    struct CountingScene {
        loads: usize,
        updates: usize,
        unloads: usize,
    }

    impl Scene for CountingScene {
        fn load(&mut self, world: &mut SceneWorld) {
            self.loads += 1;
            world.set_tilemap(make_tilemap(2, 2, 1), 0);
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            input: &InputSnapshot,
            _world: &mut SceneWorld,
        ) -> SceneCommand {
            self.updates += 1;
            if input.just_pressed(InputAction::Quit) {
                SceneCommand::Quit
            } else {
                SceneCommand::None
            }
        }

        fn unload(&mut self, _world: &mut SceneWorld) {
            self.unloads += 1;
        }
    }

    #[test]
    fn tilemap_new_rejects_invalid_tile_count() {
        let err = Tilemap::new(2, 2, 16, 16, vec![0, 1, 2]).expect_err("err");
        assert_eq!(
            err,
            TilemapError::TileCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn tilemap_rejects_zero_tile_size() {
        let err = Tilemap::new(1, 1, 0, 16, vec![0]).expect_err("err");
        assert_eq!(err, TilemapError::ZeroTileSize { width: 0, height: 16 });
    }

    #[test]
    fn tilemap_indexing_and_bounds() {
        let tilemap = Tilemap::new(2, 2, 16, 16, vec![10, 11, 12, 13]).expect("tilemap");
        assert_eq!(tilemap.index_of(1, 1), Some(3));
        assert_eq!(tilemap.tile_at(1, 0), Some(11));
        assert_eq!(tilemap.tile_at(2, 2), None);
        assert_eq!(tilemap.tile_rect(1, 1), Rect::new(16.0, 16.0, 16.0, 16.0));
        assert_eq!(tilemap.pixel_size(), Vec2::new(32.0, 32.0));
    }

    #[test]
    fn pixel_size_and_tile_rect_do_not_overflow_u32() {
        let tilemap = Tilemap::new(70_000, 1, 70_000, 16, vec![0; 70_000]).expect("tilemap");
        assert_eq!(tilemap.pixel_size(), Vec2::new(4.9e9, 16.0));
        let last = tilemap.tile_rect(69_999, 0);
        assert_eq!(last.x, 69_999.0 * 70_000.0);
        assert_eq!(last.width, 70_000.0);
    }

    #[test]
    fn rect_contains_is_edge_inclusive_and_overlap_is_strict() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains_point(Vec2::new(10.0, 0.0)));
        assert!(!rect.contains_point(Vec2::new(10.1, 5.0)));
        assert!(!rect.overlaps(&Rect::new(10.0, 0.0, 5.0, 5.0)));
        assert!(rect.overlaps(&Rect::new(9.5, 9.5, 5.0, 5.0)));
    }

    #[test]
    fn colliders_install_only_once() {
        let mut world = SceneWorld::default();
        let first = StaticColliderRegistry::from_cells(vec![ColliderCell::new(0.0, 0.0, 16.0)]);
        assert!(world.install_colliders(first));
        assert!(!world.install_colliders(StaticColliderRegistry::default()));
        assert_eq!(world.colliders().map(StaticColliderRegistry::len), Some(1));
    }

    #[test]
    fn clear_drops_all_level_state() {
        let mut world = SceneWorld::default();
        world.set_tilemap(make_tilemap(3, 2, 7), 7);
        world.install_colliders(StaticColliderRegistry::default());
        world.toggle_collider_debug();
        world.advance_tick_count();
        world.clear();
        assert!(world.tilemap().is_none());
        assert!(world.blocking_mask().is_none());
        assert!(world.colliders().is_none());
        assert!(!world.collider_debug_visible());
        assert_eq!(world.tick_count(), 0);
    }

    #[test]
    fn camera_zoom_is_clamped() {
        let camera = Camera2D {
            position: Vec2::ZERO,
            zoom: 40.0,
        };
        assert!((camera.effective_zoom() - CAMERA_ZOOM_MAX).abs() < 0.0001);
        let camera = Camera2D {
            position: Vec2::ZERO,
            zoom: f32::NAN,
        };
        assert!((camera.effective_zoom() - CAMERA_ZOOM_DEFAULT).abs() < 0.0001);
    }

    #[test]
    fn runtime_lifecycle_loads_once_and_clears_on_shutdown() {
        let mut runtime = SceneRuntime::new(Box::new(CountingScene {
            loads: 0,
            updates: 0,
            unloads: 0,
        }));
        assert_eq!(
            runtime.update(1.0 / 60.0, &InputSnapshot::empty()),
            SceneCommand::None
        );
        runtime.load();
        runtime.load();
        assert!(runtime.world().tilemap().is_some());

        let quit = InputSnapshot::empty().with_action_pressed(InputAction::Quit);
        assert_eq!(runtime.update(1.0 / 60.0, &quit), SceneCommand::Quit);

        runtime.shutdown();
        runtime.shutdown();
        assert!(runtime.world().tilemap().is_none());
    }

    #[test]
    fn snapshot_builders_distinguish_held_from_pressed() {
        let held = InputSnapshot::empty().with_action_down(InputAction::MoveLeft, true);
        assert!(held.is_down(InputAction::MoveLeft));
        assert!(!held.just_pressed(InputAction::MoveLeft));

        let pressed = InputSnapshot::empty().with_action_pressed(InputAction::Attack2);
        assert!(pressed.is_down(InputAction::Attack2));
        assert!(pressed.just_pressed(InputAction::Attack2));
    }
}
