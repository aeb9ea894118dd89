use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::actor::{Actor, ActorState, Facing};
use crate::app::{Camera2D, Rect, SceneWorld, Tilemap, Vec2};
use crate::occlusion::SceneryCategory;

use super::transform::{visible_world_rect, world_rect_to_screen, ScreenRect, Viewport};

const CLEAR_COLOR: [u8; 4] = [18, 20, 26, 255];
const BLOCKING_TILE_COLOR: [u8; 4] = [58, 52, 64, 255];
const TILE_PALETTE: [[u8; 4]; 4] = [
    [70, 108, 54, 255],
    [82, 120, 60, 255],
    [110, 90, 62, 255],
    [96, 98, 104, 255],
];
const COLLIDER_OVERLAY_COLOR: [u8; 4] = [255, 80, 80, 255];
const FACING_MARKER_COLOR: [u8; 4] = [250, 250, 250, 255];
/// Actor placeholder height as a multiple of the hitbox width.
const ACTOR_VISUAL_ASPECT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DrawItem {
    Scenery { index: usize, alpha: f32 },
    Actor,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(&mut self, world: &SceneWorld) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        draw_frame(self.pixels.frame_mut(), self.viewport, world);
        self.pixels.render()
    }
}

/// Rasterizes one frame: tiles, collider overlay, then scenery and actor by depth.
pub(crate) fn draw_frame(frame: &mut [u8], viewport: Viewport, world: &SceneWorld) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&CLEAR_COLOR);
    }
    let camera = world.camera();

    if let Some(tilemap) = world.tilemap() {
        draw_tilemap(frame, viewport, camera, tilemap, world);
    }
    if world.collider_debug_visible() {
        if let Some(colliders) = world.colliders() {
            let visible = visible_world_rect(camera, viewport);
            for cell in colliders.overlapping(&visible) {
                let rect = world_rect_to_screen(&cell.rect(), camera, viewport);
                draw_rect_outline(frame, viewport, rect, COLLIDER_OVERLAY_COLOR);
            }
        }
    }

    for item in draw_order(world) {
        match item {
            DrawItem::Scenery { index, alpha } => {
                let object = &world.scenery().objects()[index];
                let rect = world_rect_to_screen(&object.footprint, camera, viewport);
                fill_rect_blended(frame, viewport, rect, category_color(object.category), alpha);
            }
            DrawItem::Actor => {
                if let Some(actor) = world.actor() {
                    draw_actor(frame, viewport, camera, actor);
                }
            }
        }
    }
}

/// Scenery in draw-list order with the actor slotted in by depth. On equal depth
/// the actor draws after scenery.
fn draw_order(world: &SceneWorld) -> Vec<DrawItem> {
    let scenery = world.scenery();
    let actor_depth = world
        .actor()
        .map(|actor| world.occlusion().actor_depth(actor.position().y));

    let mut items = Vec::with_capacity(world.draw_list().len() + 1);
    let mut actor_pending = actor_depth.is_some();
    for draw in world.draw_list() {
        if let Some(depth) = actor_depth {
            if actor_pending && depth < draw.depth {
                items.push(DrawItem::Actor);
                actor_pending = false;
            }
        }
        if let Some(index) = scenery.index_of(draw.object_id) {
            items.push(DrawItem::Scenery {
                index,
                alpha: draw.alpha,
            });
        }
    }
    if actor_pending {
        items.push(DrawItem::Actor);
    }
    items
}

fn draw_tilemap(
    frame: &mut [u8],
    viewport: Viewport,
    camera: &Camera2D,
    tilemap: &Tilemap,
    world: &SceneWorld,
) {
    let visible = visible_world_rect(camera, viewport);
    let tile_w = tilemap.tile_width() as f32;
    let tile_h = tilemap.tile_height() as f32;
    let x_min = (visible.left() / tile_w).floor().max(0.0) as u32;
    let y_min = (visible.top() / tile_h).floor().max(0.0) as u32;
    let x_max = ((visible.right() / tile_w).ceil().max(0.0) as u32).min(tilemap.width());
    let y_max = ((visible.bottom() / tile_h).ceil().max(0.0) as u32).min(tilemap.height());

    for y in y_min..y_max {
        for x in x_min..x_max {
            let Some(gid) = tilemap.tile_at(x, y) else {
                continue;
            };
            if gid == 0 {
                continue;
            }
            let blocked = world
                .blocking_mask()
                .is_some_and(|mask| mask.is_blocked(x as i64, y as i64));
            let color = if blocked {
                BLOCKING_TILE_COLOR
            } else {
                TILE_PALETTE[gid as usize % TILE_PALETTE.len()]
            };
            let rect = world_rect_to_screen(&tilemap.tile_rect(x, y), camera, viewport);
            fill_rect_blended(frame, viewport, rect, color, 1.0);
        }
    }
}

fn draw_actor(frame: &mut [u8], viewport: Viewport, camera: &Camera2D, actor: &Actor) {
    let hitbox = actor.hitbox();
    let position = actor.position();
    let visual_height = hitbox.width * ACTOR_VISUAL_ASPECT;
    let body = Rect::from_min_max(
        Vec2::new(position.x - hitbox.width * 0.5, position.y - visual_height),
        Vec2::new(position.x + hitbox.width * 0.5, position.y + hitbox.height * 0.5),
    );
    let rect = world_rect_to_screen(&body, camera, viewport);
    fill_rect_blended(frame, viewport, rect, state_color(actor.state()), 1.0);

    let marker_x = match actor.facing() {
        Facing::Left => rect.left,
        Facing::Right => rect.right - 2,
    };
    let marker = ScreenRect {
        left: marker_x,
        top: rect.top + 2,
        right: marker_x + 2,
        bottom: rect.top + 4,
    };
    fill_rect_blended(frame, viewport, marker, FACING_MARKER_COLOR, 1.0);
}

fn state_color(state: ActorState) -> [u8; 4] {
    match state {
        ActorState::Idle => [90, 160, 230, 255],
        ActorState::Walking => [70, 200, 240, 255],
        ActorState::Attacking(_) => [240, 200, 60, 255],
        ActorState::Hurt => [240, 120, 60, 255],
        ActorState::Dead => [110, 110, 110, 255],
    }
}

fn category_color(category: SceneryCategory) -> [u8; 4] {
    match category {
        SceneryCategory::Decoration => [150, 140, 120, 255],
        SceneryCategory::Bush => [60, 140, 70, 255],
        SceneryCategory::Tree => [34, 110, 48, 255],
        SceneryCategory::Tower => [140, 130, 150, 255],
        SceneryCategory::Canopy => [40, 90, 40, 255],
    }
}

fn clip_to_viewport(rect: ScreenRect, viewport: Viewport) -> Option<ScreenRect> {
    if !rect.is_visible(viewport) {
        return None;
    }
    Some(ScreenRect {
        left: rect.left.max(0),
        top: rect.top.max(0),
        right: rect.right.min(viewport.width as i32),
        bottom: rect.bottom.min(viewport.height as i32),
    })
}

fn fill_rect_blended(
    frame: &mut [u8],
    viewport: Viewport,
    rect: ScreenRect,
    color: [u8; 4],
    alpha: f32,
) {
    let Some(rect) = clip_to_viewport(rect, viewport) else {
        return;
    };
    let alpha = alpha.clamp(0.0, 1.0);
    let stride = viewport.width as usize * 4;
    for y in rect.top..rect.bottom {
        let row = y as usize * stride;
        for x in rect.left..rect.right {
            let offset = row + x as usize * 4;
            let Some(pixel) = frame.get_mut(offset..offset + 4) else {
                return;
            };
            blend_pixel(pixel, color, alpha);
        }
    }
}

fn draw_rect_outline(frame: &mut [u8], viewport: Viewport, rect: ScreenRect, color: [u8; 4]) {
    let edges = [
        ScreenRect {
            bottom: rect.top + 1,
            ..rect
        },
        ScreenRect {
            top: rect.bottom - 1,
            ..rect
        },
        ScreenRect {
            right: rect.left + 1,
            ..rect
        },
        ScreenRect {
            left: rect.right - 1,
            ..rect
        },
    ];
    for edge in edges {
        fill_rect_blended(frame, viewport, edge, color, 1.0);
    }
}

fn blend_pixel(pixel: &mut [u8], color: [u8; 4], alpha: f32) {
    for channel in 0..3 {
        let src = color[channel] as f32;
        let dst = pixel[channel] as f32;
        pixel[channel] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
    }
    pixel[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorConfig;
    use crate::collision::{ColliderCell, StaticColliderRegistry};
    use crate::occlusion::SceneryObject;

    const VIEWPORT: Viewport = Viewport {
        width: 64,
        height: 48,
    };

    fn pixel_at(frame: &[u8], x: usize, y: usize) -> [u8; 4] {
        let offset = (y * VIEWPORT.width as usize + x) * 4;
        [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
    }

    fn world_with_scenery(actor_y: Option<f32>) -> SceneWorld {
        let mut world = SceneWorld::default();
        world.scenery_mut().insert(SceneryObject::from_footprint(
            4,
            "oak",
            Rect::new(0.0, 0.0, 16.0, 32.0),
            SceneryCategory::Tree,
        ));
        world.scenery_mut().insert(SceneryObject::from_footprint(
            9,
            "stone",
            Rect::new(0.0, 100.0, 8.0, 8.0),
            SceneryCategory::Decoration,
        ));
        if let Some(y) = actor_y {
            let actor = Actor::new(ActorConfig::default(), Vec2::new(8.0, y)).expect("actor");
            world.spawn_actor(actor);
        }
        world.refresh_draw_list();
        world
    }

    #[test]
    fn blend_mixes_source_and_destination() {
        let mut pixel = [0, 100, 200, 255];
        blend_pixel(&mut pixel, [200, 100, 0, 255], 0.5);
        assert_eq!(pixel, [100, 100, 100, 255]);
        blend_pixel(&mut pixel, [10, 20, 30, 255], 1.0);
        assert_eq!(pixel, [10, 20, 30, 255]);
    }

    #[test]
    fn fill_clips_to_viewport() {
        let mut frame = vec![0u8; (VIEWPORT.width * VIEWPORT.height * 4) as usize];
        let rect = ScreenRect {
            left: -10,
            top: 40,
            right: 4,
            bottom: 100,
        };
        fill_rect_blended(&mut frame, VIEWPORT, rect, [255, 0, 0, 255], 1.0);
        assert_eq!(pixel_at(&frame, 0, 47), [255, 0, 0, 255]);
        assert_eq!(pixel_at(&frame, 4, 47), [0, 0, 0, 0]);
    }

    #[test]
    fn pre_spawn_order_has_no_actor() {
        let world = world_with_scenery(None);
        let order = draw_order(&world);
        assert_eq!(order.len(), 2);
        assert!(!order.contains(&DrawItem::Actor));
    }

    #[test]
    fn actor_below_split_draws_over_tree_and_under_far_band() {
        // Tree split line at 0.65 * 32 = 20.8; actor depth floor(40 / 16) + 0.5 = 2.5.
        let world = world_with_scenery(Some(40.0));
        let order = draw_order(&world);
        assert_eq!(
            order,
            vec![
                DrawItem::Scenery {
                    index: 0,
                    alpha: 1.0
                },
                DrawItem::Actor,
                DrawItem::Scenery {
                    index: 1,
                    alpha: 1.0
                },
            ]
        );
    }

    #[test]
    fn actor_above_split_draws_before_faded_tree() {
        let world = world_with_scenery(Some(10.0));
        let order = draw_order(&world);
        assert_eq!(order.first(), Some(&DrawItem::Actor));
        assert_eq!(
            order.last(),
            Some(&DrawItem::Scenery {
                index: 0,
                alpha: 0.5
            })
        );
    }

    #[test]
    fn draw_order_maps_each_entry_back_to_its_registry_slot() {
        let mut world = SceneWorld::default();
        for id in (1..=40u32).rev() {
            world.scenery_mut().insert(SceneryObject::from_footprint(
                id,
                "stone",
                Rect::new(0.0, id as f32 * 16.0, 8.0, 8.0),
                SceneryCategory::Decoration,
            ));
        }
        world.refresh_draw_list();

        let order = draw_order(&world);
        assert_eq!(order.len(), 40);
        for (item, draw) in order.iter().zip(world.draw_list()) {
            let DrawItem::Scenery { index, .. } = item else {
                panic!("unexpected actor entry");
            };
            assert_eq!(world.scenery().objects()[*index].id, draw.object_id);
        }
    }

    #[test]
    fn collider_overlay_only_when_enabled() {
        let mut world = SceneWorld::default();
        world.install_colliders(StaticColliderRegistry::from_cells(vec![ColliderCell::new(
            0.0, 0.0, 8.0,
        )]));
        world.camera_mut().position = Vec2::new(16.0, 12.0);
        world.camera_mut().zoom = 2.0;
        let mut frame = vec![0u8; (VIEWPORT.width * VIEWPORT.height * 4) as usize];

        draw_frame(&mut frame, VIEWPORT, &world);
        assert_eq!(pixel_at(&frame, 0, 0), CLEAR_COLOR);

        world.toggle_collider_debug();
        draw_frame(&mut frame, VIEWPORT, &world);
        assert_eq!(pixel_at(&frame, 0, 0), COLLIDER_OVERLAY_COLOR);
        assert_eq!(pixel_at(&frame, 5, 5), CLEAR_COLOR);
    }
}
