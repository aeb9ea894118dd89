use crate::app::{Camera2D, Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Screen-space rectangle, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    pub fn is_visible(&self, viewport: Viewport) -> bool {
        self.right > 0
            && self.bottom > 0
            && self.left < viewport.width as i32
            && self.top < viewport.height as i32
            && self.left < self.right
            && self.top < self.bottom
    }
}

/// Both spaces grow downward, so the camera only translates and scales.
pub fn world_to_screen(world: Vec2, camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let zoom = camera.effective_zoom();
    Vec2::new(
        (world.x - camera.position.x) * zoom + viewport.width as f32 * 0.5,
        (world.y - camera.position.y) * zoom + viewport.height as f32 * 0.5,
    )
}

pub fn world_to_screen_px(world: Vec2, camera: &Camera2D, viewport: Viewport) -> (i32, i32) {
    let screen = world_to_screen(world, camera, viewport);
    (screen.x.round() as i32, screen.y.round() as i32)
}

pub fn screen_to_world(screen: Vec2, camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let zoom = camera.effective_zoom();
    Vec2::new(
        (screen.x - viewport.width as f32 * 0.5) / zoom + camera.position.x,
        (screen.y - viewport.height as f32 * 0.5) / zoom + camera.position.y,
    )
}

pub fn world_rect_to_screen(rect: &Rect, camera: &Camera2D, viewport: Viewport) -> ScreenRect {
    let (left, top) = world_to_screen_px(Vec2::new(rect.left(), rect.top()), camera, viewport);
    let (right, bottom) =
        world_to_screen_px(Vec2::new(rect.right(), rect.bottom()), camera, viewport);
    ScreenRect {
        left,
        top,
        right,
        bottom,
    }
}

/// World-space rectangle covered by the viewport.
pub fn visible_world_rect(camera: &Camera2D, viewport: Viewport) -> Rect {
    let min = screen_to_world(Vec2::ZERO, camera, viewport);
    let max = screen_to_world(
        Vec2::new(viewport.width as f32, viewport.height as f32),
        camera,
        viewport,
    );
    Rect::from_min_max(min, max)
}
