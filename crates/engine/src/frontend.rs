use crate::world::Entity;

pub const TILE_WIDTH: u32 = 24;
pub const TILE_HEIGHT: u32 = 24;
pub const ORIGIN_X: i32 = 10;
pub const ORIGIN_Y: i32 = 124;

/// Pixel placement data for one room: the screen position of tile (0,0) and
/// the size of each tile. Forwarded to the render sink with every placement
/// notification so sprite frontends can place entities without knowing the
/// grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomGeometry {
    pub origin_x: i32,
    pub origin_y: i32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl Default for RoomGeometry {
    fn default() -> Self {
        Self {
            origin_x: ORIGIN_X,
            origin_y: ORIGIN_Y,
            tile_width: TILE_WIDTH,
            tile_height: TILE_HEIGHT,
        }
    }
}

impl RoomGeometry {
    /// Screen position of the bottom-left corner of tile (x, y).
    pub fn tile_origin_px(&self, x: i32, y: i32) -> (i32, i32) {
        (
            x.saturating_mul(self.tile_width as i32)
                .saturating_add(self.origin_x),
            y.saturating_mul(self.tile_height as i32)
                .saturating_add(self.origin_y),
        )
    }
}

/// Consumer of entity placement changes. `notify_position` fires whenever an
/// entity's tile coordinates or stacking index change; `attach`/`detach` fire
/// on focus changes. The entity passed in already carries its new
/// coordinates.
pub trait RenderSink {
    fn attach(&mut self, room: &str);
    fn detach(&mut self, room: &str);
    fn notify_position(&mut self, room: &str, entity: &Entity, geometry: RoomGeometry);
}

/// Consumer of narrative text, one line per call.
pub trait MessageSink {
    fn write(&mut self, text: &str);
}

/// Render sink that drops every notification, for headless worlds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderSink;

impl RenderSink for NullRenderSink {
    fn attach(&mut self, _room: &str) {}
    fn detach(&mut self, _room: &str) {}
    fn notify_position(&mut self, _room: &str, _entity: &Entity, _geometry: RoomGeometry) {}
}

/// Message sink that drops every line, for headless worlds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMessageSink;

impl MessageSink for NullMessageSink {
    fn write(&mut self, _text: &str) {}
}
