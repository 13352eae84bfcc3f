pub mod action;
pub mod frontend;
pub mod level;
pub mod plot;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support;

pub use action::{Action, DEFAULT_TALK_SEPARATOR};
pub use frontend::{
    MessageSink, NullMessageSink, NullRenderSink, RenderSink, RoomGeometry, ORIGIN_X, ORIGIN_Y,
    TILE_HEIGHT, TILE_WIDTH,
};
pub use level::{
    build_world, load_level_file, parse_level_json, ActionDoc, EntityDoc, GeometryDoc, LevelDoc,
    LevelError, PlayerDoc, PlotDoc, PortalDoc, RoomDoc, TriggerDoc, LEVEL_FORMAT_VERSION,
};
pub use plot::{Flag, PlotEngine, Trigger};
pub use world::{Entity, EntityArena, EntityId, Facing, Room, RoomError, World, WorldError};
