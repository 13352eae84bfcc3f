mod build;
mod schema;

pub use build::{build_world, load_level_file, parse_level_json, LevelError, LEVEL_FORMAT_VERSION};
pub use schema::{
    ActionDoc, EntityDoc, GeometryDoc, LevelDoc, PlayerDoc, PlotDoc, PortalDoc, RoomDoc,
    TriggerDoc,
};
