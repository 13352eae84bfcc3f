use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::action::Action;
use crate::frontend::{MessageSink, RenderSink, RoomGeometry};
use crate::level::schema::{ActionDoc, EntityDoc, LevelDoc, PlayerDoc, RoomDoc, TriggerDoc};
use crate::plot::{Flag, PlotEngine, Trigger};
use crate::world::{EntityArena, EntityId, Facing, Room, RoomError, World, WorldError};

pub const LEVEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse level json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("level format version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },
    #[error("level has no rooms")]
    NoRooms,
    #[error("{context}: facing components must be -1, 0, or 1, got ({dx}, {dy})")]
    BadFacing { context: String, dx: i32, dy: i32 },
    #[error("{context}: action sequence is empty")]
    EmptyActionSequence { context: String },
    #[error("{context}: cycle count must be at least 1")]
    ZeroCycleCount { context: String },
    #[error("room '{room}' portal leads to unknown room '{dest}'")]
    UnknownPortalDest { room: String, dest: String },
    #[error("room '{dest}' has no portal back to '{room}'; portals must be paired")]
    NonReciprocalPortal { room: String, dest: String },
    #[error("player starting room '{room}' does not exist")]
    PlayerRoomMissing { room: String },
    #[error("player start ({x}, {y}) is outside room '{room}'")]
    PlayerOutOfBounds { room: String, x: i32, y: i32 },
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error(transparent)]
    World(#[from] WorldError),
}

pub fn load_level_file(path: &Path) -> Result<LevelDoc, LevelError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_level_json(&raw)
}

/// Parses a level document, reporting the JSON path of the first offending
/// value on failure.
pub fn parse_level_json(raw: &str) -> Result<LevelDoc, LevelError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, LevelDoc>(&mut deserializer) {
        Ok(doc) => Ok(doc),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            let path = if path.is_empty() || path == "." {
                "document root".to_string()
            } else {
                path
            };
            Err(LevelError::Parse { path, source })
        }
    }
}

/// Assembles a `World` from a level document, surfacing every configuration
/// error before anything is considered loaded.
pub fn build_world(
    doc: LevelDoc,
    renderer: Box<dyn RenderSink>,
    messages: Box<dyn MessageSink>,
) -> Result<World, LevelError> {
    if doc.level_version != LEVEL_FORMAT_VERSION {
        return Err(LevelError::VersionMismatch {
            expected: LEVEL_FORMAT_VERSION,
            actual: doc.level_version,
        });
    }
    if doc.rooms.is_empty() {
        return Err(LevelError::NoRooms);
    }

    let mut renderer = renderer;
    let mut arena = EntityArena::new();
    let mut rooms = Vec::with_capacity(doc.rooms.len());
    let mut portal_refs: Vec<(String, String)> = Vec::new();
    for room_doc in doc.rooms {
        let room = build_room(room_doc, &mut arena, &mut portal_refs)?;
        rooms.push(room);
    }

    for (room_name, dest) in &portal_refs {
        let Some(dest_room) = rooms.iter().find(|room| room.name() == dest) else {
            return Err(LevelError::UnknownPortalDest {
                room: room_name.clone(),
                dest: dest.clone(),
            });
        };
        if dest_room.portal_coord(room_name).is_none() {
            return Err(LevelError::NonReciprocalPortal {
                room: room_name.clone(),
                dest: dest.clone(),
            });
        }
    }

    let PlayerDoc {
        name,
        room: start,
        x,
        y,
        facing,
    } = doc.player;
    let facing = validate_facing(facing, "player")?;
    let player = arena.spawn(name, false);
    if let Some(entity) = arena.get_mut(player) {
        if let Some(facing) = facing {
            entity.facing = facing;
        }
    }
    let Some(start_room) = rooms.iter_mut().find(|room| room.name() == start) else {
        return Err(LevelError::PlayerRoomMissing { room: start });
    };
    if !start_room.in_bounds(x, y) {
        return Err(LevelError::PlayerOutOfBounds { room: start, x, y });
    }
    start_room.add_entity(&mut arena, renderer.as_mut(), player, x, y, None)?;

    let flags = doc.plot.flags.into_iter().map(Flag::from);
    let triggers = doc
        .plot
        .triggers
        .into_iter()
        .enumerate()
        .map(|(index, trigger)| build_trigger(trigger, &format!("trigger {index}")))
        .collect::<Result<Vec<_>, _>>()?;
    let plot = PlotEngine::new(flags, triggers);

    let room_count = rooms.len();
    let entity_count = arena.len();
    let trigger_count = plot.pending_trigger_count();
    let world = World::new(rooms, arena, &start, player, plot, renderer, messages)?;
    info!(
        level = %doc.name,
        rooms = room_count,
        entities = entity_count,
        triggers = trigger_count,
        "level_built"
    );
    Ok(world)
}

fn build_room(
    doc: RoomDoc,
    arena: &mut EntityArena,
    portal_refs: &mut Vec<(String, String)>,
) -> Result<Room, LevelError> {
    let RoomDoc {
        name,
        geometry,
        rows: row_docs,
        portals,
    } = doc;

    let mut rows = Vec::with_capacity(row_docs.len());
    for (y, row_doc) in row_docs.into_iter().enumerate() {
        let mut row = Vec::with_capacity(row_doc.len());
        for (x, stack_doc) in row_doc.into_iter().enumerate() {
            let mut stack = Vec::with_capacity(stack_doc.len());
            for (z, slot) in stack_doc.into_iter().enumerate() {
                let id = match slot {
                    None => None,
                    Some(entity_doc) => {
                        let context = format!("room '{name}' entity at ({x}, {y}, {z})");
                        Some(spawn_entity(arena, entity_doc, &context)?)
                    }
                };
                stack.push(id);
            }
            row.push(stack);
        }
        rows.push(row);
    }

    let mut room = Room::new(name, rows, arena)?;
    if let Some(geometry) = geometry {
        room = room.with_geometry(RoomGeometry {
            origin_x: geometry.origin_x,
            origin_y: geometry.origin_y,
            tile_width: geometry.tile_width,
            tile_height: geometry.tile_height,
        });
    }
    for portal in portals {
        room.add_portal(portal.x, portal.y, portal.dest.clone())?;
        portal_refs.push((room.name().to_string(), portal.dest));
    }
    Ok(room)
}

fn spawn_entity(
    arena: &mut EntityArena,
    doc: EntityDoc,
    context: &str,
) -> Result<EntityId, LevelError> {
    let facing = validate_facing(doc.facing, context)?;
    let action = match doc.action {
        Some(action_doc) => Some(build_action(action_doc, context)?),
        None => None,
    };
    let id = arena.spawn(doc.name, doc.walkable);
    if let Some(entity) = arena.get_mut(id) {
        entity.tag = doc.tag;
        entity.action = action;
        if let Some(facing) = facing {
            entity.facing = facing;
        }
    }
    Ok(id)
}

fn validate_facing(
    facing: Option<(i32, i32)>,
    context: &str,
) -> Result<Option<Facing>, LevelError> {
    let Some((dx, dy)) = facing else {
        return Ok(None);
    };
    if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dy) {
        return Err(LevelError::BadFacing {
            context: context.to_string(),
            dx,
            dy,
        });
    }
    Ok(Some(Facing::new(dx, dy)))
}

fn build_action(doc: ActionDoc, context: &str) -> Result<Action, LevelError> {
    Ok(match doc {
        ActionDoc::Iter { actions } => Action::iter(build_action_list(actions, context)?),
        ActionDoc::Loop { actions } => Action::repeat(build_action_list(actions, context)?),
        ActionDoc::Cycle { times, actions } => {
            if times == 0 {
                return Err(LevelError::ZeroCycleCount {
                    context: context.to_string(),
                });
            }
            Action::cycle(times, build_action_list(actions, context)?)
        }
        ActionDoc::Sequence { actions } => Action::sequence(build_action_list(actions, context)?),
        ActionDoc::Reset { action } => Action::reset(build_action(*action, context)?),
        ActionDoc::UpdatePlot { flags } => Action::update_plot(flags.into_iter().map(Flag::from)),
        ActionDoc::Alert { text } => Action::alert(text),
        ActionDoc::Talk { text, sep } => match sep {
            Some(sep) => Action::talk_with_sep(text, sep),
            None => Action::talk(text),
        },
        ActionDoc::Move { dx, dy } => Action::step(dx, dy),
    })
}

fn build_action_list(docs: Vec<ActionDoc>, context: &str) -> Result<Vec<Action>, LevelError> {
    if docs.is_empty() {
        return Err(LevelError::EmptyActionSequence {
            context: context.to_string(),
        });
    }
    docs.into_iter()
        .map(|doc| build_action(doc, context))
        .collect()
}

fn build_trigger(doc: TriggerDoc, context: &str) -> Result<Trigger, LevelError> {
    let callback = build_action(doc.fire, context)?;
    let unlocks = doc
        .unlocks
        .into_iter()
        .enumerate()
        .map(|(index, trigger)| build_trigger(trigger, &format!("{context} unlock {index}")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Trigger::new(doc.requires.into_iter().map(Flag::from), callback).with_unlocks(unlocks))
}
