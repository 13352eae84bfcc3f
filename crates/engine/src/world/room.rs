use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::frontend::{RenderSink, RoomGeometry};
use crate::world::entity::{EntityArena, EntityId, Facing};

/// One (x, y) position holds an ordered stack of entity slots. Stacks grow
/// on demand and never shrink.
type CellStack = Vec<Option<EntityId>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("duplicate unique entity tag '{tag}' in room '{room}'")]
    DuplicateUnique { room: String, tag: String },
    #[error("room '{room}' cell ({x}, {y}) has an empty stack; every cell needs at least one slot")]
    EmptyCellStack { room: String, x: i32, y: i32 },
    #[error("room '{room}' grid references entity id {id} that is not in the arena")]
    MissingEntity { room: String, id: u64 },
    #[error("placement target ({x}, {y}) is outside room '{room}'")]
    OutOfBounds { room: String, x: i32, y: i32 },
    #[error("portal coordinate ({x}, {y}) is outside room '{room}'")]
    PortalOutOfBounds { room: String, x: i32, y: i32 },
    #[error("room '{room}' already has a portal at ({x}, {y})")]
    PortalCoordTaken { room: String, x: i32, y: i32 },
    #[error("room '{room}' already has a portal to '{dest}'")]
    PortalDestTaken { room: String, dest: String },
    #[error("no unique entity tagged '{tag}' in room '{room}'")]
    UnknownUnique { room: String, tag: String },
}

/// A named jagged grid of entity stacks plus a portal index. Rows may have
/// different lengths, so non-rectangular maps come for free. The room owns
/// placement, removal, walkability, and step movement for the entities whose
/// handles live in its grid.
#[derive(Debug)]
pub struct Room {
    name: String,
    rows: Vec<Vec<CellStack>>,
    uniques: HashMap<String, EntityId>,
    portals_coord_to_room: HashMap<(i32, i32), String>,
    portals_room_to_coord: HashMap<String, (i32, i32)>,
    geometry: RoomGeometry,
}

impl Room {
    /// Builds a room from its initial grid, recording each entity's
    /// coordinates and indexing tagged entities. Duplicate tags and empty
    /// cell stacks are configuration errors.
    pub fn new(
        name: impl Into<String>,
        rows: Vec<Vec<CellStack>>,
        arena: &mut EntityArena,
    ) -> Result<Self, RoomError> {
        let name = name.into();
        let mut uniques = HashMap::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, stack) in row.iter().enumerate() {
                if stack.is_empty() {
                    return Err(RoomError::EmptyCellStack {
                        room: name,
                        x: x as i32,
                        y: y as i32,
                    });
                }
                for (z, slot) in stack.iter().enumerate() {
                    let Some(id) = slot else { continue };
                    let Some(entity) = arena.get_mut(*id) else {
                        return Err(RoomError::MissingEntity { room: name, id: id.0 });
                    };
                    entity.tile_x = x as i32;
                    entity.tile_y = y as i32;
                    entity.tile_z = z;
                    if let Some(tag) = entity.tag.clone() {
                        if uniques.insert(tag.clone(), *id).is_some() {
                            return Err(RoomError::DuplicateUnique { room: name, tag });
                        }
                    }
                }
            }
        }
        Ok(Self {
            name,
            rows,
            uniques,
            portals_coord_to_room: HashMap::new(),
            portals_room_to_coord: HashMap::new(),
            geometry: RoomGeometry::default(),
        })
    }

    pub fn with_geometry(mut self, geometry: RoomGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> RoomGeometry {
        self.geometry
    }

    /// The stack at (x, y), or None outside the jagged bounds.
    pub fn stack(&self, x: i32, y: i32) -> Option<&[Option<EntityId>]> {
        let row = self.rows.get(usize::try_from(y).ok()?)?;
        row.get(usize::try_from(x).ok()?).map(Vec::as_slice)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.stack(x, y).is_some()
    }

    /// True iff (x, y) is addressable and every occupied slot in its stack
    /// holds a walkable entity.
    pub fn is_walkable(&self, arena: &EntityArena, x: i32, y: i32) -> bool {
        let Some(stack) = self.stack(x, y) else {
            return false;
        };
        stack
            .iter()
            .flatten()
            .all(|id| arena.get(*id).is_some_and(|entity| entity.walkable))
    }

    /// Yields every entity handle with its coordinates, row-major,
    /// bottom-of-stack first.
    pub fn iter_entities(&self) -> impl Iterator<Item = (EntityId, i32, i32, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(y, row)| {
            row.iter().enumerate().flat_map(move |(x, stack)| {
                stack
                    .iter()
                    .enumerate()
                    .filter_map(move |(z, slot)| slot.map(|id| (id, x as i32, y as i32, z)))
            })
        })
    }

    pub fn unique(&self, tag: &str) -> Option<EntityId> {
        self.uniques.get(tag).copied()
    }

    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.iter_entities().any(|(entity, ..)| entity == id)
    }

    /// Places `id` at (x, y), using `z` as a stacking hint. Never overwrites
    /// an occupied slot: an occupied target shifts the placement one slot up,
    /// growing the stack or inserting an empty slot (which bumps every
    /// entity above it) as needed.
    pub fn add_entity(
        &mut self,
        arena: &mut EntityArena,
        renderer: &mut dyn RenderSink,
        id: EntityId,
        x: i32,
        y: i32,
        z: Option<usize>,
    ) -> Result<(), RoomError> {
        if !self.in_bounds(x, y) {
            return Err(RoomError::OutOfBounds {
                room: self.name.clone(),
                x,
                y,
            });
        }
        self.place_at(arena, renderer, id, x, y, z);
        Ok(())
    }

    /// Removes and returns the entity at (x, y, z). The stack keeps its
    /// depth; only the slot empties. Clears the entity's uniques entry.
    pub fn pop_entity(
        &mut self,
        arena: &EntityArena,
        x: i32,
        y: i32,
        z: usize,
    ) -> Option<EntityId> {
        let row = self.rows.get_mut(usize::try_from(y).ok()?)?;
        let stack = row.get_mut(usize::try_from(x).ok()?)?;
        let id = stack.get_mut(z)?.take()?;
        if let Some(tag) = arena.get(id).and_then(|entity| entity.tag.as_deref()) {
            if self.uniques.get(tag) == Some(&id) {
                self.uniques.remove(tag);
            }
        }
        Some(id)
    }

    /// Moves the entity by (dx, dy) if the destination is walkable, turning
    /// it toward the attempted direction either way. Returns whether the
    /// move happened; a failed move leaves the grid untouched.
    pub fn step_entity(
        &mut self,
        arena: &mut EntityArena,
        renderer: &mut dyn RenderSink,
        id: EntityId,
        dx: i32,
        dy: i32,
    ) -> bool {
        let Some(entity) = arena.get_mut(id) else {
            warn!(room = %self.name, entity = id.0, "step requested for unknown entity");
            return false;
        };
        entity.facing = Facing::from_step(dx, dy);
        let (x, y, z) = entity.coords();
        let next_x = x.saturating_add(dx);
        let next_y = y.saturating_add(dy);
        if !self.is_walkable(arena, next_x, next_y) {
            return false;
        }
        self.pop_entity(arena, x, y, z);
        self.place_at(arena, renderer, id, next_x, next_y, Some(z));
        true
    }

    /// `step_entity` addressed by unique tag. An unknown tag is a
    /// configuration fault, not a failed move.
    pub fn step_unique(
        &mut self,
        arena: &mut EntityArena,
        renderer: &mut dyn RenderSink,
        tag: &str,
        dx: i32,
        dy: i32,
    ) -> Result<bool, RoomError> {
        let id = self.unique(tag).ok_or_else(|| RoomError::UnknownUnique {
            room: self.name.clone(),
            tag: tag.to_string(),
        })?;
        Ok(self.step_entity(arena, renderer, id, dx, dy))
    }

    /// Registers a portal at (x, y) leading to `dest`, installing both the
    /// coordinate-to-room and room-to-coordinate directions. Re-registering
    /// either key is a configuration error.
    pub fn add_portal(&mut self, x: i32, y: i32, dest: impl Into<String>) -> Result<(), RoomError> {
        let dest = dest.into();
        if !self.in_bounds(x, y) {
            return Err(RoomError::PortalOutOfBounds {
                room: self.name.clone(),
                x,
                y,
            });
        }
        if self.portals_coord_to_room.contains_key(&(x, y)) {
            return Err(RoomError::PortalCoordTaken {
                room: self.name.clone(),
                x,
                y,
            });
        }
        if self.portals_room_to_coord.contains_key(&dest) {
            return Err(RoomError::PortalDestTaken {
                room: self.name.clone(),
                dest,
            });
        }
        self.portals_coord_to_room.insert((x, y), dest.clone());
        self.portals_room_to_coord.insert(dest, (x, y));
        Ok(())
    }

    pub fn portal_dest(&self, x: i32, y: i32) -> Option<&str> {
        self.portals_coord_to_room.get(&(x, y)).map(String::as_str)
    }

    pub fn portal_coord(&self, dest: &str) -> Option<(i32, i32)> {
        self.portals_room_to_coord.get(dest).copied()
    }

    pub fn portals(&self) -> impl Iterator<Item = ((i32, i32), &str)> {
        self.portals_coord_to_room
            .iter()
            .map(|(coord, dest)| (*coord, dest.as_str()))
    }

    /// Re-issues a placement notification for every entity in the room.
    pub fn refresh(&self, arena: &EntityArena, renderer: &mut dyn RenderSink) {
        for (id, ..) in self.iter_entities() {
            if let Some(entity) = arena.get(id) {
                renderer.notify_position(&self.name, entity, self.geometry);
            }
        }
    }

    /// Placement core. Callers have already checked (x, y) is addressable.
    fn place_at(
        &mut self,
        arena: &mut EntityArena,
        renderer: &mut dyn RenderSink,
        id: EntityId,
        x: i32,
        y: i32,
        z: Option<usize>,
    ) {
        let (Ok(col), Ok(line)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        let Some(stack) = self.rows.get_mut(line).and_then(|row| row.get_mut(col)) else {
            return;
        };
        if stack.is_empty() {
            stack.push(None);
        }
        let depth = stack.len();
        let top = depth - 1;
        let mut target = match z {
            Some(z) => z.min(top),
            None => top,
        };
        let mut shifted: Vec<(usize, EntityId)> = Vec::new();
        if stack[target].is_some() {
            target += 1;
            if target == depth {
                stack.push(None);
            } else {
                stack.insert(target, None);
                shifted = stack
                    .iter()
                    .enumerate()
                    .skip(target + 1)
                    .filter_map(|(index, slot)| slot.map(|entity| (index, entity)))
                    .collect();
            }
        }
        stack[target] = Some(id);

        for (index, shifted_id) in shifted {
            if let Some(entity) = arena.get_mut(shifted_id) {
                entity.tile_z = index;
            }
            if let Some(entity) = arena.get(shifted_id) {
                renderer.notify_position(&self.name, entity, self.geometry);
            }
        }

        if let Some(entity) = arena.get_mut(id) {
            entity.tile_x = x;
            entity.tile_y = y;
            entity.tile_z = target;
        }
        if let Some(entity) = arena.get(id) {
            if let Some(tag) = entity.tag.clone() {
                let previous = self.uniques.insert(tag.clone(), id);
                if previous.is_some_and(|prev| prev != id) {
                    warn!(room = %self.name, tag = %tag, "unique tag re-registered to another entity");
                }
            }
            renderer.notify_position(&self.name, entity, self.geometry);
        }
    }
}
