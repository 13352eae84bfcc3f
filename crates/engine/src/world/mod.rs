mod entity;
mod room;

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::frontend::{MessageSink, RenderSink};
use crate::plot::{Flag, PlotEngine};

pub use entity::{Entity, EntityArena, EntityId, Facing};
pub use room::{Room, RoomError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("no room named '{name}' in the world")]
    UnknownRoom { name: String },
    #[error("two rooms share the name '{name}'")]
    DuplicateRoom { name: String },
    #[error("player entity is not placed in starting room '{room}'")]
    PlayerNotPlaced { room: String },
    #[error("room '{to}' has no return portal paired with '{from}'")]
    MissingReturnPortal { from: String, to: String },
    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Owns the room registry, the entity arena, the plot engine, and the two
/// frontend sinks. Exactly one room is focused (attached to the render sink
/// and receiving input-driven updates) at a time; membership of the registry
/// never changes after construction.
pub struct World {
    rooms: HashMap<String, Room>,
    arena: EntityArena,
    focus: String,
    player: EntityId,
    plot: PlotEngine,
    renderer: Box<dyn RenderSink>,
    messages: Box<dyn MessageSink>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("rooms", &self.rooms)
            .field("arena", &self.arena)
            .field("focus", &self.focus)
            .field("player", &self.player)
            .field("plot", &self.plot)
            .finish_non_exhaustive()
    }
}

impl World {
    pub fn new(
        rooms: Vec<Room>,
        arena: EntityArena,
        start: &str,
        player: EntityId,
        plot: PlotEngine,
        renderer: Box<dyn RenderSink>,
        messages: Box<dyn MessageSink>,
    ) -> Result<Self, WorldError> {
        let mut registry = HashMap::with_capacity(rooms.len());
        for room in rooms {
            let name = room.name().to_string();
            if registry.insert(name.clone(), room).is_some() {
                return Err(WorldError::DuplicateRoom { name });
            }
        }
        let start_room = registry
            .get(start)
            .ok_or_else(|| WorldError::UnknownRoom {
                name: start.to_string(),
            })?;
        if !start_room.contains_entity(player) {
            return Err(WorldError::PlayerNotPlaced {
                room: start.to_string(),
            });
        }

        let mut world = Self {
            rooms: registry,
            arena,
            focus: start.to_string(),
            player,
            plot,
            renderer,
            messages,
        };
        world.attach_focus();
        Ok(world)
    }

    pub fn player(&self) -> EntityId {
        self.player
    }

    pub fn focus_name(&self) -> &str {
        &self.focus
    }

    pub fn focus_room(&self) -> Option<&Room> {
        self.rooms.get(&self.focus)
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn arena(&self) -> &EntityArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut EntityArena {
        &mut self.arena
    }

    pub fn plot(&self) -> &PlotEngine {
        &self.plot
    }

    pub fn write_message(&mut self, text: &str) {
        self.messages.write(text);
    }

    /// Moves focus to `room`, detaching the old room from the render sink
    /// (and refreshing its resting state) before attaching and refreshing
    /// the new one. `None` re-resolves the current focus, which amounts to a
    /// full refresh.
    pub fn set_focus(&mut self, room: Option<&str>) -> Result<(), WorldError> {
        let target = room.unwrap_or(&self.focus).to_string();
        if !self.rooms.contains_key(&target) {
            return Err(WorldError::UnknownRoom { name: target });
        }
        if let Some(current) = self.rooms.get(&self.focus) {
            self.renderer.detach(current.name());
            current.refresh(&self.arena, self.renderer.as_mut());
        }
        self.focus = target;
        info!(room = %self.focus, "focus_changed");
        self.attach_focus();
        Ok(())
    }

    /// Steps the player in the focused room. A successful step onto a portal
    /// coordinate transfers the player to the destination room and focuses
    /// it.
    pub fn step_player(&mut self, dx: i32, dy: i32) -> Result<bool, WorldError> {
        if !self.step_focus_entity(self.player, dx, dy) {
            return Ok(false);
        }
        let Some((x, y)) = self
            .arena
            .get(self.player)
            .map(|player| (player.tile_x, player.tile_y))
        else {
            return Ok(true);
        };
        let dest = self
            .focus_room()
            .and_then(|room| room.portal_dest(x, y))
            .map(str::to_string);
        if let Some(dest) = dest {
            self.portal_entity(self.player, x, y)?;
            self.set_focus(Some(&dest))?;
        }
        Ok(true)
    }

    /// Steps any entity inside the focused room. Reports whether the move
    /// landed.
    pub fn step_focus_entity(&mut self, id: EntityId, dx: i32, dy: i32) -> bool {
        let Some(room) = self.rooms.get_mut(&self.focus) else {
            return false;
        };
        room.step_entity(&mut self.arena, self.renderer.as_mut(), id, dx, dy)
    }

    /// Steps the entity tagged `tag` in the focused room; unknown tags are a
    /// configuration fault.
    pub fn step_unique(&mut self, tag: &str, dx: i32, dy: i32) -> Result<bool, WorldError> {
        let Some(room) = self.rooms.get_mut(&self.focus) else {
            return Err(WorldError::UnknownRoom {
                name: self.focus.clone(),
            });
        };
        Ok(room.step_unique(&mut self.arena, self.renderer.as_mut(), tag, dx, dy)?)
    }

    /// Transfers `id` through the portal at (x, y) in the focused room into
    /// the destination's paired coordinate, preserving its stacking index
    /// where possible. No portal at (x, y) is a silent no-op; a destination
    /// missing from the registry or missing its paired coordinate is a loud
    /// configuration fault, checked before anything moves.
    pub fn portal_entity(&mut self, id: EntityId, x: i32, y: i32) -> Result<(), WorldError> {
        let source_name = self.focus.clone();
        let Some(dest_name) = self
            .rooms
            .get(&source_name)
            .and_then(|room| room.portal_dest(x, y))
            .map(str::to_string)
        else {
            return Ok(());
        };
        let dest_room = self
            .rooms
            .get(&dest_name)
            .ok_or_else(|| WorldError::UnknownRoom {
                name: dest_name.clone(),
            })?;
        let (dest_x, dest_y) =
            dest_room
                .portal_coord(&source_name)
                .ok_or_else(|| WorldError::MissingReturnPortal {
                    from: source_name.clone(),
                    to: dest_name.clone(),
                })?;
        let Some(z) = self.arena.get(id).map(|entity| entity.tile_z) else {
            warn!(entity = id.0, "portal requested for unknown entity");
            return Ok(());
        };

        if let Some(source) = self.rooms.get_mut(&source_name) {
            source.pop_entity(&self.arena, x, y, z);
        }
        if let Some(dest) = self.rooms.get_mut(&dest_name) {
            dest.add_entity(&mut self.arena, self.renderer.as_mut(), id, dest_x, dest_y, Some(z))?;
        }
        debug!(entity = id.0, from = %source_name, to = %dest_name, "entity_portaled");
        Ok(())
    }

    /// Invokes the action of every actionable entity in the cell the player
    /// faces, in stack order. No actionable entity there (or no cell at all)
    /// is a silent no-op.
    pub fn interact(&mut self) {
        let Some(player) = self.arena.get(self.player) else {
            return;
        };
        let front_x = player.tile_x.saturating_add(player.facing.dx);
        let front_y = player.tile_y.saturating_add(player.facing.dy);
        let Some(room) = self.rooms.get(&self.focus) else {
            return;
        };
        let Some(stack) = room.stack(front_x, front_y) else {
            return;
        };
        let targets: Vec<EntityId> = stack.iter().flatten().copied().collect();
        for id in targets {
            let has_action = self
                .arena
                .get(id)
                .is_some_and(|entity| entity.action.is_some());
            if has_action {
                debug!(entity = id.0, x = front_x, y = front_y, "interact");
                self.invoke_action(id);
            }
        }
    }

    /// Detaches `actor`'s bound action, invokes it, and re-binds it — unless
    /// the invocation installed a replacement binding (Reset), which then
    /// wins. Entities without an action are a no-op.
    pub fn invoke_action(&mut self, actor: EntityId) {
        let Some(entity) = self.arena.get_mut(actor) else {
            warn!(entity = actor.0, "action invoked for unknown entity");
            return;
        };
        let Some(mut action) = entity.action.take() else {
            return;
        };
        action.invoke(self, actor);
        if let Some(entity) = self.arena.get_mut(actor) {
            if entity.action.is_none() {
                entity.action = Some(action);
            }
        }
    }

    /// Merges flags into the plot engine, then invokes every trigger
    /// callback the merge fired, with the player as the acting entity. A
    /// callback that updates the plot again performs a fresh update pass.
    pub fn update_plot(&mut self, flags: impl IntoIterator<Item = Flag>) {
        let fired = self.plot.update(flags);
        let player = self.player;
        for mut callback in fired {
            callback.invoke(self, player);
        }
    }

    fn attach_focus(&mut self) {
        if let Some(room) = self.rooms.get(&self.focus) {
            self.renderer.attach(room.name());
            room.refresh(&self.arena, self.renderer.as_mut());
        }
    }
}
