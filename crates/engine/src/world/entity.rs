use crate::action::Action;

/// Stable handle into the world's entity arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

/// Unit direction pair, one sign per axis. (0, 0) never occurs from
/// movement with a nonzero step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facing {
    pub dx: i32,
    pub dy: i32,
}

impl Facing {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Direction of an attempted step, with sign extracted per axis.
    pub fn from_step(dx: i32, dy: i32) -> Self {
        Self {
            dx: dx.signum(),
            dy: dy.signum(),
        }
    }
}

impl Default for Facing {
    fn default() -> Self {
        Self { dx: 0, dy: -1 }
    }
}

/// A tangible thing in the game world. Placement fields are maintained by
/// the owning room; everything else is free to mutate.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub walkable: bool,
    pub facing: Facing,
    pub action: Option<Action>,
    /// Unique lookup name within the entity's room, if any.
    pub tag: Option<String>,
    pub tile_x: i32,
    pub tile_y: i32,
    pub tile_z: usize,
}

impl Entity {
    pub fn coords(&self) -> (i32, i32, usize) {
        (self.tile_x, self.tile_y, self.tile_z)
    }
}

/// Owns every entity for the run. Rooms and uniques indexes store
/// `EntityId` handles into this arena, never entities themselves. Entities
/// are spawned at load time and live for the whole session, so handles are
/// plain indices.
#[derive(Debug, Default)]
pub struct EntityArena {
    entities: Vec<Entity>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, name: impl Into<String>, walkable: bool) -> EntityId {
        let id = EntityId(self.entities.len() as u64);
        self.entities.push(Entity {
            id,
            name: name.into(),
            walkable,
            facing: Facing::default(),
            action: None,
            tag: None,
            tile_x: 0,
            tile_y: 0,
            tile_z: 0,
        });
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }
}
