//! Recording sink doubles shared by the module tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::frontend::{MessageSink, RenderSink, RoomGeometry};
use crate::world::{Entity, EntityId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RenderEvent {
    Attach(String),
    Detach(String),
    Position {
        room: String,
        entity: EntityId,
        x: i32,
        y: i32,
        z: usize,
    },
}

impl RenderEvent {
    pub(crate) fn attach(room: &str) -> Self {
        Self::Attach(room.to_string())
    }

    pub(crate) fn detach(room: &str) -> Self {
        Self::Detach(room.to_string())
    }

    pub(crate) fn position(room: &str, entity: EntityId, x: i32, y: i32, z: usize) -> Self {
        Self::Position {
            room: room.to_string(),
            entity,
            x,
            y,
            z,
        }
    }
}

/// Render sink that appends every notification to a shared log. The handle
/// half stays with the test after the world takes ownership of the sink.
pub(crate) struct RecordingRenderer {
    events: Rc<RefCell<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    pub(crate) fn new() -> (Self, Rc<RefCell<Vec<RenderEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                events: Rc::clone(&events),
            },
            events,
        )
    }
}

impl RenderSink for RecordingRenderer {
    fn attach(&mut self, room: &str) {
        self.events.borrow_mut().push(RenderEvent::attach(room));
    }

    fn detach(&mut self, room: &str) {
        self.events.borrow_mut().push(RenderEvent::detach(room));
    }

    fn notify_position(&mut self, room: &str, entity: &Entity, _geometry: RoomGeometry) {
        self.events.borrow_mut().push(RenderEvent::position(
            room,
            entity.id,
            entity.tile_x,
            entity.tile_y,
            entity.tile_z,
        ));
    }
}

/// Message sink that appends every line to a shared log.
pub(crate) struct RecordingMessages {
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingMessages {
    pub(crate) fn new() -> (Self, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl MessageSink for RecordingMessages {
    fn write(&mut self, text: &str) {
        self.log.borrow_mut().push(text.to_string());
    }
}

/// A rectangular grid of empty stacks with the given depth per cell.
pub(crate) fn empty_grid(
    width: usize,
    height: usize,
    depth: usize,
) -> Vec<Vec<Vec<Option<EntityId>>>> {
    (0..height)
        .map(|_| (0..width).map(|_| vec![None; depth]).collect())
        .collect()
}
