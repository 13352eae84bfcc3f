use crate::plot::Flag;
use crate::world::{EntityId, World};

pub const DEFAULT_TALK_SEPARATOR: &str = ": ";

/// A composable behavior bound to an entity. Invoked with the world and the
/// acting entity, side effects only. Sequencing variants hold explicit
/// cursor state instead of leaning on iterator combinators, so "stick on the
/// last action" and "wrap around" are plain index arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Calls the next sub-action per invocation; once the list is exhausted
    /// every further invocation calls the final sub-action.
    Iter { actions: Vec<Action>, cursor: usize },
    /// Calls the next sub-action per invocation, wrapping to the first after
    /// the last.
    Loop { actions: Vec<Action>, cursor: usize },
    /// Runs the full sequence `times` times, then sticks on the final
    /// sub-action.
    Cycle {
        times: u32,
        actions: Vec<Action>,
        cursor: usize,
        lap: u32,
    },
    /// Calls every sub-action, in order, on every invocation.
    Sequence { actions: Vec<Action> },
    /// Rebinds the acting entity's action to a clone of `replacement`, then
    /// invokes the new binding once in the same call.
    Reset { replacement: Box<Action> },
    /// Forwards a fixed flag set to the plot engine.
    UpdatePlot { flags: Vec<Flag> },
    /// Writes a literal line to the message sink.
    Alert { text: String },
    /// Writes `name + separator + text` for the acting entity.
    Talk { text: String, sep: String },
    /// Steps the acting entity by a fixed delta in the focused room,
    /// ignoring whether the move lands.
    Move { dx: i32, dy: i32 },
}

impl Action {
    pub fn iter(actions: Vec<Action>) -> Self {
        Self::Iter { actions, cursor: 0 }
    }

    pub fn repeat(actions: Vec<Action>) -> Self {
        Self::Loop { actions, cursor: 0 }
    }

    pub fn cycle(times: u32, actions: Vec<Action>) -> Self {
        Self::Cycle {
            times,
            actions,
            cursor: 0,
            lap: 0,
        }
    }

    pub fn sequence(actions: Vec<Action>) -> Self {
        Self::Sequence { actions }
    }

    pub fn reset(replacement: Action) -> Self {
        Self::Reset {
            replacement: Box::new(replacement),
        }
    }

    pub fn update_plot(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self::UpdatePlot {
            flags: flags.into_iter().collect(),
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self::Alert { text: text.into() }
    }

    pub fn talk(text: impl Into<String>) -> Self {
        Self::Talk {
            text: text.into(),
            sep: DEFAULT_TALK_SEPARATOR.to_string(),
        }
    }

    pub fn talk_with_sep(text: impl Into<String>, sep: impl Into<String>) -> Self {
        Self::Talk {
            text: text.into(),
            sep: sep.into(),
        }
    }

    pub fn step(dx: i32, dy: i32) -> Self {
        Self::Move { dx, dy }
    }

    /// Executes the action for `actor`. Empty sequences are rejected at load
    /// time; a programmatically built empty sequence is a no-op here.
    pub fn invoke(&mut self, world: &mut World, actor: EntityId) {
        match self {
            Self::Iter { actions, cursor } => {
                let Some(top) = actions.len().checked_sub(1) else {
                    return;
                };
                let index = (*cursor).min(top);
                if let Some(action) = actions.get_mut(index) {
                    action.invoke(world, actor);
                }
                *cursor = index.saturating_add(1).min(top);
            }
            Self::Loop { actions, cursor } => {
                if actions.is_empty() {
                    return;
                }
                let index = *cursor % actions.len();
                let next = (index + 1) % actions.len();
                if let Some(action) = actions.get_mut(index) {
                    action.invoke(world, actor);
                }
                *cursor = next;
            }
            Self::Cycle {
                times,
                actions,
                cursor,
                lap,
            } => {
                let Some(top) = actions.len().checked_sub(1) else {
                    return;
                };
                let index = (*cursor).min(top);
                if let Some(action) = actions.get_mut(index) {
                    action.invoke(world, actor);
                }
                if index < top {
                    *cursor = index + 1;
                } else if (*lap).saturating_add(1) < *times {
                    *lap += 1;
                    *cursor = 0;
                } else {
                    *cursor = top;
                }
            }
            Self::Sequence { actions } => {
                for action in actions {
                    action.invoke(world, actor);
                }
            }
            Self::Reset { replacement } => {
                let fresh = (**replacement).clone();
                if let Some(entity) = world.arena_mut().get_mut(actor) {
                    entity.action = Some(fresh);
                }
                world.invoke_action(actor);
            }
            Self::UpdatePlot { flags } => {
                world.update_plot(flags.iter().cloned());
            }
            Self::Alert { text } => {
                world.write_message(text);
            }
            Self::Talk { text, sep } => {
                let name = world
                    .arena()
                    .get(actor)
                    .map(|entity| entity.name.clone())
                    .unwrap_or_default();
                let line = format!("{name}{sep}{text}");
                world.write_message(&line);
            }
            Self::Move { dx, dy } => {
                let _ = world.step_focus_entity(actor, *dx, *dy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::frontend::NullRenderSink;
    use crate::plot::{PlotEngine, Trigger};
    use crate::test_support::{empty_grid, RecordingMessages};
    use crate::world::{EntityArena, Room};

    /// A 3x3 room with the player at (1, 1) and an acting entity at (2, 1),
    /// wired to a recording message sink.
    fn world_with_actor(
        action: Action,
        plot: PlotEngine,
    ) -> (World, EntityId, Rc<RefCell<Vec<String>>>) {
        let mut arena = EntityArena::new();
        let player = arena.spawn("@", false);
        let actor = arena.spawn("Maple", false);
        arena.get_mut(actor).expect("actor").action = Some(action);

        let mut rows = empty_grid(3, 3, 1);
        rows[1][1][0] = Some(player);
        rows[1][2][0] = Some(actor);
        let room = Room::new("den", rows, &mut arena).expect("valid room");

        let (messages, log) = RecordingMessages::new();
        let world = World::new(
            vec![room],
            arena,
            "den",
            player,
            plot,
            Box::new(NullRenderSink),
            Box::new(messages),
        )
        .expect("valid world");
        (world, actor, log)
    }

    fn invoke_times(world: &mut World, actor: EntityId, count: usize) {
        for _ in 0..count {
            world.invoke_action(actor);
        }
    }

    #[test]
    fn iter_advances_once_per_call_then_sticks_on_final() {
        let action = Action::iter(vec![Action::alert("A"), Action::alert("B")]);
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
        invoke_times(&mut world, actor, 4);
        assert_eq!(*log.borrow(), ["A", "B", "B", "B"]);
    }

    #[test]
    fn iter_with_single_action_calls_it_every_time() {
        let action = Action::iter(vec![Action::alert("only")]);
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
        invoke_times(&mut world, actor, 2);
        assert_eq!(*log.borrow(), ["only", "only"]);
    }

    #[test]
    fn loop_wraps_back_to_the_first_action() {
        let action = Action::repeat(vec![Action::alert("A"), Action::alert("B")]);
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
        invoke_times(&mut world, actor, 5);
        assert_eq!(*log.borrow(), ["A", "B", "A", "B", "A"]);
    }

    #[test]
    fn cycle_repeats_n_times_then_sticks_on_final() {
        let action = Action::cycle(2, vec![Action::alert("A"), Action::alert("B")]);
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
        invoke_times(&mut world, actor, 5);
        assert_eq!(*log.borrow(), ["A", "B", "A", "B", "B"]);
    }

    #[test]
    fn sequence_runs_every_action_each_call() {
        let action = Action::sequence(vec![Action::alert("A"), Action::alert("B")]);
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
        invoke_times(&mut world, actor, 2);
        assert_eq!(*log.borrow(), ["A", "B", "A", "B"]);
    }

    #[test]
    fn empty_sequences_are_noops() {
        for action in [
            Action::iter(Vec::new()),
            Action::repeat(Vec::new()),
            Action::cycle(3, Vec::new()),
            Action::sequence(Vec::new()),
        ] {
            let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
            invoke_times(&mut world, actor, 2);
            assert!(log.borrow().is_empty());
        }
    }

    #[test]
    fn reset_rebinds_the_entity_and_fires_the_new_action_immediately() {
        let action = Action::reset(Action::alert("fresh"));
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());

        world.invoke_action(actor);
        assert_eq!(*log.borrow(), ["fresh"]);
        assert_eq!(
            world.arena().get(actor).expect("actor").action,
            Some(Action::alert("fresh"))
        );

        world.invoke_action(actor);
        assert_eq!(*log.borrow(), ["fresh", "fresh"]);
    }

    #[test]
    fn reset_nested_in_iter_replaces_the_whole_binding() {
        let action = Action::iter(vec![
            Action::alert("first"),
            Action::reset(Action::alert("rebound")),
        ]);
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
        invoke_times(&mut world, actor, 3);
        assert_eq!(*log.borrow(), ["first", "rebound", "rebound"]);
        assert_eq!(
            world.arena().get(actor).expect("actor").action,
            Some(Action::alert("rebound"))
        );
    }

    #[test]
    fn alert_writes_the_literal_text() {
        let action = Action::alert("Danger approaches!");
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
        world.invoke_action(actor);
        assert_eq!(*log.borrow(), ["Danger approaches!"]);
    }

    #[test]
    fn talk_prefixes_the_speaker_name() {
        let action = Action::talk("Nice to meet you.");
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
        world.invoke_action(actor);
        assert_eq!(*log.borrow(), ["Maple: Nice to meet you."]);
    }

    #[test]
    fn talk_separator_is_overridable_per_instance() {
        let action = Action::talk_with_sep("Over here.", " ==> ");
        let (mut world, actor, log) = world_with_actor(action, PlotEngine::default());
        world.invoke_action(actor);
        assert_eq!(*log.borrow(), ["Maple ==> Over here."]);
    }

    #[test]
    fn move_steps_the_acting_entity() {
        let action = Action::step(0, 1);
        let (mut world, actor, _log) = world_with_actor(action, PlotEngine::default());
        world.invoke_action(actor);
        assert_eq!(world.arena().get(actor).expect("actor").coords(), (2, 2, 0));
    }

    #[test]
    fn move_ignores_a_blocked_step() {
        let action = Action::step(1, 0);
        let (mut world, actor, _log) = world_with_actor(action, PlotEngine::default());
        // (3, 1) is outside the 3x3 grid; nothing moves and nothing faults.
        world.invoke_action(actor);
        assert_eq!(world.arena().get(actor).expect("actor").coords(), (2, 1, 0));
    }

    #[test]
    fn update_plot_forwards_flags_and_fires_triggers() {
        let plot = PlotEngine::new(
            [],
            vec![Trigger::new(
                [Flag::from("gift")],
                Action::alert("The air shivers."),
            )],
        );
        let action = Action::update_plot([Flag::from("gift")]);
        let (mut world, actor, log) = world_with_actor(action, plot);
        world.invoke_action(actor);
        assert!(world.plot().contains(&Flag::from("gift")));
        assert_eq!(*log.borrow(), ["The air shivers."]);
    }

    #[test]
    fn composed_script_plays_out_across_interactions() {
        let plot = PlotEngine::new(
            [],
            vec![Trigger::new(
                [Flag::from("met")],
                Action::alert("Something stirs."),
            )],
        );
        let action = Action::iter(vec![
            Action::talk("Hello."),
            Action::sequence(vec![
                Action::talk("Goodbye."),
                Action::update_plot([Flag::from("met")]),
            ]),
        ]);
        let (mut world, actor, log) = world_with_actor(action, plot);
        invoke_times(&mut world, actor, 2);
        assert_eq!(
            *log.borrow(),
            ["Maple: Hello.", "Maple: Goodbye.", "Something stirs."]
        );
    }
}
