use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::action::Action;

/// An opaque narrative-state token. Flags accumulate for the whole run and
/// are never removed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Flag(String);

impl Flag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Flag {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Flag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A one-shot narrative trigger: fires once every required flag is present,
/// then hands its nested sub-triggers to the live forest.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    required: BTreeSet<Flag>,
    callback: Action,
    unlocks: Vec<Trigger>,
}

impl Trigger {
    pub fn new(required: impl IntoIterator<Item = Flag>, callback: Action) -> Self {
        Self {
            required: required.into_iter().collect(),
            callback,
            unlocks: Vec::new(),
        }
    }

    pub fn with_unlocks(mut self, unlocks: Vec<Trigger>) -> Self {
        self.unlocks = unlocks;
        self
    }

    fn is_satisfied_by(&self, flags: &BTreeSet<Flag>) -> bool {
        self.required.is_subset(flags)
    }
}

/// The plot state machine: an accumulated flag set plus the live trigger
/// forest. `update` merges new flags, then makes exactly one pass over the
/// forest snapshot taken at entry; sub-triggers unlocked during the pass
/// become eligible on the next call, never the current one.
#[derive(Debug, Default)]
pub struct PlotEngine {
    flags: BTreeSet<Flag>,
    triggers: Vec<Trigger>,
}

impl PlotEngine {
    pub fn new(flags: impl IntoIterator<Item = Flag>, triggers: Vec<Trigger>) -> Self {
        Self {
            flags: flags.into_iter().collect(),
            triggers,
        }
    }

    /// Merges `new_flags` and returns the callbacks of every trigger fired
    /// by this pass, in forest order. The caller invokes them once the
    /// engine's state is consistent, so a callback may re-enter `update`.
    pub fn update(&mut self, new_flags: impl IntoIterator<Item = Flag>) -> Vec<Action> {
        self.flags.extend(new_flags);

        let snapshot = std::mem::take(&mut self.triggers);
        let mut fired = Vec::new();
        let mut kept = Vec::new();
        let mut unlocked = Vec::new();
        for trigger in snapshot {
            if trigger.is_satisfied_by(&self.flags) {
                fired.push(trigger.callback);
                unlocked.extend(trigger.unlocks);
            } else {
                kept.push(trigger);
            }
        }
        kept.extend(unlocked);
        self.triggers = kept;

        debug!(
            flags = self.flags.len(),
            fired = fired.len(),
            pending = self.triggers.len(),
            "plot_updated"
        );
        fired
    }

    pub fn contains(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    pub fn flags(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn pending_trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// True once every narrative branch has fired; further updates only
    /// grow the flag set.
    pub fn is_exhausted(&self) -> bool {
        self.triggers.is_empty()
    }
}
