//! Coalescing of recomputation triggers.

/// A request to recompute part of the schedule.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Intent {
    /// The runnable set should be rebuilt.
    Schedule,
    /// The decision set should be applied to the active tasks.
    Enforce,
    /// The work-fetch policy should be reevaluated.
    Fetch,
}

/// A queue of pending intents holding at most one entry per kind.
///
/// External events never mutate scheduling state directly; they queue an
/// intent here, and the next control-loop pass consumes it. A burst of
/// identical triggers thereby collapses into one recomputation.
#[derive(Debug, Default)]
pub struct Intents {
    pending: Vec<Intent>,
}

impl Intents {
    /// Create a queue.
    #[inline]
    pub fn new() -> Intents {
        Intents::default()
    }

    /// Queue an intent unless an identical one is already pending.
    pub fn push(&mut self, intent: Intent, reason: &str) {
        if self.pending.contains(&intent) {
            return;
        }
        debug!(target: "Intent", "{:?} requested ({}).", intent, reason);
        self.pending.push(intent);
    }

    /// Consume a pending intent, reporting whether there was one.
    pub fn take(&mut self, intent: Intent) -> bool {
        match self.pending.iter().position(|&pending| pending == intent) {
            Some(position) => {
                self.pending.remove(position);
                true
            },
            _ => false,
        }
    }

    /// Check whether nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Intent, Intents};

    #[test]
    fn coalesce() {
        let mut intents = Intents::new();

        intents.push(Intent::Schedule, "one");
        intents.push(Intent::Schedule, "two");
        intents.push(Intent::Fetch, "three");

        assert!(intents.take(Intent::Schedule));
        assert!(!intents.take(Intent::Schedule));
        assert!(intents.take(Intent::Fetch));
        assert!(intents.is_empty());
    }
}
