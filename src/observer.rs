//! Structural-event hooks for [`DenseMap`](crate::DenseMap).
//!
//! The map never prints or logs on its own. Instrumentation is injected as
//! a [`MapObserver`] through the builder; the default observer does nothing.

/// Receives notifications about structural changes of a map.
///
/// Callbacks run synchronously while the map is consistent. They must not
/// panic.
pub trait MapObserver {
    /// Storage was rebuilt and all live entries re-seated. `new_capacity`
    /// equals `old_capacity` when the rebuild only dropped tombstones.
    fn on_grow(&mut self, _old_capacity: usize, _new_capacity: usize, _live: usize) {}

    /// A lookup moved a live entry from slot `from` into the earlier
    /// tombstone slot `to`.
    fn on_compaction(&mut self, _from: usize, _to: usize) {}

    /// The entry at `index` was erased and replaced by a tombstone.
    fn on_tombstone(&mut self, _index: usize) {}
}

/// Observer that ignores every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopObserver;

impl MapObserver for NoopObserver {}

/// Observer that forwards events to the `log` crate: growth at `debug`,
/// compaction and erasure at `trace`.
#[cfg(feature = "logging")]
#[derive(Clone, Debug, Default)]
pub struct LogObserver {
    map_name: Option<String>,
}

#[cfg(feature = "logging")]
impl LogObserver {
    /// Prefix every record with `[name] `.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            map_name: Some(name.into()),
        }
    }

    fn prefix(&self) -> String {
        self.map_name
            .as_deref()
            .map(|name| format!("[{name}] "))
            .unwrap_or_default()
    }
}

#[cfg(feature = "logging")]
impl MapObserver for LogObserver {
    fn on_grow(&mut self, old_capacity: usize, new_capacity: usize, live: usize) {
        if new_capacity == old_capacity {
            log::debug!(
                "{}rebuilt {new_capacity} slots in place ({live} live entries re-seated)",
                self.prefix()
            );
        } else {
            log::debug!(
                "{}grew from {old_capacity} to {new_capacity} slots ({live} live entries re-seated)",
                self.prefix()
            );
        }
    }

    fn on_compaction(&mut self, from: usize, to: usize) {
        log::trace!("{}moved entry from slot {from} into tombstone {to}", self.prefix());
    }

    fn on_tombstone(&mut self, index: usize) {
        log::trace!("{}erased slot {index}", self.prefix());
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::MapObserver;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Debug, Eq, PartialEq)]
    pub(crate) enum Event {
        Grow { from: usize, to: usize, live: usize },
        Compaction { from: usize, to: usize },
        Tombstone(usize),
    }

    /// Records events into a shared log the test keeps a handle to.
    #[derive(Clone, Default)]
    pub(crate) struct Recorder {
        pub(crate) events: Rc<RefCell<Vec<Event>>>,
    }

    impl Recorder {
        pub(crate) fn grows(&self) -> Vec<(usize, usize)> {
            self.events
                .borrow()
                .iter()
                .filter_map(|e| match *e {
                    Event::Grow { from, to, .. } => Some((from, to)),
                    _ => None,
                })
                .collect()
        }
    }

    impl MapObserver for Recorder {
        fn on_grow(&mut self, from: usize, to: usize, live: usize) {
            self.events.borrow_mut().push(Event::Grow { from, to, live });
        }

        fn on_compaction(&mut self, from: usize, to: usize) {
            self.events.borrow_mut().push(Event::Compaction { from, to });
        }

        fn on_tombstone(&mut self, index: usize) {
            self.events.borrow_mut().push(Event::Tombstone(index));
        }
    }
}

#[cfg(all(test, feature = "logging"))]
mod tests {
    use super::*;

    #[test]
    fn log_observer_prefix() {
        assert_eq!(LogObserver::default().prefix(), "");
        assert_eq!(LogObserver::named("topics").prefix(), "[topics] ");
    }
}
