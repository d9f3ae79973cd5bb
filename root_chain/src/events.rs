use containers::RootChainEvent;
use tracing::debug;

/// Append-only record of emitted events.
///
/// Consumers poll with the index they stopped at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<RootChainEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: RootChainEvent) {
        debug!(event = event.name(), "emit");
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events_since(&self, cursor: usize) -> &[RootChainEvent] {
        self.events.get(cursor..).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RootChainEvent> {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&RootChainEvent> {
        self.events.last()
    }
}
