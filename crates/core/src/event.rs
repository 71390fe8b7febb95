//! Change notifications emitted by cues and subtitles.
//! The publisher fans every event out to its listeners synchronously and in
//! registration order. The owning [`crate::Subtitle`] is always one of them.

use crate::cue::{Cue, Field, FieldValue};
use crate::error::EventError;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// One recorded change, carrying enough state to reverse it.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A field of `cue` went from `old` to `new`.
    FieldUpdated {
        cue: Cue,
        old: FieldValue,
        new: FieldValue,
    },
    CueAdded(Cue),
    CueRemoved(Cue),
}

impl ChangeEvent {
    pub fn cue(&self) -> &Cue {
        match self {
            ChangeEvent::FieldUpdated { cue, .. }
            | ChangeEvent::CueAdded(cue)
            | ChangeEvent::CueRemoved(cue) => cue,
        }
    }

    /// The updated field, or `None` for structural events.
    pub fn field(&self) -> Option<Field> {
        match self {
            ChangeEvent::FieldUpdated { old, .. } => Some(old.field()),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::FieldUpdated { old, new, .. } => {
                write!(f, "{}: {} -> {}", old.field(), old, new)
            }
            ChangeEvent::CueAdded(cue) => write!(f, "added cue {}", cue.id()),
            ChangeEvent::CueRemoved(cue) => write!(f, "removed cue {}", cue.id()),
        }
    }
}

/// Receives every event published on the channel it is subscribed to.
///
/// Listeners cannot fail; a panic inside `on_event` unwinds through
/// [`EventPublisher::publish`] into whoever triggered the change.
pub trait ChangeListener {
    fn on_event(&self, event: &ChangeEvent);
}

impl<F> ChangeListener for F
where
    F: Fn(&ChangeEvent),
{
    fn on_event(&self, event: &ChangeEvent) {
        self(event)
    }
}

/// Handle returned by [`EventPublisher::add_subscriber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Broadcast channel for [`ChangeEvent`]s.
#[derive(Default)]
pub struct EventPublisher {
    subscribers: RefCell<Vec<(SubscriptionId, Rc<dyn ChangeListener>)>>,
    next_id: Cell<u64>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every listener registered at the time of the call.
    pub fn publish(&self, event: &ChangeEvent) {
        trace!("publish event={}", event);
        // Listeners may subscribe or unsubscribe while being notified.
        let listeners: Vec<Rc<dyn ChangeListener>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_event(event);
        }
    }

    pub fn add_subscriber(&self, listener: Rc<dyn ChangeListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, listener));
        id
    }

    pub fn remove_subscriber(&self, id: SubscriptionId) -> Result<(), EventError> {
        let mut subscribers = self.subscribers.borrow_mut();
        let pos = subscribers
            .iter()
            .position(|(sub, _)| *sub == id)
            .ok_or(EventError::NotSubscribed(id))?;
        subscribers.remove(pos);
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timestamp;

    fn sample_cue(publisher: &Rc<EventPublisher>) -> Cue {
        Cue::new(publisher, 1, Timestamp::ZERO, Timestamp::ZERO, Vec::new())
    }

    #[test]
    fn delivers_to_every_subscriber() {
        let publisher = Rc::new(EventPublisher::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        publisher.add_subscriber(Rc::new(move |event: &ChangeEvent| {
            sink.borrow_mut().push(event.to_string());
        }));
        let counter = Rc::new(Cell::new(0));
        let count = Rc::clone(&counter);
        publisher.add_subscriber(Rc::new(move |_: &ChangeEvent| count.set(count.get() + 1)));

        let cue = sample_cue(&publisher);
        publisher.publish(&ChangeEvent::CueAdded(cue));

        assert_eq!(counter.get(), 1);
        assert_eq!(*seen.borrow(), vec!["added cue 1".to_string()]);
    }

    #[test]
    fn unsubscribed_listener_is_not_notified() {
        let publisher = Rc::new(EventPublisher::new());
        let counter = Rc::new(Cell::new(0));
        let count = Rc::clone(&counter);
        let id = publisher.add_subscriber(Rc::new(move |_: &ChangeEvent| {
            count.set(count.get() + 1)
        }));
        publisher.remove_subscriber(id).unwrap();
        publisher.publish(&ChangeEvent::CueRemoved(sample_cue(&publisher)));
        assert_eq!(counter.get(), 0);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn removing_unknown_subscriber_fails() {
        let publisher = EventPublisher::new();
        let id = publisher.add_subscriber(Rc::new(|_: &ChangeEvent| {}));
        publisher.remove_subscriber(id).unwrap();
        assert_eq!(
            publisher.remove_subscriber(id),
            Err(EventError::NotSubscribed(id))
        );
    }

    #[test]
    fn field_updates_report_their_field() {
        let publisher = Rc::new(EventPublisher::new());
        let cue = sample_cue(&publisher);
        let event = ChangeEvent::FieldUpdated {
            cue,
            old: FieldValue::Id(1),
            new: FieldValue::Id(2),
        };
        assert_eq!(event.field(), Some(Field::Id));
        assert_eq!(event.to_string(), "id: 1 -> 2");
    }
}
