//! Subtitle cues and their change-tracked fields.
//!
//! A [`Cue`] is a shared handle: the subtitle's collection and any pending
//! undo entries point at the same record. Every public setter publishes a
//! [`ChangeEvent::FieldUpdated`] carrying the previous value before storing
//! the new one. Undo writes through [`Cue::restore`], which stores silently.

use crate::error::MissingField;
use crate::event::{ChangeEvent, EventPublisher};
use crate::time::Timestamp;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Names one of the four fields of a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Start,
    End,
    Text,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Id => "id",
            Field::Start => "start",
            Field::End => "end",
            Field::Text => "text",
        };
        f.write_str(name)
    }
}

/// The value held by one field, tagged with the field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Id(u32),
    Start(Timestamp),
    End(Timestamp),
    Text(Vec<String>),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Id(_) => Field::Id,
            FieldValue::Start(_) => Field::Start,
            FieldValue::End(_) => Field::End,
            FieldValue::Text(_) => Field::Text,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Id(id) => write!(f, "{id}"),
            FieldValue::Start(t) | FieldValue::End(t) => write!(f, "{t}"),
            FieldValue::Text(lines) => write!(f, "{lines:?}"),
        }
    }
}

/// Plain copy of a cue's fields at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CueFields {
    pub id: u32,
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: Vec<String>,
}

struct CueInner {
    fields: RefCell<CueFields>,
    // Weak so that logged events holding this cue do not keep the channel alive.
    publisher: Weak<EventPublisher>,
}

/// One subtitle entry: id, display interval and text lines.
#[derive(Clone)]
pub struct Cue {
    inner: Rc<CueInner>,
}

impl Cue {
    /// Create a cue bound to `publisher`. Construction itself emits nothing.
    pub fn new(
        publisher: &Rc<EventPublisher>,
        id: u32,
        start: Timestamp,
        end: Timestamp,
        text: Vec<String>,
    ) -> Self {
        Self {
            inner: Rc::new(CueInner {
                fields: RefCell::new(CueFields {
                    id,
                    start,
                    end,
                    text,
                }),
                publisher: Rc::downgrade(publisher),
            }),
        }
    }

    pub fn id(&self) -> u32 {
        self.inner.fields.borrow().id
    }

    pub fn start(&self) -> Timestamp {
        self.inner.fields.borrow().start
    }

    pub fn end(&self) -> Timestamp {
        self.inner.fields.borrow().end
    }

    pub fn text(&self) -> Vec<String> {
        self.inner.fields.borrow().text.clone()
    }

    pub fn snapshot(&self) -> CueFields {
        self.inner.fields.borrow().clone()
    }

    /// Current value of `field`.
    pub fn get(&self, field: Field) -> FieldValue {
        let fields = self.inner.fields.borrow();
        match field {
            Field::Id => FieldValue::Id(fields.id),
            Field::Start => FieldValue::Start(fields.start),
            Field::End => FieldValue::End(fields.end),
            Field::Text => FieldValue::Text(fields.text.clone()),
        }
    }

    pub fn set_id(&self, id: u32) {
        self.write(FieldValue::Id(id));
    }

    pub fn set_start(&self, start: Timestamp) {
        self.write(FieldValue::Start(start));
    }

    pub fn set_end(&self, end: Timestamp) {
        self.write(FieldValue::End(end));
    }

    pub fn set_text(&self, text: Vec<String>) {
        self.write(FieldValue::Text(text));
    }

    /// Append one line. The whole previous text is what gets logged, so an
    /// undo restores it exactly.
    pub fn add_line(&self, line: impl Into<String>) {
        let mut text = self.text();
        text.push(line.into());
        self.set_text(text);
    }

    /// True when this cue publishes on `publisher`.
    pub(crate) fn is_bound_to(&self, publisher: &Rc<EventPublisher>) -> bool {
        Weak::ptr_eq(&self.inner.publisher, &Rc::downgrade(publisher))
    }

    /// True when both handles point at the same record.
    pub fn is_same(&self, other: &Cue) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Store `value` without publishing anything.
    pub(crate) fn restore(&self, value: FieldValue) {
        let mut fields = self.inner.fields.borrow_mut();
        match value {
            FieldValue::Id(id) => fields.id = id,
            FieldValue::Start(start) => fields.start = start,
            FieldValue::End(end) => fields.end = end,
            FieldValue::Text(text) => fields.text = text,
        }
    }

    fn write(&self, new: FieldValue) {
        let old = self.get(new.field());
        if let Some(publisher) = self.inner.publisher.upgrade() {
            publisher.publish(&ChangeEvent::FieldUpdated {
                cue: self.clone(),
                old,
                new: new.clone(),
            });
        }
        self.restore(new);
    }
}

impl fmt::Debug for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner.fields.borrow(), f)
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.inner.fields.borrow();
        write!(
            f,
            "{}\n{} --> {}\n{}",
            fields.id,
            fields.start,
            fields.end,
            fields.text.join("\n")
        )
    }
}

/// Collects the parts of a cue as the parser encounters them.
#[derive(Debug, Clone, Default)]
pub struct CueBuilder {
    id: Option<u32>,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    text: Vec<String>,
}

impl CueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_range(mut self, start: Timestamp, end: Timestamp) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.text.push(line.into());
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Build the cue. Id, start and end are required and the id must be
    /// non-zero; an empty text is accepted here and left to validation.
    pub fn build(self, publisher: &Rc<EventPublisher>) -> Result<Cue, MissingField> {
        let id = self
            .id
            .filter(|id| *id != 0)
            .ok_or(MissingField(Field::Id))?;
        let start = self.start.ok_or(MissingField(Field::Start))?;
        let end = self.end.ok_or(MissingField(Field::End))?;
        Ok(Cue::new(publisher, id, start, end, self.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: i64) -> Timestamp {
        Timestamp::new(0, 0, s, 0).unwrap()
    }

    fn recording_publisher() -> (Rc<EventPublisher>, Rc<RefCell<Vec<ChangeEvent>>>) {
        let publisher = Rc::new(EventPublisher::new());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        publisher.add_subscriber(Rc::new(move |event: &ChangeEvent| {
            sink.borrow_mut().push(event.clone());
        }));
        (publisher, events)
    }

    #[test]
    fn construction_emits_nothing() {
        let (publisher, events) = recording_publisher();
        let cue = Cue::new(&publisher, 1, ts(1), ts(2), vec!["a".into()]);
        assert_eq!(cue.id(), 1);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn setters_publish_old_and_new_values() {
        let (publisher, events) = recording_publisher();
        let cue = Cue::new(&publisher, 1, ts(1), ts(2), Vec::new());
        cue.set_id(7);
        cue.set_end(ts(3));

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        match &events[0] {
            ChangeEvent::FieldUpdated { cue: target, old, new } => {
                assert!(target.is_same(&cue));
                assert_eq!(*old, FieldValue::Id(1));
                assert_eq!(*new, FieldValue::Id(7));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1].field(), Some(Field::End));
        assert_eq!(cue.end(), ts(3));
    }

    #[test]
    fn add_line_logs_the_full_previous_text() {
        let (publisher, events) = recording_publisher();
        let cue = Cue::new(&publisher, 1, ts(1), ts(2), vec!["first".into()]);
        cue.add_line("second");
        assert_eq!(cue.text(), vec!["first".to_string(), "second".to_string()]);
        match &events.borrow()[0] {
            ChangeEvent::FieldUpdated { old, .. } => {
                assert_eq!(*old, FieldValue::Text(vec!["first".into()]));
            }
            other => panic!("unexpected event {other:?}"),
        };
    }

    #[test]
    fn restore_is_silent() {
        let (publisher, events) = recording_publisher();
        let cue = Cue::new(&publisher, 1, ts(1), ts(2), Vec::new());
        cue.restore(FieldValue::Id(4));
        assert_eq!(cue.id(), 4);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn setters_still_work_after_publisher_is_dropped() {
        let publisher = Rc::new(EventPublisher::new());
        let cue = Cue::new(&publisher, 1, ts(1), ts(2), Vec::new());
        drop(publisher);
        cue.set_start(ts(0));
        assert_eq!(cue.start(), ts(0));
    }

    #[test]
    fn builder_requires_id_and_times() {
        let publisher = Rc::new(EventPublisher::new());
        assert_eq!(
            CueBuilder::new().build(&publisher).unwrap_err(),
            MissingField(Field::Id)
        );
        assert_eq!(
            CueBuilder::new().with_id(0).build(&publisher).unwrap_err(),
            MissingField(Field::Id)
        );
        assert_eq!(
            CueBuilder::new().with_id(3).build(&publisher).unwrap_err(),
            MissingField(Field::Start)
        );
        let cue = CueBuilder::new()
            .with_id(3)
            .with_range(ts(1), ts(2))
            .build(&publisher)
            .unwrap();
        assert!(cue.text().is_empty());
        assert_eq!(cue.to_string(), "3\n00:00:01.000 --> 00:00:02.000\n");
    }

    #[test]
    fn knows_its_channel() {
        let publisher = Rc::new(EventPublisher::new());
        let other = Rc::new(EventPublisher::new());
        let cue = Cue::new(&publisher, 1, ts(1), ts(2), Vec::new());
        assert!(cue.is_bound_to(&publisher));
        assert!(!cue.is_bound_to(&other));
    }

    #[test]
    fn clones_share_the_record() {
        let publisher = Rc::new(EventPublisher::new());
        let cue = Cue::new(&publisher, 1, ts(1), ts(2), Vec::new());
        let other = cue.clone();
        other.set_id(9);
        assert_eq!(cue.id(), 9);
        assert!(cue.is_same(&other));
        let twin = Cue::new(&publisher, 9, ts(1), ts(2), Vec::new());
        assert!(!cue.is_same(&twin));
    }
}
