//! In-memory SubRip subtitles with change tracking and undo.
//!
//! A [`Subtitle`] parses a `.srt` file into [`Cue`]s. Every edit to a cue and
//! every insert or removal is published as a [`ChangeEvent`] and logged, so
//! [`Subtitle::undo`] can reverse changes one at a time, newest first.

pub mod cue;
pub mod error;
pub mod event;
pub mod srt;
pub mod subtitle;
pub mod time;
pub mod validate;
pub mod video;

pub use cue::{Cue, CueBuilder, CueFields, Field, FieldValue};
pub use error::{EventError, MissingField, ParseError, ParseErrorKind, SubtitleError};
pub use event::{ChangeEvent, ChangeListener, EventPublisher, SubscriptionId};
pub use subtitle::Subtitle;
pub use time::{InvalidTimeError, TimeField, Timestamp, TimestampBuilder};
pub use validate::{ValidationIssue, ValidationReport};
