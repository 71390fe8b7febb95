//! Error types for subtitle parsing, eventing and file access.

use crate::cue::Field;
use crate::event::SubscriptionId;
use crate::srt::line::LineKind;
use crate::time::InvalidTimeError;
use std::path::PathBuf;
use thiserror::Error;

/// A cue could not be built because a required field was never set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cue is missing its {0}")]
pub struct MissingField(pub Field);

/// Fatal parse failure, pointing at the 0-based index of the offending line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("invalid start of cue: expected an id or a blank line, found {0}")]
    InvalidCueStart(LineKind),

    #[error("id line not followed by a time line (found {0})")]
    MissingTimeRange(LineKind),

    #[error("time line not followed by a text line (found {0})")]
    MissingText(LineKind),

    #[error("missing blank line between cues")]
    MissingSeparator,

    #[error("text line followed by a time line")]
    UnexpectedTimeRange,

    #[error("invalid cue id '{0}'")]
    InvalidId(String),

    #[error(transparent)]
    InvalidTime(#[from] InvalidTimeError),

    #[error("duplicate cue id {0}")]
    DuplicateCue(u32),

    #[error(transparent)]
    IncompleteCue(#[from] MissingField),

    #[error("file ends in the middle of a cue")]
    UnexpectedEof,
}

/// Failures of [`crate::EventPublisher`] bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("listener {0} is not subscribed")]
    NotSubscribed(SubscriptionId),
}

/// Anything that can go wrong loading or saving a subtitle file.
#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}
