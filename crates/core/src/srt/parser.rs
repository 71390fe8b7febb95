//! Cue assembly: a small state machine over classified lines.
//!
//! ```text
//! Start/Empty --blank--> Empty        Start/Empty --id--> SeenId
//! SeenId --time--> SeenTime           SeenTime --text--> SeenText
//! SeenText --text--> SeenText         SeenText --blank--> Empty (cue inserted)
//! ```
//!
//! Any other transition is a [`ParseError`] naming the line. A cue still open
//! in `SeenText` at the end of input is inserted without a trailing blank.

use super::line::{classify, Line};
use crate::cue::CueBuilder;
use crate::error::{ParseError, ParseErrorKind};
use crate::subtitle::Subtitle;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Empty,
    SeenId,
    SeenTime,
    SeenText,
}

struct CueAssembler {
    state: State,
    builder: CueBuilder,
    inserted: usize,
}

impl CueAssembler {
    fn new() -> Self {
        Self {
            state: State::Start,
            builder: CueBuilder::new(),
            inserted: 0,
        }
    }

    fn feed(
        &mut self,
        index: usize,
        line: Line,
        subtitle: &mut Subtitle,
    ) -> Result<(), ParseError> {
        let fail = |kind: ParseErrorKind| -> Result<(), ParseError> {
            Err(ParseError::new(index, kind))
        };
        self.state = match (self.state, line) {
            (State::Start | State::Empty, Line::Empty) => State::Empty,
            (State::Start | State::Empty, Line::Id(id)) => {
                self.builder = CueBuilder::new().with_id(id);
                State::SeenId
            }
            (State::Start | State::Empty, other) => {
                return fail(ParseErrorKind::InvalidCueStart(other.kind()))
            }

            (State::SeenId, Line::TimeRange(start, end)) => {
                self.builder = std::mem::take(&mut self.builder).with_range(start, end);
                State::SeenTime
            }
            (State::SeenId, other) => return fail(ParseErrorKind::MissingTimeRange(other.kind())),

            (State::SeenTime, Line::Text(text)) => {
                self.builder.push_line(text);
                State::SeenText
            }
            (State::SeenTime, other) => return fail(ParseErrorKind::MissingText(other.kind())),

            (State::SeenText, Line::Text(text)) => {
                self.builder.push_line(text);
                State::SeenText
            }
            (State::SeenText, Line::Empty) => {
                self.finalize(index, subtitle)?;
                State::Empty
            }
            (State::SeenText, Line::Id(_)) => return fail(ParseErrorKind::MissingSeparator),
            (State::SeenText, Line::TimeRange(..)) => {
                return fail(ParseErrorKind::UnexpectedTimeRange)
            }
        };
        Ok(())
    }

    /// Close the input. `last` is the index of the final line.
    fn finish(&mut self, last: usize, subtitle: &mut Subtitle) -> Result<(), ParseError> {
        match self.state {
            State::SeenText => {
                self.finalize(last, subtitle)?;
                self.state = State::Empty;
                Ok(())
            }
            State::SeenId | State::SeenTime => {
                Err(ParseError::new(last, ParseErrorKind::UnexpectedEof))
            }
            State::Start | State::Empty => Ok(()),
        }
    }

    fn finalize(&mut self, index: usize, subtitle: &mut Subtitle) -> Result<(), ParseError> {
        let builder = std::mem::take(&mut self.builder);
        let cue = builder
            .build(subtitle.publisher())
            .map_err(|missing| ParseError::new(index, missing.into()))?;
        let id = cue.id();
        if !subtitle.insert(cue) {
            return Err(ParseError::new(index, ParseErrorKind::DuplicateCue(id)));
        }
        self.inserted += 1;
        Ok(())
    }
}

/// Split text into lines the way a universal-newline reader would: a leading
/// BOM is dropped, `\r\n` and `\r` become `\n`, and each line keeps its `\n`.
fn split_lines(content: &str) -> Vec<String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    normalized.split_inclusive('\n').map(str::to_string).collect()
}

/// Parse SubRip `content` and insert every cue into `subtitle`.
/// Returns how many cues were inserted.
pub fn parse_into(subtitle: &mut Subtitle, content: &str) -> Result<usize, ParseError> {
    let lines = split_lines(content);
    let mut assembler = CueAssembler::new();
    for (index, raw) in lines.iter().enumerate() {
        let line = classify(raw).map_err(|kind| ParseError::new(index, kind))?;
        trace!("line {} {:?} in state {:?}", index, line.kind(), assembler.state);
        assembler.feed(index, line, subtitle)?;
    }
    assembler.finish(lines.len().saturating_sub(1), subtitle)?;
    debug!("assembled {} cues from {} lines", assembler.inserted, lines.len());
    Ok(assembler.inserted)
}
