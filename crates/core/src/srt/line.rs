//! Line classification for SubRip input.

use crate::error::ParseErrorKind;
use crate::time::{InvalidTimeError, Timestamp, TimestampBuilder};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;

static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+\n$").expect("valid id regex"));

static TIME_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([0-9]{2}):([0-9]{2}):([0-9]{2})[,.]([0-9]{3}) --> ([0-9]{2}):([0-9]{2}):([0-9]{2})[,.]([0-9]{3})\s*$",
    )
    .expect("valid time range regex")
});

/// What kind of line was seen, without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Empty,
    Id,
    TimeRange,
    Text,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LineKind::Empty => "blank line",
            LineKind::Id => "id line",
            LineKind::TimeRange => "time line",
            LineKind::Text => "text line",
        };
        f.write_str(name)
    }
}

/// A classified line together with its parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Empty,
    Id(u32),
    TimeRange(Timestamp, Timestamp),
    Text(String),
}

impl Line {
    pub fn kind(&self) -> LineKind {
        match self {
            Line::Empty => LineKind::Empty,
            Line::Id(_) => LineKind::Id,
            Line::TimeRange(..) => LineKind::TimeRange,
            Line::Text(_) => LineKind::Text,
        }
    }
}

/// Classify one line, including its trailing newline if it has one.
///
/// The first match wins: whitespace only, digits followed by a newline, a
/// `HH:MM:SS,mmm --> HH:MM:SS,mmm` range, and finally text.
pub fn classify(line: &str) -> Result<Line, ParseErrorKind> {
    if line.trim().is_empty() {
        return Ok(Line::Empty);
    }

    if ID_RE.is_match(line) {
        let digits = line.trim_end_matches('\n');
        return digits
            .parse()
            .map(Line::Id)
            .map_err(|_| ParseErrorKind::InvalidId(digits.to_string()));
    }

    if let Some(caps) = TIME_RANGE_RE.captures(line) {
        let start = timestamp_at(&caps, 1)?;
        let end = timestamp_at(&caps, 5)?;
        return Ok(Line::TimeRange(start, end));
    }

    let text = line.strip_suffix('\n').unwrap_or(line);
    Ok(Line::Text(text.to_string()))
}

/// Build a timestamp from the four capture groups starting at `first`.
fn timestamp_at(caps: &Captures, first: usize) -> Result<Timestamp, InvalidTimeError> {
    let group = |i: usize| -> Result<i64, InvalidTimeError> {
        caps[first + i]
            .parse()
            .map_err(|_| InvalidTimeError::Malformed(caps[0].to_string()))
    };
    Ok(TimestampBuilder::new()
        .with_hours(group(0)?)?
        .with_minutes(group(1)?)?
        .with_seconds(group(2)?)?
        .with_milliseconds(group(3)?)?
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeField;

    fn ts(h: i64, m: i64, s: i64, ms: i64) -> Timestamp {
        Timestamp::new(h, m, s, ms).unwrap()
    }

    #[test]
    fn blank_lines_are_empty() {
        assert_eq!(classify("").unwrap(), Line::Empty);
        assert_eq!(classify("\n").unwrap(), Line::Empty);
        assert_eq!(classify("  \t \n").unwrap(), Line::Empty);
    }

    #[test]
    fn digits_with_newline_are_ids() {
        assert_eq!(classify("12\n").unwrap(), Line::Id(12));
        // Without the newline it is plain text.
        assert_eq!(classify("12").unwrap(), Line::Text("12".into()));
        assert_eq!(classify(" 12\n").unwrap(), Line::Text(" 12".into()));
        assert!(matches!(
            classify("99999999999\n"),
            Err(ParseErrorKind::InvalidId(_))
        ));
    }

    #[test]
    fn time_ranges_accept_both_separators() {
        assert_eq!(
            classify("00:00:01,000 --> 00:00:02.500  \n").unwrap(),
            Line::TimeRange(ts(0, 0, 1, 0), ts(0, 0, 2, 500))
        );
        assert_eq!(
            classify("12:34:56.789 --> 12:34:57,000").unwrap(),
            Line::TimeRange(ts(12, 34, 56, 789), ts(12, 34, 57, 0))
        );
    }

    #[test]
    fn out_of_range_time_is_an_error() {
        assert_eq!(
            classify("00:60:00,000 --> 00:00:02,000\n").unwrap_err(),
            ParseErrorKind::InvalidTime(InvalidTimeError::OutOfRange {
                field: TimeField::Minutes,
                value: 60
            })
        );
    }

    #[test]
    fn malformed_ranges_fall_through_to_text() {
        assert_eq!(
            classify("0:00:01,000 --> 00:00:02,000\n").unwrap().kind(),
            LineKind::Text
        );
        assert_eq!(
            classify("00:00:01,000-->00:00:02,000\n").unwrap().kind(),
            LineKind::Text
        );
    }

    #[test]
    fn text_keeps_inner_spacing() {
        assert_eq!(
            classify("  spaced out  \n").unwrap(),
            Line::Text("  spaced out  ".into())
        );
    }
}
