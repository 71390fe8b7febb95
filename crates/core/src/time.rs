//! Fixed-width subtitle timestamps.
//! A timestamp is four bounded fields (hours, minutes, seconds, milliseconds)
//! with carrying arithmetic that refuses to leave the `00:00:00.000` to
//! `99:59:59.999` range instead of clamping.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MAX_HOURS: i64 = 99;
const MINUTES_PER_HOUR: i64 = 60;
const SECONDS_PER_MINUTE: i64 = 60;
const MILLIS_PER_SECOND: i64 = 1000;

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{2}):([0-9]{2}):([0-9]{2})[,.]([0-9]{3})$").expect("valid timestamp regex")
});

/// One of the four fields of a [`Timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeField {
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl TimeField {
    /// Largest value the field may hold.
    pub fn max(self) -> i64 {
        match self {
            TimeField::Hours => MAX_HOURS,
            TimeField::Minutes => MINUTES_PER_HOUR - 1,
            TimeField::Seconds => SECONDS_PER_MINUTE - 1,
            TimeField::Milliseconds => MILLIS_PER_SECOND - 1,
        }
    }

    fn check(self, value: i64) -> Result<i64, InvalidTimeError> {
        if (0..=self.max()).contains(&value) {
            Ok(value)
        } else {
            Err(InvalidTimeError::OutOfRange { field: self, value })
        }
    }
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeField::Hours => "hours",
            TimeField::Minutes => "minutes",
            TimeField::Seconds => "seconds",
            TimeField::Milliseconds => "milliseconds",
        };
        f.write_str(name)
    }
}

/// Raised when a timestamp would leave its valid range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidTimeError {
    #[error("invalid value {value} for field '{field}'")]
    OutOfRange { field: TimeField, value: i64 },

    #[error("sum of hours > 99")]
    HoursOverflow,

    #[error("sum of hours < 0")]
    HoursUnderflow,

    #[error("delta does not fit in a timestamp")]
    ArithmeticOverflow,

    #[error("malformed timestamp '{0}'")]
    Malformed(String),
}

/// A point in a subtitle track, `HH:MM:SS.mmm`.
///
/// Fields are private so the range invariant always holds. Ordering is the
/// lexicographic order of (hours, minutes, seconds, milliseconds), which the
/// field declaration order gives to the derived impls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    hours: u8,
    minutes: u8,
    seconds: u8,
    milliseconds: u16,
}

impl Timestamp {
    /// `00:00:00.000`.
    pub const ZERO: Timestamp = Timestamp {
        hours: 0,
        minutes: 0,
        seconds: 0,
        milliseconds: 0,
    };

    /// Build a timestamp from four raw fields, validating each one.
    pub fn new(
        hours: i64,
        minutes: i64,
        seconds: i64,
        milliseconds: i64,
    ) -> Result<Self, InvalidTimeError> {
        Ok(TimestampBuilder::new()
            .with_hours(hours)?
            .with_minutes(minutes)?
            .with_seconds(seconds)?
            .with_milliseconds(milliseconds)?
            .build())
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn milliseconds(&self) -> u16 {
        self.milliseconds
    }

    /// Format as SubRip writes it, with a comma before the milliseconds.
    pub fn to_srt(&self) -> String {
        format!(
            "{:02}:{:02}:{:02},{:03}",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }

    /// Add a signed number of hours.
    /// Fails if the result leaves `0..=99`; the value is untouched on failure.
    pub fn add_hours(&mut self, hours: i64) -> Result<&mut Self, InvalidTimeError> {
        self.apply(|t| t.carry_hours(hours))
    }

    pub fn remove_hours(&mut self, hours: i64) -> Result<&mut Self, InvalidTimeError> {
        self.add_hours(negate(hours)?)
    }

    /// Add a signed number of minutes, carrying whole hours into `add_hours`.
    pub fn add_minutes(&mut self, minutes: i64) -> Result<&mut Self, InvalidTimeError> {
        self.apply(|t| t.carry_minutes(minutes))
    }

    pub fn remove_minutes(&mut self, minutes: i64) -> Result<&mut Self, InvalidTimeError> {
        self.add_minutes(negate(minutes)?)
    }

    /// Add a signed number of seconds, carrying whole minutes upwards.
    pub fn add_seconds(&mut self, seconds: i64) -> Result<&mut Self, InvalidTimeError> {
        self.apply(|t| t.carry_seconds(seconds))
    }

    pub fn remove_seconds(&mut self, seconds: i64) -> Result<&mut Self, InvalidTimeError> {
        self.add_seconds(negate(seconds)?)
    }

    /// Add a signed number of milliseconds, carrying whole seconds upwards.
    pub fn add_milliseconds(&mut self, milliseconds: i64) -> Result<&mut Self, InvalidTimeError> {
        self.apply(|t| t.carry_milliseconds(milliseconds))
    }

    pub fn remove_milliseconds(
        &mut self,
        milliseconds: i64,
    ) -> Result<&mut Self, InvalidTimeError> {
        self.add_milliseconds(negate(milliseconds)?)
    }

    /// Field-wise sum, adding hours, minutes, seconds then milliseconds.
    pub fn checked_add(&self, other: &Timestamp) -> Result<Timestamp, InvalidTimeError> {
        let mut sum = *self;
        sum.add_hours(other.hours.into())?
            .add_minutes(other.minutes.into())?
            .add_seconds(other.seconds.into())?
            .add_milliseconds(other.milliseconds.into())?;
        Ok(sum)
    }

    /// Field-wise difference. Subtracting a later timestamp from an earlier
    /// one underflows the hours and fails.
    pub fn checked_sub(&self, other: &Timestamp) -> Result<Timestamp, InvalidTimeError> {
        let mut diff = *self;
        diff.remove_hours(other.hours.into())?
            .remove_minutes(other.minutes.into())?
            .remove_seconds(other.seconds.into())?
            .remove_milliseconds(other.milliseconds.into())?;
        Ok(diff)
    }

    /// Run a carry chain on a copy and commit it only if every step succeeded.
    fn apply(
        &mut self,
        step: impl FnOnce(&mut Timestamp) -> Result<(), InvalidTimeError>,
    ) -> Result<&mut Self, InvalidTimeError> {
        let mut next = *self;
        step(&mut next)?;
        *self = next;
        Ok(self)
    }

    fn carry_hours(&mut self, delta: i64) -> Result<(), InvalidTimeError> {
        if delta == 0 {
            return Ok(());
        }
        let sum = i64::from(self.hours)
            .checked_add(delta)
            .ok_or(InvalidTimeError::ArithmeticOverflow)?;
        if sum > MAX_HOURS {
            return Err(InvalidTimeError::HoursOverflow);
        }
        if sum < 0 {
            return Err(InvalidTimeError::HoursUnderflow);
        }
        self.hours = sum as u8;
        Ok(())
    }

    fn carry_minutes(&mut self, delta: i64) -> Result<(), InvalidTimeError> {
        if delta == 0 {
            return Ok(());
        }
        let sum = i64::from(self.minutes)
            .checked_add(delta)
            .ok_or(InvalidTimeError::ArithmeticOverflow)?;
        self.carry_hours(sum.div_euclid(MINUTES_PER_HOUR))?;
        self.minutes = sum.rem_euclid(MINUTES_PER_HOUR) as u8;
        Ok(())
    }

    fn carry_seconds(&mut self, delta: i64) -> Result<(), InvalidTimeError> {
        if delta == 0 {
            return Ok(());
        }
        let sum = i64::from(self.seconds)
            .checked_add(delta)
            .ok_or(InvalidTimeError::ArithmeticOverflow)?;
        self.carry_minutes(sum.div_euclid(SECONDS_PER_MINUTE))?;
        self.seconds = sum.rem_euclid(SECONDS_PER_MINUTE) as u8;
        Ok(())
    }

    fn carry_milliseconds(&mut self, delta: i64) -> Result<(), InvalidTimeError> {
        if delta == 0 {
            return Ok(());
        }
        let sum = i64::from(self.milliseconds)
            .checked_add(delta)
            .ok_or(InvalidTimeError::ArithmeticOverflow)?;
        self.carry_seconds(sum.div_euclid(MILLIS_PER_SECOND))?;
        self.milliseconds = sum.rem_euclid(MILLIS_PER_SECOND) as u16;
        Ok(())
    }
}

fn negate(delta: i64) -> Result<i64, InvalidTimeError> {
    delta
        .checked_neg()
        .ok_or(InvalidTimeError::ArithmeticOverflow)
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }
}

impl FromStr for Timestamp {
    type Err = InvalidTimeError;

    /// Parse `HH:MM:SS,mmm` or `HH:MM:SS.mmm`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TIMESTAMP_RE
            .captures(s.trim())
            .ok_or_else(|| InvalidTimeError::Malformed(s.to_string()))?;
        let field = |i: usize| -> Result<i64, InvalidTimeError> {
            caps[i]
                .parse()
                .map_err(|_| InvalidTimeError::Malformed(s.to_string()))
        };
        Ok(TimestampBuilder::new()
            .with_hours(field(1)?)?
            .with_minutes(field(2)?)?
            .with_seconds(field(3)?)?
            .with_milliseconds(field(4)?)?
            .build())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Assembles a [`Timestamp`] from raw integers, rejecting each field as soon
/// as it is out of range. A rejected field leaves the builder unchanged.
#[derive(Debug, Clone, Default)]
pub struct TimestampBuilder {
    hours: u8,
    minutes: u8,
    seconds: u8,
    milliseconds: u16,
}

impl TimestampBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hours(&mut self, hours: i64) -> Result<&mut Self, InvalidTimeError> {
        self.hours = TimeField::Hours.check(hours)? as u8;
        Ok(self)
    }

    pub fn with_minutes(&mut self, minutes: i64) -> Result<&mut Self, InvalidTimeError> {
        self.minutes = TimeField::Minutes.check(minutes)? as u8;
        Ok(self)
    }

    pub fn with_seconds(&mut self, seconds: i64) -> Result<&mut Self, InvalidTimeError> {
        self.seconds = TimeField::Seconds.check(seconds)? as u8;
        Ok(self)
    }

    pub fn with_milliseconds(&mut self, milliseconds: i64) -> Result<&mut Self, InvalidTimeError> {
        self.milliseconds = TimeField::Milliseconds.check(milliseconds)? as u16;
        Ok(self)
    }

    pub fn build(&self) -> Timestamp {
        Timestamp {
            hours: self.hours,
            minutes: self.minutes,
            seconds: self.seconds,
            milliseconds: self.milliseconds,
        }
    }
}
