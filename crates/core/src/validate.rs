//! Consistency checks over a cue collection.

use crate::cue::Cue;
use crate::time::Timestamp;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// One problem found on a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// The id does not match the cue's position in time order.
    WrongId { expected: u32, found: u32 },
    MissingId,
    MissingText,
    /// The cue ends before or when it starts.
    StartNotBeforeEnd,
    StartNotAfterPreviousStart,
    EndNotAfterPreviousStart,
    StartNotAfterPreviousEnd,
    EndNotAfterPreviousEnd,
}

impl ValidationIssue {
    /// True for the checks against the preceding cue.
    pub fn is_overlap(&self) -> bool {
        matches!(
            self,
            ValidationIssue::StartNotAfterPreviousStart
                | ValidationIssue::EndNotAfterPreviousStart
                | ValidationIssue::StartNotAfterPreviousEnd
                | ValidationIssue::EndNotAfterPreviousEnd
        )
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::WrongId { expected, found } => {
                write!(f, "wrong id (expected {expected}, found {found})")
            }
            ValidationIssue::MissingId => f.write_str("missing id"),
            ValidationIssue::MissingText => f.write_str("missing text"),
            ValidationIssue::StartNotBeforeEnd => f.write_str("starttime >= endtime"),
            ValidationIssue::StartNotAfterPreviousStart => {
                f.write_str("starttime <= last_starttime")
            }
            ValidationIssue::EndNotAfterPreviousStart => f.write_str("endtime <= last_starttime"),
            ValidationIssue::StartNotAfterPreviousEnd => f.write_str("starttime <= last_endtime"),
            ValidationIssue::EndNotAfterPreviousEnd => f.write_str("endtime <= last_endtime"),
        }
    }
}

/// Everything wrong with one cue. `id` is the id the cue had when checked.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    #[serde(skip)]
    pub cue: Cue,
    pub id: u32,
    pub start: Timestamp,
    pub end: Timestamp,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Human readable tags, one per issue.
    pub fn tags(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Sort `cues` by (start, end) and check each one against its position and
/// its predecessor. Only cues with at least one issue are reported.
pub(crate) fn validate(cues: &mut [Cue], try_fix: bool) -> Vec<ValidationReport> {
    cues.sort_by_key(|cue| (cue.start(), cue.end()));

    let mut reports = Vec::new();
    let mut previous: Option<(Timestamp, Timestamp)> = None;
    for (pos, cue) in cues.iter().enumerate() {
        let fields = cue.snapshot();
        let mut issues = Vec::new();

        let expected = u32::try_from(pos + 1).unwrap_or(u32::MAX);
        if fields.id != expected {
            issues.push(ValidationIssue::WrongId {
                expected,
                found: fields.id,
            });
            if try_fix {
                debug!("renumber cue {} -> {}", fields.id, expected);
                cue.set_id(expected);
            }
        }

        if fields.id == 0 {
            issues.push(ValidationIssue::MissingId);
        }
        if fields.text.is_empty() {
            issues.push(ValidationIssue::MissingText);
        }

        if fields.start >= fields.end {
            issues.push(ValidationIssue::StartNotBeforeEnd);
        }

        if let Some((last_start, last_end)) = previous {
            if fields.start <= last_start {
                issues.push(ValidationIssue::StartNotAfterPreviousStart);
            }
            if fields.end <= last_start {
                issues.push(ValidationIssue::EndNotAfterPreviousStart);
            }
            if fields.start <= last_end {
                issues.push(ValidationIssue::StartNotAfterPreviousEnd);
            }
            if fields.end <= last_end {
                issues.push(ValidationIssue::EndNotAfterPreviousEnd);
            }
        }
        previous = Some((fields.start, fields.end));

        if !issues.is_empty() {
            reports.push(ValidationReport {
                cue: cue.clone(),
                id: fields.id,
                start: fields.start,
                end: fields.end,
                issues,
            });
        }
    }
    debug!("validated {} cues, {} with issues", cues.len(), reports.len());
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Subtitle;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,500\nWorld\nSecond line\n";

    fn ts(s: i64, ms: i64) -> Timestamp {
        Timestamp::new(0, 0, s, ms).unwrap()
    }

    #[test]
    fn clean_file_has_no_findings() {
        let mut sub = Subtitle::new("sample.srt");
        sub.parse_str(SAMPLE).unwrap();
        assert!(sub.validate(false).is_empty());
    }

    #[test]
    fn overlapping_start_is_flagged() {
        let mut sub = Subtitle::new("sample.srt");
        sub.parse_str(SAMPLE).unwrap();
        sub.get(2).unwrap().set_start(ts(1, 500));

        let reports = sub.validate(false);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, 2);
        assert_eq!(
            reports[0].issues,
            vec![ValidationIssue::StartNotAfterPreviousEnd]
        );
        assert!(reports[0].issues.iter().all(ValidationIssue::is_overlap));
    }

    #[test]
    fn reports_inverted_range_and_missing_text() {
        let mut sub = Subtitle::new("unused.srt");
        sub.insert(sub.new_cue(1, ts(3, 0), ts(2, 0), Vec::new()));
        let reports = sub.validate(false);
        assert_eq!(
            reports[0].tags(),
            vec!["missing text".to_string(), "starttime >= endtime".to_string()]
        );
    }

    #[test]
    fn fixes_ids_only_when_asked() {
        let mut sub = Subtitle::new("unused.srt");
        sub.insert(sub.new_cue(5, ts(1, 0), ts(2, 0), vec!["a".into()]));
        sub.insert(sub.new_cue(9, ts(3, 0), ts(4, 0), vec!["b".into()]));

        let reports = sub.validate(false);
        assert_eq!(reports.len(), 2);
        assert_eq!(
            reports[0].issues,
            vec![ValidationIssue::WrongId {
                expected: 1,
                found: 5
            }]
        );
        assert_eq!(sub.cues()[0].id(), 5);

        sub.validate(true);
        assert_eq!(sub.cues()[0].id(), 1);
        assert_eq!(sub.cues()[1].id(), 2);
        assert!(sub.validate(false).is_empty());
    }

    #[test]
    fn sorts_by_start_then_end() {
        let mut sub = Subtitle::new("unused.srt");
        sub.insert(sub.new_cue(1, ts(5, 0), ts(9, 0), vec!["c".into()]));
        sub.insert(sub.new_cue(2, ts(1, 0), ts(3, 0), vec!["b".into()]));
        sub.insert(sub.new_cue(3, ts(1, 0), ts(2, 0), vec!["a".into()]));
        let reports = sub.validate(false);

        let order: Vec<String> = sub.iter().map(|c| c.text().join("")).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        // "b" shares its start with "a" and ends after it.
        let b = reports.iter().find(|r| r.id == 2).unwrap();
        assert!(b.issues.contains(&ValidationIssue::StartNotAfterPreviousStart));
        assert!(b.issues.contains(&ValidationIssue::StartNotAfterPreviousEnd));
        assert!(!b.issues.contains(&ValidationIssue::EndNotAfterPreviousEnd));
    }

    #[test]
    fn report_serializes_without_the_cue_handle() {
        let mut sub = Subtitle::new("unused.srt");
        sub.insert(sub.new_cue(2, ts(1, 0), ts(2, 0), vec!["a".into()]));
        let reports = sub.validate(false);
        let json = serde_json::to_value(&reports).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "id": 2,
                "start": "00:00:01.000",
                "end": "00:00:02.000",
                "issues": [{"issue": "wrong_id", "expected": 1, "found": 2}]
            }])
        );
    }
}
