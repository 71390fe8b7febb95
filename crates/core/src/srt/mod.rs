//! This module is responsible for the SubRip text format.
//! `line` classifies raw lines, `parser` groups them into cues and this file
//! writes cues back out.

pub mod line;
pub mod parser;

use crate::cue::Cue;
use tracing::warn;

/// Format cues as SubRip text.
/// Each cue is written as id, time line and text lines followed by a blank line.
/// Cues without text cannot be read back, so they are skipped with a warning.
pub fn format(cues: &[Cue]) -> String {
    let mut out = String::new();
    for cue in cues {
        let fields = cue.snapshot();
        if fields.text.is_empty() {
            warn!("cue {} has no text, not writing it", fields.id);
            continue;
        }
        out.push_str(&format!(
            "{}\n{} --> {}\n",
            fields.id,
            fields.start.to_srt(),
            fields.end.to_srt()
        ));
        for line in &fields.text {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
