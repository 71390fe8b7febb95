//! The subtitle aggregate: an ordered cue collection plus its undo log.
//!
//! A [`Subtitle`] subscribes a change log to its own publisher when it is
//! created, so every field update and every insert or removal is recorded
//! in emission order, including the ones made while parsing. [`Subtitle::undo`]
//! pops the newest entry and reverses it without publishing anything.

use crate::cue::Cue;
use crate::error::{ParseError, SubtitleError};
use crate::event::{ChangeEvent, ChangeListener, EventPublisher};
use crate::srt;
use crate::time::Timestamp;
use crate::validate::{self, ValidationReport};
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, trace, warn};

/// Append-only record of every event seen on the subtitle's channel.
#[derive(Default)]
struct ChangeLog {
    events: RefCell<Vec<ChangeEvent>>,
}

impl ChangeLog {
    fn pop(&self) -> Option<ChangeEvent> {
        self.events.borrow_mut().pop()
    }

    fn len(&self) -> usize {
        self.events.borrow().len()
    }
}

impl ChangeListener for ChangeLog {
    fn on_event(&self, event: &ChangeEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// A SubRip file loaded into memory.
pub struct Subtitle {
    path: PathBuf,
    cues: Vec<Cue>,
    publisher: Rc<EventPublisher>,
    log: Rc<ChangeLog>,
}

impl Subtitle {
    /// Create an empty subtitle for `path`. Nothing is read until [`Subtitle::parse`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let publisher = Rc::new(EventPublisher::new());
        let log = Rc::new(ChangeLog::default());
        publisher.add_subscriber(log.clone());
        Self {
            path: path.into(),
            cues: Vec::new(),
            publisher,
            log,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The channel cues of this subtitle publish their changes on.
    pub fn publisher(&self) -> &Rc<EventPublisher> {
        &self.publisher
    }

    /// Create a free-standing cue wired to this subtitle's channel.
    /// It is not part of the collection until passed to [`Subtitle::insert`].
    pub fn new_cue(&self, id: u32, start: Timestamp, end: Timestamp, text: Vec<String>) -> Cue {
        Cue::new(&self.publisher, id, start, end, text)
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cue> {
        self.cues.iter()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// First cue whose id is `id`.
    pub fn get(&self, id: u32) -> Option<&Cue> {
        self.cues.iter().find(|cue| cue.id() == id)
    }

    /// Number of changes that can still be undone.
    pub fn history_len(&self) -> usize {
        self.log.len()
    }

    /// Logged changes, oldest first.
    pub fn history(&self) -> Vec<ChangeEvent> {
        self.log.events.borrow().clone()
    }

    /// Append `cue` unless a cue with the same id is already present.
    /// Cues created on another channel are refused: their edits would never
    /// reach this subtitle's log.
    pub fn insert(&mut self, cue: Cue) -> bool {
        if !cue.is_bound_to(&self.publisher) {
            warn!("cue {} belongs to another subtitle, not inserting", cue.id());
            return false;
        }
        if self.cues.iter().any(|existing| existing.id() == cue.id()) {
            warn!("cue {} already exists, not inserting", cue.id());
            return false;
        }
        debug!("insert cue id={}", cue.id());
        self.cues.push(cue.clone());
        self.publisher.publish(&ChangeEvent::CueAdded(cue));
        true
    }

    /// Detach `cue` from the collection. Returns false if it was not a member.
    pub fn remove(&mut self, cue: &Cue) -> bool {
        let Some(pos) = self.position(cue) else {
            return false;
        };
        debug!("remove cue id={}", cue.id());
        let removed = self.cues.remove(pos);
        self.publisher.publish(&ChangeEvent::CueRemoved(removed));
        true
    }

    /// Reverse the most recent logged change and return it.
    /// An empty log is not an error: the call does nothing and returns `None`.
    pub fn undo(&mut self) -> Option<ChangeEvent> {
        let event = self.log.pop()?;
        debug!("undo {}", event);
        match &event {
            ChangeEvent::FieldUpdated { cue, old, .. } => cue.restore(old.clone()),
            ChangeEvent::CueAdded(cue) => {
                if let Some(pos) = self.position(cue) {
                    self.cues.remove(pos);
                }
            }
            // The event proves the cue was valid when it was removed.
            ChangeEvent::CueRemoved(cue) => self.cues.push(cue.clone()),
        }
        Some(event)
    }

    /// Undo until the log is empty. Returns how many changes were reverted.
    pub fn reset(&mut self) -> usize {
        let mut reverted = 0;
        while self.undo().is_some() {
            reverted += 1;
        }
        debug!("reset reverted {} changes", reverted);
        reverted
    }

    /// Read and parse the file at [`Subtitle::path`], appending its cues.
    /// A leading byte-order mark is ignored.
    pub fn parse(&mut self) -> Result<usize, SubtitleError> {
        trace!("parse path={}", self.path.display());
        let content = fs::read_to_string(&self.path).map_err(|source| SubtitleError::Read {
            path: self.path.clone(),
            source,
        })?;
        let count = self.parse_str(&content)?;
        info!("parsed {} cues from {}", count, self.path.display());
        Ok(count)
    }

    /// Parse SubRip text, appending its cues. Returns the number of cues added.
    pub fn parse_str(&mut self, content: &str) -> Result<usize, ParseError> {
        srt::parser::parse_into(self, content)
    }

    /// Sort the cues by (start, end) and report every cue with problems.
    ///
    /// With `try_fix` wrong ids are renumbered through the logged setters, so
    /// they can be undone. The sort itself is not logged: undo does not bring
    /// back the previous order.
    pub fn validate(&mut self, try_fix: bool) -> Vec<ValidationReport> {
        validate::validate(&mut self.cues, try_fix)
    }

    /// Render the current collection as SubRip text.
    pub fn to_srt(&self) -> String {
        srt::format(&self.cues)
    }

    /// Write the current collection to `path` in SubRip format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SubtitleError> {
        let path = path.as_ref();
        fs::write(path, self.to_srt()).map_err(|source| SubtitleError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("wrote {} cues to {}", self.cues.len(), path.display());
        Ok(())
    }

    fn position(&self, cue: &Cue) -> Option<usize> {
        self.cues.iter().position(|member| member.is_same(cue))
    }
}

impl<'a> IntoIterator for &'a Subtitle {
    type Item = &'a Cue;
    type IntoIter = std::slice::Iter<'a, Cue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.iter()
    }
}

impl fmt::Display for Subtitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cue) in self.cues.iter().enumerate() {
            if i > 0 {
                f.write_str("\n\n")?;
            }
            write!(f, "{cue}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Subtitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subtitle")
            .field("path", &self.path)
            .field("cues", &self.cues)
            .field("history", &self.log.len())
            .finish()
    }
}
