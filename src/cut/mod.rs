// Two-phase selection state machine.
//
// A cut-key press either performs a cut (new selection) or signals a
// repeat (same selection as last time), which the orchestrator turns into
// the secondary-action menu. Selections compare as sets: order and
// duplicates are irrelevant, and a failed or empty query is the same as an
// empty selection.

use crate::finder::FinderBridge;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Observer invoked whenever the pending cut list changes.
pub type CutObserver = Box<dyn Fn(&[PathBuf]) + Send>;

/// Result of handling a cut-key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutOutcome {
    /// Nothing selected (or the query failed, or nothing still exists).
    NoSelection,
    /// A new selection was cut; this many files are pending a move.
    Cut(usize),
    /// The same selection was cut again; the caller should offer the
    /// secondary-action menu. The pending cut list is untouched.
    Repeat(Vec<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasteError {
    #[error("no files pending move")]
    NothingToMove,
    #[error("target folder is unavailable")]
    NoTarget,
    /// The bridge refused the move; the text comes from the host
    /// application and the cut list is kept so the user can retry.
    #[error("move failed: {0}")]
    MoveFailed(String),
}

pub struct CutManager<B> {
    bridge: B,
    cut_files: Vec<PathBuf>,
    /// Selection observed on the previous cut-key press. Overwritten on
    /// every cut() call, including failed ones, so two identical failures
    /// never read as a repeat.
    last_selection: HashSet<PathBuf>,
    observer: Option<CutObserver>,
}

impl<B: FinderBridge> CutManager<B> {
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            cut_files: Vec::new(),
            last_selection: HashSet::new(),
            observer: None,
        }
    }

    /// Register an observer for pending-cut-list changes (count badge,
    /// paste-key gating).
    pub fn set_observer(&mut self, observer: CutObserver) {
        self.observer = Some(observer);
    }

    pub fn has_cut_files(&self) -> bool {
        !self.cut_files.is_empty()
    }

    pub fn cut_files(&self) -> &[PathBuf] {
        &self.cut_files
    }

    /// Handle a cut-key press.
    pub fn cut(&mut self) -> CutOutcome {
        let raw = match self.bridge.selection() {
            Ok(paths) => paths,
            Err(e) => {
                crate::warn!("selection query failed: {e}");
                Vec::new()
            }
        };
        if raw.is_empty() {
            self.last_selection.clear();
            return CutOutcome::NoSelection;
        }

        let mut seen = HashSet::new();
        let existing: Vec<PathBuf> = raw
            .into_iter()
            .filter(|p| p.exists() && seen.insert(p.clone()))
            .collect();
        if existing.is_empty() {
            crate::debug!("selection contains no existing files");
            self.last_selection.clear();
            return CutOutcome::NoSelection;
        }

        let current: HashSet<PathBuf> = existing.iter().cloned().collect();
        let repeated = current == self.last_selection;
        self.last_selection = current;

        if repeated {
            crate::debug!("same selection cut twice");
            return CutOutcome::Repeat(existing);
        }

        self.cut_files = existing;
        self.notify_observer();
        CutOutcome::Cut(self.cut_files.len())
    }

    /// Handle a paste-key press: move every pending file into the host's
    /// current folder. Success clears the cut list; failure keeps it.
    pub fn paste(&mut self) -> Result<usize, PasteError> {
        if self.cut_files.is_empty() {
            return Err(PasteError::NothingToMove);
        }

        let target = self
            .bridge
            .current_folder()
            .map_err(|e| {
                crate::warn!("target folder query failed: {e}");
                PasteError::NoTarget
            })?;
        if !target.exists() {
            return Err(PasteError::NoTarget);
        }

        self.move_to(&target)
    }

    fn move_to(&mut self, target: &Path) -> Result<usize, PasteError> {
        self.bridge
            .move_items(&self.cut_files, target)
            .map_err(|e| PasteError::MoveFailed(e.to_string()))?;
        let moved = self.cut_files.len();
        self.cut_files.clear();
        self.notify_observer();
        Ok(moved)
    }

    /// Drop the pending cut list unconditionally.
    pub fn clear(&mut self) {
        self.cut_files.clear();
        self.notify_observer();
    }

    /// Forget the previously observed selection, so the next cut of the
    /// same files is a fresh cut again. Used by the once-per-selection
    /// repeat policy after the secondary menu has been handled.
    pub fn reset_last_selection(&mut self) {
        self.last_selection.clear();
    }

    fn notify_observer(&self) {
        if let Some(observer) = &self.observer {
            observer(&self.cut_files);
        }
    }
}

#[cfg(test)]
#[path = "cut_test.rs"]
mod tests;
