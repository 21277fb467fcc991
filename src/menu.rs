// Secondary-action seam. When the same selection is cut twice the
// orchestrator offers these actions through a collaborator-rendered menu;
// the menu itself (a modal alert) lives outside this crate, so the default
// implementation declines and the copy-paths action is handled in-process.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatAction {
    /// Put the newline-joined absolute paths on the clipboard.
    CopyPaths,
    /// Archive the selection (external collaborator).
    Compress,
    /// Extract the selection (external collaborator).
    Decompress,
}

/// Presents the repeated-cut menu for the given files and reports the
/// user's choice, or `None` when cancelled or no menu is available.
///
/// Presenting is modal: the caller must run the tap recovery burst after
/// every call, whatever the outcome.
pub trait RepeatMenu: Send {
    fn present(&self, files: &[PathBuf]) -> Option<RepeatAction>;
}

/// Handles the archive actions a menu may choose. Returns a short
/// human-readable status for the notification sink.
pub trait RepeatActionHandler: Send {
    fn run(&self, action: RepeatAction, files: &[PathBuf]) -> Result<String, String>;
}

/// Default menu when no collaborator UI is wired in: always cancelled.
pub struct DecliningMenu;

impl RepeatMenu for DecliningMenu {
    fn present(&self, _files: &[PathBuf]) -> Option<RepeatAction> {
        None
    }
}

/// Newline-joined path list for the copy-paths action.
pub fn format_paths(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_paths_joins_with_newlines() {
        let files = vec![PathBuf::from("/tmp/a.txt"), PathBuf::from("/tmp/b c.txt")];
        assert_eq!(format_paths(&files), "/tmp/a.txt\n/tmp/b c.txt");
    }

    #[test]
    fn single_path_has_no_trailing_newline() {
        assert_eq!(format_paths(&[PathBuf::from("/tmp/a")]), "/tmp/a");
    }

    #[test]
    fn declining_menu_always_cancels() {
        let menu = DecliningMenu;
        assert_eq!(menu.present(&[PathBuf::from("/tmp/a")]), None);
    }
}
