// Scripting bridge to the host file manager.
//
// All Finder interaction is a synchronous request/response with a bounded
// timeout; a timed-out or failed call is treated as "no result" by the
// callers, never retried here.

mod osascript;

pub use osascript::OsaScriptBridge;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for selection/folder queries.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for batch move commands.
pub const MOVE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("script timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to launch osascript: {0}")]
    Spawn(#[from] std::io::Error),
    /// The host application reported an error; the text is user-facing.
    #[error("{0}")]
    Script(String),
    #[error("script produced non-UTF-8 output")]
    Utf8,
}

/// Synchronous, timeout-bounded commands against the host file manager.
pub trait FinderBridge: Send {
    /// The current selection as absolute paths; empty when nothing is
    /// selected.
    fn selection(&self) -> Result<Vec<PathBuf>, BridgeError>;

    /// The folder a paste should land in (insertion location, falling back
    /// to the front window's target, falling back to the desktop).
    fn current_folder(&self) -> Result<PathBuf, BridgeError>;

    /// Move `items` into `target` as one batch operation.
    fn move_items(&self, items: &[PathBuf], target: &Path) -> Result<(), BridgeError>;
}
