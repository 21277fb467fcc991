// osascript-backed FinderBridge.
//
// `std::process::Command` has no deadline, so the child is polled with
// try_wait and killed when the budget runs out. Output is only collected
// after the child exits.

use super::{BridgeError, FinderBridge, MOVE_TIMEOUT, QUERY_TIMEOUT};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub struct OsaScriptBridge {
    query_timeout: Duration,
    move_timeout: Duration,
}

impl OsaScriptBridge {
    pub fn new() -> Self {
        Self {
            query_timeout: QUERY_TIMEOUT,
            move_timeout: MOVE_TIMEOUT,
        }
    }

    fn run_script(&self, script: &str, timeout: Duration) -> Result<String, BridgeError> {
        let mut child = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait()? {
                Some(_) => break,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BridgeError::Timeout(timeout));
                }
                None => std::thread::sleep(POLL_INTERVAL),
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(BridgeError::Script(stderr));
        }
        let stdout = String::from_utf8(output.stdout).map_err(|_| BridgeError::Utf8)?;
        Ok(stdout.trim().to_string())
    }
}

impl Default for OsaScriptBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl FinderBridge for OsaScriptBridge {
    fn selection(&self) -> Result<Vec<PathBuf>, BridgeError> {
        let script = r#"tell application "Finder"
    set selectedItems to selection
    set pathList to {}
    repeat with itemRef in selectedItems
        set itemPath to POSIX path of (itemRef as alias)
        copy itemPath to end of pathList
    end repeat
    return pathList
end tell"#;
        let output = self.run_script(script, self.query_timeout)?;
        Ok(parse_path_list(&output))
    }

    fn current_folder(&self) -> Result<PathBuf, BridgeError> {
        let script = r#"tell application "Finder"
    try
        return POSIX path of (insertion location as alias)
    on error
        try
            if (count of windows) = 0 then return POSIX path of (path to desktop)
            return POSIX path of (target of front window as alias)
        on error
            return POSIX path of (path to desktop)
        end try
    end try
end tell"#;
        let output = self.run_script(script, self.query_timeout)?;
        if output.is_empty() {
            return Err(BridgeError::Script("no target folder reported".to_string()));
        }
        Ok(PathBuf::from(output))
    }

    fn move_items(&self, items: &[PathBuf], target: &Path) -> Result<(), BridgeError> {
        let file_list = items
            .iter()
            .map(|p| format!("POSIX file \"{}\"", escape_path(&p.to_string_lossy())))
            .collect::<Vec<_>>()
            .join(", ");
        let script = format!(
            r#"tell application "Finder"
    try
        move {{{file_list}}} to POSIX file "{target}"
        return "OK"
    on error e
        return "Error: " & e
    end try
end tell"#,
            target = escape_path(&target.to_string_lossy()),
        );
        let output = self.run_script(&script, self.move_timeout)?;
        if output == "OK" {
            Ok(())
        } else {
            Err(BridgeError::Script(output))
        }
    }
}

/// Escape a path for embedding in a double-quoted AppleScript literal.
fn escape_path(path: &str) -> String {
    path.replace('\\', "\\\\").replace('"', "\\\"")
}

/// AppleScript renders a path list as a single `", "`-separated line.
fn parse_path_list(output: &str) -> Vec<PathBuf> {
    if output.is_empty() {
        return Vec::new();
    }
    output
        .split(", ")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_path_handles_quotes_and_backslashes() {
        assert_eq!(escape_path(r#"/a/b"c"#), r#"/a/b\"c"#);
        assert_eq!(escape_path(r"/a\b"), r"/a\\b");
        assert_eq!(escape_path("/plain/path"), "/plain/path");
    }

    #[test]
    fn parse_path_list_splits_on_comma_space() {
        let paths = parse_path_list("/Users/a/f1.txt, /Users/a/f2.txt");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/Users/a/f1.txt"),
                PathBuf::from("/Users/a/f2.txt")
            ]
        );
    }

    #[test]
    fn parse_path_list_empty_output_is_no_selection() {
        assert!(parse_path_list("").is_empty());
    }

    #[test]
    fn parse_path_list_single_path() {
        assert_eq!(
            parse_path_list("/Users/a/f1.txt"),
            vec![PathBuf::from("/Users/a/f1.txt")]
        );
    }
}
