pub mod detector;

use crate::retry::{run_schedule, Sleeper};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard holds no text")]
    NoText,
}

/// Read side of the pasteboard. Split from the writer so the detector can
/// be tested against a scripted reader alone.
pub trait ClipboardReader: Send {
    fn get_text(&mut self) -> Result<String, ClipboardError>;
}

pub trait ClipboardWriter: Send {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// System pasteboard via `arboard`.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let inner =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl ClipboardReader for SystemClipboard {
    fn get_text(&mut self) -> Result<String, ClipboardError> {
        match self.inner.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Err(ClipboardError::NoText),
            Err(e) => Err(ClipboardError::Unavailable(e.to_string())),
        }
    }
}

impl ClipboardWriter for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner
            .set_text(text)
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

const STABLE_READ_DELAY: Duration = Duration::from_millis(30);
const STABLE_READ_ATTEMPTS: usize = 5;

/// Read the clipboard shortly after a copy keystroke. The pasteboard is
/// written asynchronously by the host application, so an early read can
/// still see the previous copy's text; a read only counts as settled once
/// two consecutive reads agree. An unconfirmed read is returned when the
/// schedule runs out, an empty pasteboard is retried.
pub fn stable_read<R>(reader: &mut R, sleeper: &dyn Sleeper) -> Option<String>
where
    R: ClipboardReader + ?Sized,
{
    let schedule = crate::retry::uniform_schedule(STABLE_READ_ATTEMPTS, STABLE_READ_DELAY);
    let mut last: Option<String> = None;
    let settled = run_schedule(&schedule, sleeper, |_| {
        let current = match reader.get_text() {
            Ok(text) if !text.is_empty() => text,
            Ok(_) | Err(ClipboardError::NoText) => return None,
            Err(e) => {
                crate::trace!("clipboard read failed: {e}");
                return None;
            }
        };
        if last.as_deref() == Some(current.as_str()) {
            return Some(current);
        }
        last = Some(current);
        None
    });
    settled.or(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::test_support::RecordingSleeper;
    use std::collections::VecDeque;

    struct ScriptedReader {
        replies: VecDeque<Result<String, ClipboardError>>,
    }

    impl ScriptedReader {
        fn new(replies: Vec<Result<String, ClipboardError>>) -> Self {
            Self {
                replies: replies.into_iter().collect(),
            }
        }
    }

    impl ClipboardReader for ScriptedReader {
        fn get_text(&mut self) -> Result<String, ClipboardError> {
            self.replies.pop_front().unwrap_or(Err(ClipboardError::NoText))
        }
    }

    #[test]
    fn stable_read_settles_on_two_matching_reads() {
        let mut reader = ScriptedReader::new(vec![Ok("hello".into()), Ok("hello".into())]);
        let sleeper = RecordingSleeper::default();
        assert_eq!(stable_read(&mut reader, &sleeper), Some("hello".into()));
        assert_eq!(sleeper.slept.lock().len(), 1);
    }

    #[test]
    fn stable_read_waits_out_stale_pasteboard_content() {
        // The first read races the host's write and still sees the
        // previous copy; the settled value wins.
        let mut reader = ScriptedReader::new(vec![
            Ok("previous copy".into()),
            Ok("fresh copy".into()),
            Ok("fresh copy".into()),
        ]);
        let sleeper = RecordingSleeper::default();
        assert_eq!(stable_read(&mut reader, &sleeper), Some("fresh copy".into()));
    }

    #[test]
    fn stable_read_retries_past_empty_pasteboard() {
        let mut reader = ScriptedReader::new(vec![
            Err(ClipboardError::NoText),
            Ok(String::new()),
            Ok("late".into()),
            Ok("late".into()),
        ]);
        let sleeper = RecordingSleeper::default();
        assert_eq!(stable_read(&mut reader, &sleeper), Some("late".into()));
        assert_eq!(sleeper.slept.lock().len(), 3);
    }

    #[test]
    fn stable_read_returns_an_unconfirmed_read_when_time_runs_out() {
        let mut reader = ScriptedReader::new(vec![Ok("hello".into())]);
        let sleeper = RecordingSleeper::default();
        assert_eq!(stable_read(&mut reader, &sleeper), Some("hello".into()));
        // The schedule was exhausted waiting for confirmation.
        assert_eq!(sleeper.slept.lock().len(), STABLE_READ_ATTEMPTS - 1);
    }

    #[test]
    fn stable_read_gives_up_after_schedule() {
        let mut reader = ScriptedReader::new(Vec::new());
        let sleeper = RecordingSleeper::default();
        assert_eq!(stable_read(&mut reader, &sleeper), None);
    }
}
