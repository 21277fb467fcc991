// Orchestrator. One channel, one thread owning all mutable cut and
// clipboard state; the tap callback and background workers only ever send
// events into it.

pub mod recovery;

use crate::clipboard::detector::{CopyVerdict, DoubleCopyDetector};
use crate::clipboard::{stable_read, ClipboardReader, ClipboardWriter};
use crate::config::{RepeatPolicy, Settings};
use crate::cut::{CutManager, CutOutcome, PasteError};
use crate::finder::FinderBridge;
use crate::focus::FocusGate;
use crate::menu::{self, DecliningMenu, RepeatAction, RepeatActionHandler, RepeatMenu};
use crate::notify::{NotificationSink, NullNotifier};
use crate::processor::{Action, ContentProcessor, ProcessorError};
use crate::retry::{Sleeper, ThreadSleeper};
use crate::tap::{classify, Hotkey, KeyEvent, KeyMap, TapDecision};
use recovery::TapRecovery;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

/// Events marshaled onto the orchestrator thread.
#[derive(Debug)]
pub enum AppEvent {
    CutKey,
    PasteKey,
    CopyKey,
    ProcessorFinished {
        action: Action,
        result: Result<String, ProcessorError>,
    },
    Shutdown,
}

/// Build the tap callback. It classifies, decides consume/pass-through
/// from fast state only, and enqueues; bridge and network work happen on
/// the orchestrator thread.
pub fn make_tap_handler(
    keys: KeyMap,
    gate: FocusGate,
    pending_cuts: Arc<AtomicUsize>,
    tx: Sender<AppEvent>,
) -> impl Fn(&KeyEvent) -> TapDecision + Send + 'static {
    move |event| match classify(event, &keys) {
        Some(Hotkey::Cut) => {
            if gate.is_host_active() {
                let _ = tx.send(AppEvent::CutKey);
                TapDecision::Consume
            } else {
                TapDecision::PassThrough
            }
        }
        Some(Hotkey::Paste) => {
            // Only swallow Cmd+V when there is actually something to move;
            // otherwise the host keeps its native paste.
            if gate.is_host_active() && pending_cuts.load(Ordering::SeqCst) > 0 {
                let _ = tx.send(AppEvent::PasteKey);
                TapDecision::Consume
            } else {
                TapDecision::PassThrough
            }
        }
        Some(Hotkey::Copy) => {
            // Copy is observed everywhere and never consumed.
            let _ = tx.send(AppEvent::CopyKey);
            TapDecision::PassThrough
        }
        None => TapDecision::PassThrough,
    }
}

pub struct Orchestrator<B> {
    settings: Settings,
    cut: CutManager<B>,
    detector: DoubleCopyDetector,
    recovery: TapRecovery,
    tx: Sender<AppEvent>,
    notifier: Arc<dyn NotificationSink>,
    reader: Option<Box<dyn ClipboardReader>>,
    writer: Option<Box<dyn ClipboardWriter>>,
    processor: Option<Arc<dyn ContentProcessor>>,
    menu: Box<dyn RepeatMenu>,
    action_handler: Option<Box<dyn RepeatActionHandler>>,
    sleeper: Arc<dyn Sleeper>,
}

impl<B: FinderBridge> Orchestrator<B> {
    pub fn new(
        settings: Settings,
        bridge: B,
        recovery: TapRecovery,
        tx: Sender<AppEvent>,
        pending_cuts: Arc<AtomicUsize>,
    ) -> Self {
        let mut cut = CutManager::new(bridge);
        cut.set_observer(Box::new(move |files| {
            pending_cuts.store(files.len(), Ordering::SeqCst);
        }));
        let detector = DoubleCopyDetector::new(&settings.detector);
        Self {
            settings,
            cut,
            detector,
            recovery,
            tx,
            notifier: Arc::new(NullNotifier),
            reader: None,
            writer: None,
            processor: None,
            menu: Box::new(DecliningMenu),
            action_handler: None,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clipboard(
        mut self,
        reader: Box<dyn ClipboardReader>,
        writer: Box<dyn ClipboardWriter>,
    ) -> Self {
        self.reader = Some(reader);
        self.writer = Some(writer);
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn ContentProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn with_menu(mut self, menu: Box<dyn RepeatMenu>) -> Self {
        self.menu = menu;
        self
    }

    pub fn with_action_handler(mut self, handler: Box<dyn RepeatActionHandler>) -> Self {
        self.action_handler = Some(handler);
        self
    }

    #[cfg(test)]
    fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Drain events until shutdown. This is the single serialization point
    /// for all cut and clipboard state.
    pub fn run(&mut self, rx: Receiver<AppEvent>) {
        while let Ok(event) = rx.recv() {
            if !self.handle_event(event) {
                break;
            }
        }
    }

    /// Returns false once the loop should stop.
    fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::CutKey => self.handle_cut(),
            AppEvent::PasteKey => self.handle_paste(),
            AppEvent::CopyKey => self.handle_copy(),
            AppEvent::ProcessorFinished { action, result } => {
                self.handle_processor_result(action, result)
            }
            AppEvent::Shutdown => {
                crate::info!("shutdown requested");
                return false;
            }
        }
        true
    }

    fn handle_cut(&mut self) {
        match self.cut.cut() {
            CutOutcome::NoSelection => {
                crate::debug!("cut key with no usable selection");
            }
            CutOutcome::Cut(count) => {
                crate::info!("cut {count} file(s)");
                self.notifier
                    .notify("CommondX", &format!("Cut {count} file(s), Cmd+V to move"));
            }
            CutOutcome::Repeat(files) => self.handle_repeat(files),
        }
    }

    fn handle_repeat(&mut self, files: Vec<std::path::PathBuf>) {
        crate::info!("repeated cut of {} file(s), offering actions", files.len());
        let choice = self.menu.present(&files);
        match choice {
            Some(RepeatAction::CopyPaths) => self.copy_paths(&files),
            Some(action) => self.run_action(action, &files),
            None => crate::debug!("secondary action cancelled"),
        }
        // The menu is modal; the OS may have disabled the tap while it
        // was up.
        if !self.recovery.recover() {
            self.notifier.notify(
                "CommondX",
                "Key interception stopped working; re-grant accessibility access and restart",
            );
        }
        if self.settings.repeat_policy == RepeatPolicy::OncePerSelection {
            self.cut.reset_last_selection();
        }
    }

    fn copy_paths(&mut self, files: &[std::path::PathBuf]) {
        let joined = menu::format_paths(files);
        match &mut self.writer {
            Some(writer) => match writer.set_text(&joined) {
                Ok(()) => {
                    self.notifier
                        .notify("CommondX", &format!("Copied {} path(s)", files.len()));
                }
                Err(e) => crate::warn!("failed to copy paths: {e}"),
            },
            None => crate::warn!("no clipboard writer, cannot copy paths"),
        }
    }

    fn run_action(&mut self, action: RepeatAction, files: &[std::path::PathBuf]) {
        match &self.action_handler {
            Some(handler) => match handler.run(action, files) {
                Ok(status) => self.notifier.notify("CommondX", &status),
                Err(e) => {
                    crate::warn!("secondary action failed: {e}");
                    self.notifier.notify("CommondX", &e);
                }
            },
            None => {
                self.notifier
                    .notify("CommondX", "That action is not available");
            }
        }
    }

    fn handle_paste(&mut self) {
        match self.cut.paste() {
            Ok(count) => {
                crate::info!("moved {count} file(s)");
                self.notifier
                    .notify("CommondX", &format!("Moved {count} file(s)"));
            }
            Err(PasteError::NothingToMove) => {
                crate::debug!("paste key with no pending cut");
            }
            Err(PasteError::NoTarget) => {
                self.notifier
                    .notify("CommondX", "Could not determine the destination folder");
            }
            Err(PasteError::MoveFailed(message)) => {
                crate::warn!("move failed: {message}");
                self.notifier
                    .notify("CommondX", &format!("Move failed: {message}"));
            }
        }
    }

    fn handle_copy(&mut self) {
        let Some(reader) = &mut self.reader else {
            return;
        };
        let Some(content) = stable_read(reader.as_mut(), self.sleeper.as_ref()) else {
            crate::trace!("clipboard empty after copy");
            return;
        };
        match self.detector.observe(&content, Instant::now()) {
            CopyVerdict::Triggered(text) => self.dispatch_processor(text),
            verdict => crate::trace!(?verdict, "copy observed"),
        }
    }

    fn dispatch_processor(&mut self, content: String) {
        let Some(processor) = self.processor.clone() else {
            crate::debug!("double copy detected but no processor configured");
            self.detector.complete_trigger();
            return;
        };
        let action = self.settings.processor.action;
        crate::info!("double copy detected, dispatching {action:?}");
        self.notifier
            .notify("CommondX", &format!("{} in progress…", action.label()));
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = processor.process(action, &content);
            let _ = tx.send(AppEvent::ProcessorFinished { action, result });
        });
    }

    fn handle_processor_result(&mut self, action: Action, result: Result<String, ProcessorError>) {
        self.detector.complete_trigger();
        match result {
            Ok(answer) => {
                crate::info!("processor finished ({} chars)", answer.len());
                if let Some(writer) = &mut self.writer {
                    if let Err(e) = writer.set_text(&answer) {
                        crate::warn!("failed to place result on clipboard: {e}");
                    }
                }
                self.notifier.notify(
                    &format!("{} (copied to clipboard)", action.label()),
                    &truncate(&answer, 120),
                );
            }
            Err(e) => {
                crate::warn!("processor failed: {e}");
                self.notifier
                    .notify("CommondX", &format!("{} failed: {e}", action.label()));
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
