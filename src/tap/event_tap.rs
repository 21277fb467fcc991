// CGEventTap-based key interception for macOS.
//
// The tap runs on its own thread inside a CFRunLoop. The OS can silently
// disable a tap (kCGEventTapDisabledByTimeout, typically after a modal
// dialog stalls event delivery); a disabled tap object cannot be revived
// reliably, so recovery destroys the CFMachPort and creates a fresh one.
// The run loop is driven in short slices so recreate requests from other
// threads are picked up promptly.

use super::{HookError, KeyEvent, TapControl, TapDecision, TapHandler};
use core_foundation::base::TCFType;
use core_foundation::mach_port::{CFMachPort, CFMachPortRef};
use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop, CFRunLoopStop};
use core_graphics::event::{
    CGEvent, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventTapProxy,
    CGEventType, EventField,
};
use foreign_types::ForeignType;
use parking_lot::Mutex;
use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// CGEventFlags bit masks.
const FLAG_MASK_SHIFT: u64 = 0x0002_0000;
const FLAG_MASK_CONTROL: u64 = 0x0004_0000;
const FLAG_MASK_OPTION: u64 = 0x0008_0000;
const FLAG_MASK_COMMAND: u64 = 0x0010_0000;

// Raw CGEventType values the callback cares about.
const EVENT_TYPE_KEY_DOWN: u32 = 10;
const EVENT_TYPE_TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFF_FFFE;
const EVENT_TYPE_TAP_DISABLED_BY_USER_INPUT: u32 = 0xFFFF_FFFF;

/// How long the run loop runs per slice before checking control flags.
const RUN_LOOP_SLICE: Duration = Duration::from_millis(250);

type CGEventMask = u64;

type CGEventTapCallBackInternal = unsafe extern "C" fn(
    proxy: CGEventTapProxy,
    event_type: CGEventType,
    event: *mut c_void,
    user_info: *mut c_void,
) -> *mut c_void;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: CGEventTapLocation,
        place: CGEventTapPlacement,
        options: CGEventTapOptions,
        events_of_interest: CGEventMask,
        callback: CGEventTapCallBackInternal,
        user_info: *mut c_void,
    ) -> CFMachPortRef;

    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);

    fn CGEventTapIsEnabled(tap: CFMachPortRef) -> bool;
}

/// State shared between the public handle, the tap thread, and the callback.
struct TapShared {
    /// True from start() until stop; the loop thread exits when cleared.
    running: AtomicBool,
    /// Set by the callback (tap-disabled notification) or by
    /// ensure_enabled(); the loop thread recreates the tap when it sees it.
    recreate: AtomicBool,
    /// True while a created, enabled tap object is installed.
    healthy: AtomicBool,
    /// Bumped after every create/recreate attempt completes.
    generation: AtomicU64,
    handler: Mutex<Option<TapHandler>>,
    run_loop: Mutex<Option<CFRunLoop>>,
    /// Raw CFMachPortRef of the installed tap, 0 when none. The port is
    /// owned by the loop thread; this is only dereferenced for a
    /// CGEventTapIsEnabled query while the entry is non-zero.
    port: Mutex<usize>,
}

/// Handle to the global event tap.
pub struct EventTap {
    shared: Arc<TapShared>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl EventTap {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(TapShared {
                running: AtomicBool::new(false),
                recreate: AtomicBool::new(false),
                healthy: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                handler: Mutex::new(None),
                run_loop: Mutex::new(None),
                port: Mutex::new(0),
            }),
            thread: Mutex::new(None),
        }
    }

    /// Create the tap, install it in a dedicated run loop thread, and
    /// enable it. Blocks briefly until the first creation attempt settles.
    pub fn start(&mut self, handler: TapHandler) -> Result<(), HookError> {
        if self.shared.running.load(Ordering::SeqCst) {
            return Err(HookError::AlreadyRunning);
        }
        if !super::permissions::is_process_trusted() {
            return Err(HookError::PermissionDenied);
        }

        *self.shared.handler.lock() = Some(handler);
        self.shared.running.store(true, Ordering::SeqCst);
        self.shared.generation.store(0, Ordering::SeqCst);

        let shared = self.shared.clone();
        let handle = thread::spawn(move || run_tap_loop(shared));
        *self.thread.lock() = Some(handle);

        // Wait for the loop thread to report its first creation attempt.
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.shared.generation.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if self.shared.healthy.load(Ordering::SeqCst) {
            crate::info!("event tap started");
            Ok(())
        } else {
            self.request_stop();
            Err(HookError::CreationFailed)
        }
    }

    /// Stop the tap and join its thread. Idempotent; safe from any thread.
    pub fn request_stop(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(run_loop) = self.shared.run_loop.lock().as_ref() {
            unsafe { CFRunLoopStop(run_loop.as_concrete_TypeRef()) };
        }
        if let Some(handle) = self.thread.lock().take() {
            let deadline = Instant::now() + Duration::from_secs(2);
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
        *self.shared.handler.lock() = None;
        *self.shared.run_loop.lock() = None;
        self.shared.healthy.store(false, Ordering::SeqCst);
        crate::info!("event tap stopped");
    }
}

impl TapControl for EventTap {
    fn ensure_enabled(&self) -> bool {
        if !self.shared.running.load(Ordering::SeqCst) {
            return false;
        }
        // Re-assert first: a tap that is still installed and enabled does
        // not get torn down. Rebuild only when the OS reports it dead.
        {
            let port = self.shared.port.lock();
            if *port != 0
                && self.shared.healthy.load(Ordering::SeqCst)
                && unsafe { CGEventTapIsEnabled(*port as CFMachPortRef) }
            {
                return true;
            }
        }
        let before = self.shared.generation.load(Ordering::SeqCst);
        self.shared.recreate.store(true, Ordering::SeqCst);
        if let Some(run_loop) = self.shared.run_loop.lock().as_ref() {
            unsafe { CFRunLoopStop(run_loop.as_concrete_TypeRef()) };
        }
        // Wait for the loop thread to complete the recreate attempt.
        let deadline = Instant::now() + Duration::from_millis(500);
        while self.shared.generation.load(Ordering::SeqCst) == before && Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(10));
        }
        self.shared.healthy.load(Ordering::SeqCst)
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

impl Default for EventTap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventTap {
    fn drop(&mut self) {
        self.request_stop();
    }
}

/// Raw tap callback. Must never unwind into the OS; any panic in the
/// handler converts to pass-through.
unsafe extern "C" fn tap_callback(
    _proxy: CGEventTapProxy,
    event_type: CGEventType,
    event_ref: *mut c_void,
    user_info: *mut c_void,
) -> *mut c_void {
    let shared = &*(user_info as *const Arc<TapShared>);
    let raw_type = event_type as u32;

    if raw_type == EVENT_TYPE_TAP_DISABLED_BY_TIMEOUT
        || raw_type == EVENT_TYPE_TAP_DISABLED_BY_USER_INPUT
    {
        // Re-enabling a timed-out tap is a silent no-op; schedule a rebuild.
        shared.healthy.store(false, Ordering::SeqCst);
        shared.recreate.store(true, Ordering::SeqCst);
        return event_ref;
    }

    if raw_type != EVENT_TYPE_KEY_DOWN {
        return event_ref;
    }

    let event = ManuallyDrop::new(CGEvent::from_ptr(event_ref as *mut _));
    let key_code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
    let flags = event.get_flags().bits();
    let key_event = KeyEvent {
        key_code,
        command: flags & FLAG_MASK_COMMAND != 0,
        shift: flags & FLAG_MASK_SHIFT != 0,
        option: flags & FLAG_MASK_OPTION != 0,
        control: flags & FLAG_MASK_CONTROL != 0,
    };

    let decision = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let guard = shared.handler.lock();
        match guard.as_ref() {
            Some(handler) => handler(&key_event),
            None => TapDecision::PassThrough,
        }
    }))
    .unwrap_or_else(|_| {
        crate::error!("tap handler panicked; passing event through");
        TapDecision::PassThrough
    });

    match decision {
        TapDecision::PassThrough => event_ref,
        TapDecision::Consume => std::ptr::null_mut(),
    }
}

/// Create the tap object and hand back the mach port. Null from the OS
/// means permission was revoked (or never granted).
fn create_tap(ctx: *mut c_void) -> Result<CFMachPort, HookError> {
    let event_mask: CGEventMask = 1 << EVENT_TYPE_KEY_DOWN as u64;
    let tap_ref = unsafe {
        CGEventTapCreate(
            CGEventTapLocation::Session,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::Default,
            event_mask,
            tap_callback,
            ctx,
        )
    };
    if tap_ref.is_null() {
        return Err(HookError::CreationFailed);
    }
    Ok(unsafe { CFMachPort::wrap_under_create_rule(tap_ref) })
}

fn run_tap_loop(shared: Arc<TapShared>) {
    // The callback context outlives every tap incarnation on this thread.
    let ctx = Box::into_raw(Box::new(shared.clone())) as *mut c_void;

    let run_loop = CFRunLoop::get_current();
    *shared.run_loop.lock() = Some(run_loop.clone());

    let mut installed = install_tap(&run_loop, &shared, ctx);
    shared.generation.fetch_add(1, Ordering::SeqCst);

    while shared.running.load(Ordering::SeqCst) {
        if installed.is_none() {
            // Nothing scheduled on the loop; avoid a busy spin while we
            // wait for the next recreate request.
            thread::sleep(Duration::from_millis(50));
        } else {
            CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, RUN_LOOP_SLICE, false);
        }

        if shared.recreate.swap(false, Ordering::SeqCst) && shared.running.load(Ordering::SeqCst) {
            crate::warn!("event tap disabled by the OS; recreating");
            if let Some((port, source)) = installed.take() {
                *shared.port.lock() = 0;
                unsafe { CGEventTapEnable(port.as_concrete_TypeRef(), false) };
                run_loop.remove_source(&source, unsafe { kCFRunLoopDefaultMode });
            }
            installed = install_tap(&run_loop, &shared, ctx);
            shared.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    if let Some((port, source)) = installed.take() {
        *shared.port.lock() = 0;
        unsafe { CGEventTapEnable(port.as_concrete_TypeRef(), false) };
        run_loop.remove_source(&source, unsafe { kCFRunLoopDefaultMode });
    }
    shared.healthy.store(false, Ordering::SeqCst);

    // SAFETY: ctx was leaked above and no tap referencing it remains.
    unsafe {
        drop(Box::from_raw(ctx as *mut Arc<TapShared>));
    }
}

type InstalledTap = (CFMachPort, core_foundation::runloop::CFRunLoopSource);

fn install_tap(
    run_loop: &CFRunLoop,
    shared: &Arc<TapShared>,
    ctx: *mut c_void,
) -> Option<InstalledTap> {
    match create_tap(ctx) {
        Ok(port) => match port.create_runloop_source(0) {
            Ok(source) => {
                run_loop.add_source(&source, unsafe { kCFRunLoopDefaultMode });
                unsafe { CGEventTapEnable(port.as_concrete_TypeRef(), true) };
                *shared.port.lock() = port.as_concrete_TypeRef() as usize;
                shared.healthy.store(true, Ordering::SeqCst);
                Some((port, source))
            }
            Err(_) => {
                crate::error!("failed to create run loop source for the event tap");
                shared.healthy.store(false, Ordering::SeqCst);
                None
            }
        },
        Err(e) => {
            crate::error!("event tap creation failed: {e}");
            shared.healthy.store(false, Ordering::SeqCst);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_enabled_on_a_stopped_tap_reports_dead() {
        let tap = EventTap::new();
        assert!(!tap.ensure_enabled());
        assert!(!tap.is_running());
    }

    #[test]
    fn request_stop_before_start_is_a_no_op() {
        let tap = EventTap::new();
        tap.request_stop();
        tap.request_stop();
        assert!(!tap.is_running());
    }
}
