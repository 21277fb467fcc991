// Foreground application gate.
//
// Cut/paste handling is scoped to the host file manager; the gate answers
// "is the host frontmost?" from inside the tap callback, so the query must
// be cheap and must never block.

use std::sync::Arc;

/// Source of the frontmost application's bundle identifier.
pub trait FrontmostApps: Send + Sync {
    fn frontmost_bundle_id(&self) -> Option<String>;
}

/// Gate comparing the frontmost application against a fixed host id.
pub struct FocusGate {
    apps: Arc<dyn FrontmostApps>,
    host_bundle_id: String,
}

impl FocusGate {
    pub fn new(apps: Arc<dyn FrontmostApps>, host_bundle_id: String) -> Self {
        Self {
            apps,
            host_bundle_id,
        }
    }

    pub fn is_host_active(&self) -> bool {
        match self.apps.frontmost_bundle_id() {
            Some(id) => id == self.host_bundle_id,
            None => false,
        }
    }
}

/// NSWorkspace-backed implementation.
pub struct WorkspaceApps;

#[cfg(target_os = "macos")]
impl FrontmostApps for WorkspaceApps {
    fn frontmost_bundle_id(&self) -> Option<String> {
        unsafe { frontmost_bundle_id_impl() }
    }
}

#[cfg(not(target_os = "macos"))]
impl FrontmostApps for WorkspaceApps {
    fn frontmost_bundle_id(&self) -> Option<String> {
        None
    }
}

#[cfg(target_os = "macos")]
#[allow(deprecated)]
unsafe fn frontmost_bundle_id_impl() -> Option<String> {
    use cocoa::base::{id, nil};
    use cocoa::foundation::NSString;
    use objc::{class, msg_send, sel, sel_impl};

    let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
    if workspace == nil {
        return None;
    }
    let app: id = msg_send![workspace, frontmostApplication];
    if app == nil {
        return None;
    }
    let bundle_id: id = msg_send![app, bundleIdentifier];
    if bundle_id == nil {
        return None;
    }
    let cstr: *const std::os::raw::c_char = NSString::UTF8String(bundle_id);
    if cstr.is_null() {
        return None;
    }
    Some(std::ffi::CStr::from_ptr(cstr).to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedApp(Option<&'static str>);

    impl FrontmostApps for FixedApp {
        fn frontmost_bundle_id(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn host_frontmost_is_active() {
        let gate = FocusGate::new(
            Arc::new(FixedApp(Some("com.apple.finder"))),
            "com.apple.finder".to_string(),
        );
        assert!(gate.is_host_active());
    }

    #[test]
    fn other_app_is_not_active() {
        let gate = FocusGate::new(
            Arc::new(FixedApp(Some("com.apple.Terminal"))),
            "com.apple.finder".to_string(),
        );
        assert!(!gate.is_host_active());
    }

    #[test]
    fn unknown_frontmost_is_not_active() {
        let gate = FocusGate::new(Arc::new(FixedApp(None)), "com.apple.finder".to_string());
        assert!(!gate.is_host_active());
    }
}
