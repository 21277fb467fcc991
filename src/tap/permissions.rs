// Accessibility permission handling.
//
// CGEventTap only delivers events to processes trusted for input
// monitoring, so startup gates on AXIsProcessTrusted and polls until the
// user grants access. On other platforms these are inert stubs so the
// platform-neutral logic can still build and test.

#[cfg(target_os = "macos")]
mod macos {
    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrusted() -> bool;
        fn AXIsProcessTrustedWithOptions(options: *const std::ffi::c_void) -> bool;
    }

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        fn CFDictionaryCreate(
            allocator: *const std::ffi::c_void,
            keys: *const *const std::ffi::c_void,
            values: *const *const std::ffi::c_void,
            num_values: isize,
            key_callbacks: *const std::ffi::c_void,
            value_callbacks: *const std::ffi::c_void,
        ) -> *const std::ffi::c_void;

        fn CFRelease(cf: *const std::ffi::c_void);

        static kCFTypeDictionaryKeyCallBacks: std::ffi::c_void;
        static kCFTypeDictionaryValueCallBacks: std::ffi::c_void;
        static kCFBooleanTrue: *const std::ffi::c_void;
        static kAXTrustedCheckOptionPrompt: *const std::ffi::c_void;
    }

    pub fn is_process_trusted() -> bool {
        // SAFETY: plain permission query with no arguments.
        unsafe { AXIsProcessTrusted() }
    }

    /// Ask the OS to show its "allow this app" prompt. The app ends up in
    /// the Accessibility list disabled; the user still has to flip it on.
    pub fn request_trust_prompt() -> bool {
        unsafe {
            let keys = [kAXTrustedCheckOptionPrompt];
            let values = [kCFBooleanTrue];
            let options = CFDictionaryCreate(
                std::ptr::null(),
                keys.as_ptr(),
                values.as_ptr(),
                1,
                &kCFTypeDictionaryKeyCallBacks,
                &kCFTypeDictionaryValueCallBacks,
            );
            let trusted = AXIsProcessTrustedWithOptions(options);
            if !options.is_null() {
                CFRelease(options);
            }
            trusted
        }
    }

    pub fn open_accessibility_settings() -> std::io::Result<()> {
        std::process::Command::new("open")
            .arg("x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility")
            .spawn()
            .map(|_| ())
    }
}

#[cfg(target_os = "macos")]
pub use macos::{is_process_trusted, open_accessibility_settings, request_trust_prompt};

#[cfg(not(target_os = "macos"))]
pub fn is_process_trusted() -> bool {
    true
}

#[cfg(not(target_os = "macos"))]
pub fn request_trust_prompt() -> bool {
    true
}

#[cfg(not(target_os = "macos"))]
pub fn open_accessibility_settings() -> std::io::Result<()> {
    Ok(())
}
