//! Console logging for the browser build.
//!
//! `tracing` is built with its `log` feature, so with no `tracing`
//! subscriber installed every event is forwarded as a `log` record and
//! `console_log` prints it with the matching console method.

/// Install the panic hook and the console logger. Later calls are no-ops.
pub fn init_logging() {
    console_error_panic_hook::set_once();
    // Err only when a logger is already installed.
    let _ = console_log::init_with_level(log::Level::Debug);
}
