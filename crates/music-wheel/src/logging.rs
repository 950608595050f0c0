/// Route `log` to the browser console and panics to `console.error`.
/// Safe to call more than once.
#[cfg(target_arch = "wasm32")]
pub fn init(level: log::Level) {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(level).is_err() {
        log::debug!("console logger already installed");
    }
}

/// Host builds leave logging to whoever embeds the crate.
#[cfg(not(target_arch = "wasm32"))]
pub fn init(_level: log::Level) {}
