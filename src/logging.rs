//! Logging bootstrap and payload truncation.
//!
//! The library itself only emits `tracing` events; binaries and tests call
//! [`init_tracing`] to install a subscriber. `RUST_LOG` overrides the default
//! `info` level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default cap for logged request/response payloads.
pub const MAX_LOG_PAYLOAD: usize = 5 * 1024;

const TRUNCATED_MARKER: &str = "...[TRUNCATED]";

/// Install a fmt subscriber filtered by `RUST_LOG`. Safe to call repeatedly;
/// only the first call has an effect.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Cap `text` at `max` bytes (on a char boundary), appending a marker when cut.
pub fn truncate_for_log(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &text[..end], TRUNCATED_MARKER)
}

/// [`truncate_for_log`] with [`MAX_LOG_PAYLOAD`].
pub fn payload(text: &str) -> String {
    truncate_for_log(text, MAX_LOG_PAYLOAD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_for_log("hello", 10), "hello");
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let out = truncate_for_log("ééé", 3);
        assert_eq!(out, "é...[TRUNCATED]");
        assert_eq!(payload(&"x".repeat(6000)).len(), MAX_LOG_PAYLOAD + TRUNCATED_MARKER.len());
    }

    #[test]
    fn init_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
