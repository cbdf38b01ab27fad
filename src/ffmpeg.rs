//! FFmpeg initialisation and log level configuration.
//!
//! FFmpeg has its own internal logging system, separate from the Rust
//! [`log`](https://crates.io/crates/log) crate. Corrupt or truncated uploads
//! make it print warnings to stderr for every failed seek, which is noisy
//! when the preview is best-effort anyway. [`set_decoder_log_level`] tunes
//! that output without importing `ffmpeg-next` directly.
//!
//! # Example
//!
//! ```no_run
//! use deepcheck::DecoderLogLevel;
//!
//! deepcheck::set_decoder_log_level(DecoderLogLevel::Error);
//! ```

use std::sync::OnceLock;

use ffmpeg_next::util::log::Level;

use crate::error::DeepcheckError;

/// FFmpeg internal log verbosity level, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderLogLevel {
    /// Print no output at all.
    Quiet,
    /// Unrecoverable errors only.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging output.
    Debug,
}

impl DecoderLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            DecoderLogLevel::Quiet => Level::Quiet,
            DecoderLogLevel::Fatal => Level::Fatal,
            DecoderLogLevel::Error => Level::Error,
            DecoderLogLevel::Warning => Level::Warning,
            DecoderLogLevel::Info => Level::Info,
            DecoderLogLevel::Debug => Level::Debug,
        }
    }

    /// Parse a command-line spelling such as `"warn"` or `"quiet"`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" | "off" => Some(DecoderLogLevel::Quiet),
            "fatal" => Some(DecoderLogLevel::Fatal),
            "error" => Some(DecoderLogLevel::Error),
            "warning" | "warn" => Some(DecoderLogLevel::Warning),
            "info" => Some(DecoderLogLevel::Info),
            "debug" => Some(DecoderLogLevel::Debug),
            _ => None,
        }
    }
}

/// Set the FFmpeg internal log verbosity level.
///
/// This controls what FFmpeg prints to stderr. It does **not** affect
/// Rust-side `log` crate output.
pub fn set_decoder_log_level(level: DecoderLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Initialise FFmpeg once per process.
pub(crate) fn ensure_initialized() -> Result<(), DeepcheckError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| ffmpeg_next::init().map_err(|error| error.to_string()))
        .clone()
        .map_err(|reason| DeepcheckError::Ffmpeg(format!("initialisation failed: {reason}")))
}

#[cfg(test)]
mod tests {
    use super::DecoderLogLevel;

    #[test]
    fn parse_log_level_aliases() {
        assert_eq!(DecoderLogLevel::parse("WARN"), Some(DecoderLogLevel::Warning));
        assert_eq!(DecoderLogLevel::parse("off"), Some(DecoderLogLevel::Quiet));
        assert_eq!(DecoderLogLevel::parse("trace"), None);
    }
}
