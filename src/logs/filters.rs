//! Presentation-side filtering of streamed deployment logs.
//!
//! Filtering is a view concern: buffers keep every line, these predicates
//! only decide what gets rendered.

use regex::Regex;
use std::sync::OnceLock;

/// Technical implementation details hidden from users.
const HIDDEN_PATTERNS: &[&str] = &[
    "Fixing Docker socket permissions",
    "Docker daemon already running, fixing socket permissions",
    "permission denied while trying to connect",
    "Command execution failed",
    "Service account not available, using OAuth",
    "expires in 1 hour",
];

fn docker_layer_noise() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-f0-9]+: (Preparing|Waiting)$").unwrap()
    })
}

fn timestamp_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[\d{1,2}:\d{2}:\d{2} [AP]M\] ").unwrap()
    })
}

/// Whether a deployment log line should be rendered.
pub fn should_show(message: &str) -> bool {
    // Commands always show.
    if message.trim_start().starts_with('$') {
        return true;
    }
    // Success and completion lines always show.
    if message.contains('✅') || message.contains("successfully") || message.contains("complete") {
        return true;
    }
    if HIDDEN_PATTERNS.iter().any(|p| message.contains(p)) {
        return false;
    }
    // Docker "Preparing"/"Waiting" layer spam; pushed/exists lines still show.
    if docker_layer_noise().is_match(message) {
        return false;
    }
    true
}

/// Strip a `[H:MM:SS AM]`-style prefix for display.
pub fn clean_message(message: &str) -> String {
    timestamp_prefix().replace(message, "").into_owned()
}
