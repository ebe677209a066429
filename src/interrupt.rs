//! Signal handling for cooperative stream cancellation.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Global interrupt flag, registered once with SIGINT.
static INTERRUPT_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Register the SIGINT handler. Safe to call multiple times (only the first
/// call registers; subsequent calls are no-ops).
pub fn register_signal_handler() -> Result<()> {
    let flag = INTERRUPT_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false)));

    // First handler: set the flag on first Ctrl+C
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(flag))?;

    // Second handler: if the flag is already set (i.e. second Ctrl+C), force-exit
    let flag_clone = Arc::clone(flag);
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGINT, move || {
            if flag_clone.load(Ordering::SeqCst) {
                // Second Ctrl+C — hard exit
                std::process::exit(130);
            }
        })?;
    }

    Ok(())
}

/// Check whether the interrupt flag is set.
pub fn is_interrupted() -> bool {
    INTERRUPT_FLAG
        .get()
        .map(|f| f.load(Ordering::SeqCst))
        .unwrap_or(false)
}

/// Clear the interrupt flag so a follow-up command starts clean.
pub fn clear_interrupt() {
    if let Some(flag) = INTERRUPT_FLAG.get() {
        flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_interrupted_default_false() {
        // Before registration, should return false
        // Note: in test context the OnceLock may or may not be initialized
        // depending on test order, so we just verify it doesn't panic
        let _ = is_interrupted();
    }
}
