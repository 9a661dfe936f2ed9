//! Command implementations.

pub mod compare;
pub mod extract;
pub mod verify;

use restcheck_core::progress::ProgressMode;

/// Progress goes to the console only when a human is watching it.
pub fn progress_mode(json: bool, quiet: bool) -> ProgressMode {
    if json || quiet || !console::user_attended() {
        ProgressMode::Silent
    } else {
        ProgressMode::Console
    }
}
