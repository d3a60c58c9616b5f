//! User-facing channels over the command router.
//!
//! Channels own presentation only; all interpretation happens in the
//! router. `chat` routes a single message, `repl` is the interactive
//! loop.

pub mod repl;

use crate::router::Response;

/// Print a response the same way in both channels: the message, then
/// any follow-up suggestions, dimmed.
pub fn print_response(response: &Response) {
    println!("{}", response.message);
    if !response.suggestions.is_empty() {
        println!();
        for suggestion in &response.suggestions {
            println!("  \x1b[90mtry: {}\x1b[0m", suggestion);
        }
    }
    println!();
}
