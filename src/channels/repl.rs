//! Interactive REPL channel with line editing and history.
//!
//! Reads lines with rustyline, routes them through the command router,
//! and prints the response plus suggestions. `quit` / `exit` (and
//! Ctrl+D) leave after stopping all monitoring so no background
//! monitor outlives the session.

use std::sync::Arc;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::automation::AutomationEngine;
use crate::channels::print_response;
use crate::router::Router;

/// History file path (~/.chainpilot/history).
fn history_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".chainpilot")
        .join("history")
}

/// Run the REPL until the user quits. Blocks the calling task between
/// inputs; a single-user terminal loop does not need a reader thread.
pub async fn run(router: Arc<Router>, engine: Arc<AutomationEngine>) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;

    let hist_path = history_path();
    if let Some(parent) = hist_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = editor.load_history(&hist_path);

    println!("\x1b[1mChainPilot\x1b[0m  'help' for commands, 'quit' to exit");
    println!();

    loop {
        match editor.readline("\x1b[1;36m\u{203A}\x1b[0m ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                    break;
                }

                let response = router.process_message(line).await;
                print_response(&response);
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C clears the current line but stays in the loop.
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    engine.stop_all_monitoring().await;
    let _ = editor.save_history(&hist_path);
    println!("Goodbye.");
    Ok(())
}
