//! Binary entrypoint that launches the ClerkDesk sync console.

use std::process::ExitCode;

use clerkdesk::start_console;

/// Start a headless sync session against the configured console backend.
fn main() -> ExitCode {
    start_console::run()
}
