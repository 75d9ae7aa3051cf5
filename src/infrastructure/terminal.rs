//! Interactive confirmation on the controlling terminal.

use crate::ports::confirm_port::ConfirmPort;
use is_terminal::IsTerminal;
use std::io::{self, BufRead, Write};

/// Asks the operator on stdin/stdout. Unattended runs (stdin not a
/// terminal) decline without prompting.
pub struct TerminalConfirm;

impl ConfirmPort for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return false;
        }
        print!("{}", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }
        answer.trim().eq_ignore_ascii_case("y")
    }
}
