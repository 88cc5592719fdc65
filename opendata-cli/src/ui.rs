//! Progress feedback for the opendata CLI
//!
//! Spinners are suppressed when:
//! - `--quiet` flag is passed
//! - `OPENDATA_QUIET=1` environment variable is set
//! - stderr is not a TTY (piped output)

use std::io::IsTerminal;
use std::sync::OnceLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Global quiet mode state
static QUIET_MODE: OnceLock<bool> = OnceLock::new();

/// Call once at startup with the --quiet flag value.
pub fn init_quiet_mode(quiet_flag: bool) {
    let is_quiet = quiet_flag
        || std::env::var("OPENDATA_QUIET").map(|v| v == "1").unwrap_or(false)
        || !std::io::stderr().is_terminal();

    QUIET_MODE.set(is_quiet).ok();
}

pub fn is_quiet() -> bool {
    *QUIET_MODE.get().unwrap_or(&false)
}

/// Record-counting spinner; `None` in quiet mode.
pub fn record_spinner(msg: impl Into<String>) -> Option<ProgressBar> {
    if is_quiet() {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {pos} records: {msg}")
            .expect("valid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    if pb.is_hidden() {
        None
    } else {
        Some(pb)
    }
}

/// Replaces the spinner line with a final status mark and message.
fn finish(pb: Option<ProgressBar>, mark: char, msg: String) {
    let Some(pb) = pb else { return };
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("{} {}", mark, msg));
}

/// Runs `f` under a record spinner, handing it a progress callback.
pub fn with_record_spinner<T, E: std::fmt::Display>(
    msg: impl Into<String>,
    success_msg: impl FnOnce(&T) -> String,
    f: impl FnOnce(&mut dyn FnMut(u64)) -> Result<T, E>,
) -> Result<T, E> {
    let msg = msg.into();
    let pb = record_spinner(&msg);
    let mut tick = |n: u64| {
        if let Some(pb) = &pb {
            pb.set_position(n);
        }
    };

    match f(&mut tick) {
        Ok(result) => {
            finish(pb, '✓', success_msg(&result));
            Ok(result)
        }
        Err(e) => {
            finish(pb, '✗', format!("{}: {}", msg, e));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_wrapper_passes_results_through() {
        init_quiet_mode(true);
        let out: Result<u64, String> =
            with_record_spinner("counting", |n| format!("{} done", n), |tick| {
                tick(1);
                tick(2);
                Ok(2)
            });
        assert_eq!(out, Ok(2));

        let err: Result<u64, String> =
            with_record_spinner("counting", |_| String::new(), |_| Err("boom".to_string()));
        assert_eq!(err, Err("boom".to_string()));
    }
}
