use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"];

/// Bar over the runs of a test matrix. Per-run results go through `pb.println` so
/// they stay above the bar.
pub fn create_progress_bar(runs: u64) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("▕{bar:25}▏ run {pos}/{len} • {elapsed_precise} • {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░ ");

    let pb = ProgressBar::new(runs);
    pb.set_style(style);
    pb
}

pub fn create_spinner(message: &str) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .tick_strings(&SPINNER_FRAMES)
        .template("{spinner} {wide_msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let pb = ProgressBar::new_spinner();
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
