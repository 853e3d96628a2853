use crate::ui::progress::create_spinner;
use indicatif::ProgressBar;

/// Spinner shown while one request is in flight. The line is cleared on drop, so the
/// response box that follows starts on a clean line.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn sending(request_name: &str) -> Self {
        Self {
            pb: create_spinner(&format!("Sending {}", request_name)),
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}
