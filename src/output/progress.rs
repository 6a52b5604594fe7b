use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Progress tracking for the two-phase snapshot import
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1(limit: usize) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(
            bright_yellow(format!(
                "Phase 1/2: Fetching pipelines and merge requests (limit: {limit})"
            ))
            .to_string(),
        );
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self, pipelines: usize, merge_requests: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!(
                "Phase 1/2: Fetched {pipelines} pipelines and {merge_requests} merge requests ✓"
            ))
            .to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 2/2: Building job registry").to_string());
        Self { pb }
    }

    pub fn finish_phase_2(self, jobs: usize) {
        self.pb.finish_with_message(
            bright_green(format!("Phase 2/2: Registered {jobs} branch jobs ✓")).to_string(),
        );
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
