use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

/// Terminal feedback for the headless driver.
#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    fn pretty(&self) -> bool {
        self.is_tty && self.mode != UiMode::Plain
    }

    /// Countdown bar for one round, advanced with `RoundCountdown::update`.
    pub fn round_countdown(&self, round: u64, delay: Duration) -> RoundCountdown {
        if !self.pretty() {
            eprintln!("==> round {} (capture in {} ms)", round, delay.as_millis());
            return RoundCountdown { bar: None, round };
        }
        let bar = ProgressBar::new(delay.as_millis() as u64);
        bar.set_draw_target(ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{prefix} [{bar:30}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix(format!("round {}", round));
        bar.set_message("dodge!");
        RoundCountdown {
            bar: Some(bar),
            round,
        }
    }
}

pub struct RoundCountdown {
    bar: Option<ProgressBar>,
    round: u64,
}

impl RoundCountdown {
    /// Time elapsed since the round started.
    pub fn update(&self, elapsed: Duration) {
        if let Some(bar) = &self.bar {
            bar.set_position(elapsed.as_millis() as u64);
        }
    }

    pub fn finish(self, message: &str) {
        match self.bar {
            Some(bar) => bar.finish_with_message(message.to_string()),
            None => eprintln!("✔ round {}: {}", self.round, message),
        }
    }
}
