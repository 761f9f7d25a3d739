//! Progress reporting for the walk, classify and quarantine phases.
//!
//! Components never print progress themselves. They receive an
//! `Arc<dyn ProgressCallback>` through their configuration and report into
//! it, which keeps them free of global state. [`Progress`] is the terminal
//! implementation used by the binary.
//!
//! # Plain Mode
//!
//! With plain mode enabled the reporter prints ordinary lines instead of
//! animated bars:
//! - `Scanned 100/2500 files...` every 100 files and at the end, or
//!   `Scanned 100 files...` when the walk was started without a total
//! - `Processed 10/42 size groups...` every 10 groups and at the end
//! - `Moved 1/3: /path/to/file` for every quarantined file

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Phase name for directory walking.
pub const PHASE_WALK: &str = "walking";
/// Phase name for size group classification.
pub const PHASE_CLASSIFY: &str = "classifying";
/// Phase name for quarantine moves.
pub const PHASE_QUARANTINE: &str = "quarantine";

/// Progress callback for the pipeline phases.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (see the `PHASE_*` constants)
    /// * `total` - Total number of items, or 0 when unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Terminal progress reporter, drawn on stdout.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    classifying: Mutex<Option<ProgressBar>>,
    quarantine: Mutex<Option<ProgressBar>>,
    /// Active phase and its total, used by plain mode
    active: Mutex<Option<(String, usize)>>,
    quiet: bool,
    plain: bool,
}

impl Progress {
    /// Create a reporter, optionally printing plain lines instead of bars.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupequarantine::progress::{Progress, ProgressCallback, PHASE_WALK};
    ///
    /// let progress = Progress::with_plain(false, true);
    /// progress.on_phase_start(PHASE_WALK, 250);
    /// progress.on_progress(100, "/photos/a.jpg"); // prints "Scanned 100/250 files..."
    /// progress.on_phase_end(PHASE_WALK);
    /// ```
    #[must_use]
    pub fn with_plain(quiet: bool, plain: bool) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::stdout()),
            walking: Mutex::new(None),
            classifying: Mutex::new(None),
            quarantine: Mutex::new(None),
            active: Mutex::new(None),
            quiet,
            plain,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style(unit: &str) -> ProgressStyle {
        ProgressStyle::with_template(&format!(
            "[{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            PHASE_WALK => Some(&self.walking),
            PHASE_CLASSIFY => Some(&self.classifying),
            PHASE_QUARANTINE => Some(&self.quarantine),
            _ => None,
        }
    }

    fn plain_line(&self, current: usize, path: &str) -> Option<String> {
        let active = lock(&self.active);
        let (phase, total) = active.as_ref()?;
        match phase.as_str() {
            PHASE_WALK if *total == 0 => {
                (current % 100 == 0).then(|| format!("Scanned {current} files..."))
            }
            PHASE_WALK if current % 100 == 0 || current == *total => {
                Some(format!("Scanned {current}/{total} files..."))
            }
            PHASE_CLASSIFY if current % 10 == 0 || current == *total => {
                Some(format!("Processed {current}/{total} size groups..."))
            }
            PHASE_QUARANTINE => Some(format!("Moved {current}/{total}: {path}")),
            _ => None,
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }
        *lock(&self.active) = Some((phase.to_string(), total));
        if self.plain {
            return;
        }

        let pb = match phase {
            PHASE_WALK if total == 0 => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::spinner_style());
                pb.set_message("Scanning");
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            PHASE_WALK => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style("files"));
                pb
            }
            PHASE_CLASSIFY => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style("size groups"));
                pb
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style("moved"));
                pb
            }
        };
        if let Some(slot) = self.slot(phase) {
            *lock(slot) = Some(pb);
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if self.plain {
            if let Some(line) = self.plain_line(current, path) {
                println!("{line}");
            }
            return;
        }

        let phase = lock(&self.active).as_ref().map(|(p, _)| p.clone());
        let Some(slot) = phase.as_deref().and_then(|p| self.slot(p)) else {
            return;
        };
        if let Some(ref pb) = *lock(slot) {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 40));
            if phase.as_deref() == Some(PHASE_QUARANTINE) {
                pb.println(format!("Moved: {path}"));
            }
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        *lock(&self.active) = None;

        if let Some(slot) = self.slot(phase) {
            if let Some(pb) = lock(slot).take() {
                pb.finish_with_message("done");
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if self.plain {
            println!("{message}");
            return;
        }
        if self.multi.println(message).is_err() {
            println!("{message}");
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
