use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use topobuilder::engine::progress::{Progress, ProgressCallback};
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

struct PipelineDisplay {
    bar: ProgressBar,
    phase: &'static str,
}

/// Renders the build pipeline on stderr: a spinner per phase, a bar over the topologies
/// being finalized, and one line per case once its topologies are known.
#[derive(Clone)]
pub struct CliProgressHandler {
    display: Arc<Mutex<PipelineDisplay>>,
}

fn topologies(count: usize) -> String {
    match count {
        1 => "1 topology".to_string(),
        n => format!("{n} topologies"),
    }
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        bar.set_style(Self::phase_style());
        Self {
            display: Arc::new(Mutex::new(PipelineDisplay { bar, phase: "" })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let display = self.display.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut display) = display.lock() else {
                warn!("Progress display mutex was poisoned; dropping {:?}", progress);
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    display.phase = name;
                    display.bar.reset();
                    display.bar.set_length(0);
                    display.bar.set_style(Self::phase_style());
                    display.bar.set_message(format!("{name}..."));
                    display
                        .bar
                        .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                }
                Progress::PhaseFinish => {
                    display.bar.disable_steady_tick();
                    display
                        .bar
                        .finish_with_message(format!("✓ {}", display.phase));
                }
                Progress::TaskStart { total_steps } => {
                    display.bar.disable_steady_tick();
                    display.bar.set_style(Self::topology_style());
                    display.bar.set_prefix(display.phase);
                    display.bar.set_length(total_steps);
                    display.bar.set_position(0);
                }
                Progress::TaskIncrement => display.bar.inc(1),
                Progress::TaskFinish => {
                    if let Some(total) = display.bar.length() {
                        display.bar.set_position(total);
                    }
                }
                Progress::TopologiesResolved { case, count } => {
                    let summary = topologies(count);
                    display.bar.println(format!("  {case}: {summary}"));
                    display
                        .bar
                        .set_message(format!("{}: {summary}", display.phase));
                }
            }
        })
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn topology_style() -> ProgressStyle {
        ProgressStyle::with_template("  {prefix:<12} [{bar:32.green/white}] {pos}/{len} topologies")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
