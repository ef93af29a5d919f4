/// Events emitted by the build workflow so front ends can render progress.
#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    /// Topologies kept for a case once enumeration (or evaluation) and grouping are done.
    TopologiesResolved { case: String, count: usize },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards [`Progress`] events to an optional callback; without one, reporting is a no-op.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Runs `body` between `PhaseStart` and `PhaseFinish`.
    ///
    /// A failing phase is left open: no `PhaseFinish` follows an error.
    pub fn phase<T, E>(
        &self,
        name: &'static str,
        body: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        self.report(Progress::PhaseStart { name });
        let out = body()?;
        self.report(Progress::PhaseFinish);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn label(event: Progress) -> String {
        match event {
            Progress::PhaseStart { name } => name.to_string(),
            Progress::PhaseFinish => "finish".to_string(),
            Progress::TopologiesResolved { case, count } => format!("{case}:{count}"),
            _ => "other".to_string(),
        }
    }

    #[test]
    fn reporter_without_callback_is_silent() {
        ProgressReporter::new().report(Progress::TaskIncrement);
    }

    #[test]
    fn callback_sees_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            seen.lock().unwrap().push(label(event));
        }));
        reporter.report(Progress::PhaseStart { name: "Placement" });
        reporter.report(Progress::TopologiesResolved {
            case: "sandwich".to_string(),
            count: 3,
        });
        reporter.report(Progress::PhaseFinish);
        drop(reporter);
        assert_eq!(
            seen.into_inner().unwrap(),
            ["Placement", "sandwich:3", "finish"]
        );
    }

    #[test]
    fn failed_phase_is_not_finished() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            seen.lock().unwrap().push(label(event));
        }));
        let ok: Result<u8, &str> = reporter.phase("Placement", || Ok(1));
        let failed: Result<u8, &str> = reporter.phase("Connectivity", || Err("no path"));
        drop(reporter);

        assert_eq!(ok, Ok(1));
        assert_eq!(failed, Err("no path"));
        assert_eq!(
            seen.into_inner().unwrap(),
            ["Placement", "finish", "Connectivity"]
        );
    }
}
