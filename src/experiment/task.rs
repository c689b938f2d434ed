//! Background sweeps with cancellation and progress.
//!
//! [`DiodeExperiment::start_scan`] moves the experiment onto a tokio task.
//! The caller keeps a [`SweepHandle`]: partial results are published on a
//! `watch` channel after every completed level, cancellation is checked before
//! every repetition, and [`SweepHandle::join`] hands the experiment back so
//! the device can be switched off and closed.

use super::{DiodeExperiment, SweepResult};
use crate::error::{AppResult, DaqError};
use crate::instrument::ArduinoInstrument;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// New, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect before the next repetition.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a background sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepState {
    /// Still acquiring
    Running,
    /// Every level was visited
    Finished,
    /// Stopped early on request
    Cancelled,
    /// Aborted by an error
    Failed(String),
}

impl SweepState {
    /// True once the task no longer talks to the device.
    pub fn is_done(&self) -> bool {
        !matches!(self, SweepState::Running)
    }
}

/// Snapshot published after every completed level.
#[derive(Debug, Clone)]
pub struct SweepProgress {
    /// Levels completed so far
    pub result: SweepResult,
    /// Task state
    pub state: SweepState,
}

impl Default for SweepProgress {
    fn default() -> Self {
        Self {
            result: SweepResult::new(),
            state: SweepState::Running,
        }
    }
}

/// What a finished background sweep returns.
pub struct SweepOutcome<D: ArduinoInstrument> {
    /// The experiment, device still open
    pub experiment: DiodeExperiment<D>,
    /// Completed levels, or the error that stopped the sweep
    pub result: AppResult<SweepResult>,
    /// Whether a cancel request stopped the sweep before its last level
    pub cancelled: bool,
}

/// Cloneable read side of a background sweep, for the presentation layer.
#[derive(Debug, Clone)]
pub struct SweepMonitor {
    cancel: CancelToken,
    progress: watch::Receiver<SweepProgress>,
}

impl SweepMonitor {
    /// Latest published progress.
    pub fn snapshot(&self) -> SweepProgress {
        self.progress.borrow().clone()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Owner side of a background sweep.
pub struct SweepHandle<D: ArduinoInstrument> {
    cancel: CancelToken,
    progress: watch::Receiver<SweepProgress>,
    task: JoinHandle<SweepOutcome<D>>,
}

impl<D: ArduinoInstrument + 'static> SweepHandle<D> {
    pub(crate) fn spawn(
        mut experiment: DiodeExperiment<D>,
        start: u16,
        stop: u16,
        count: u32,
    ) -> Self {
        let cancel = CancelToken::new();
        let (tx, rx) = watch::channel(SweepProgress::default());

        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let scan = experiment
                .run_scan(start, stop, count, &token, |partial| {
                    tx.send_replace(SweepProgress {
                        result: partial.clone(),
                        state: SweepState::Running,
                    });
                })
                .await;

            // A cancel that arrives during the last repetition does not stop
            // the sweep, so only an early return counts as cancelled.
            let (result, cancelled) = match scan {
                Ok((result, stopped_early)) => (Ok(result), stopped_early),
                Err(e) => (Err(e), false),
            };
            let state = match &result {
                Ok(_) if cancelled => SweepState::Cancelled,
                Ok(_) => SweepState::Finished,
                Err(e) => SweepState::Failed(e.to_string()),
            };
            tx.send_modify(|progress| {
                if let Ok(final_result) = &result {
                    progress.result = final_result.clone();
                }
                progress.state = state;
            });

            SweepOutcome {
                experiment,
                result,
                cancelled,
            }
        });

        Self {
            cancel,
            progress: rx,
            task,
        }
    }
}

impl<D: ArduinoInstrument> SweepHandle<D> {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Receiver of progress snapshots.
    pub fn progress(&self) -> watch::Receiver<SweepProgress> {
        self.progress.clone()
    }

    /// Cloneable view for a GUI or logger.
    pub fn monitor(&self) -> SweepMonitor {
        SweepMonitor {
            cancel: self.cancel.clone(),
            progress: self.progress.clone(),
        }
    }

    /// Whether the task has completed.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the sweep and take back the experiment.
    pub async fn join(self) -> AppResult<SweepOutcome<D>> {
        self.task
            .await
            .map_err(|e| DaqError::TaskFailed(e.to_string()))
    }
}
