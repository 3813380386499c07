//! Background analysis off the caller's thread

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::analysis::{FlightHeightAnalyzer, FlightHeightResult};
use crate::error::Result;
use crate::session::{AnalysisEvent, AnalysisOutcome, Recalculation, Ticket};

/// Request queued for the worker
struct WorkItem {
    ticket: Ticket,
    event: AnalysisEvent,
}

/// Runs analyses on a background thread.
///
/// Submitting never blocks. Outcomes are polled with [`try_get_result`] or
/// [`drain_results`] and are expected to be passed to
/// [`Session::accept`](crate::session::Session::accept), which drops the
/// ones that no longer match the selection.
///
/// [`try_get_result`]: AnalysisWorker::try_get_result
/// [`drain_results`]: AnalysisWorker::drain_results
pub struct AnalysisWorker {
    request_tx: Sender<WorkItem>,
    result_rx: Receiver<AnalysisOutcome>,
    _worker_thread: thread::JoinHandle<()>,
}

impl AnalysisWorker {
    /// Starts the worker thread and its async runtime
    pub fn new(analyzer: Arc<FlightHeightAnalyzer>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("flightheight-worker")
            .enable_all()
            .build()?;

        let (request_tx, request_rx) = unbounded::<WorkItem>();
        let (result_tx, result_rx) = unbounded::<AnalysisOutcome>();

        let worker_thread = thread::spawn(move || {
            while let Ok(item) = request_rx.recv() {
                let analyzer = Arc::clone(&analyzer);
                let result_tx = result_tx.clone();
                // Each item runs independently so a slow lookup for an old
                // image never holds back the current one
                runtime.spawn(async move {
                    let result = process(&analyzer, item.event).await;
                    let _ = result_tx.send(AnalysisOutcome {
                        ticket: item.ticket,
                        result,
                    });
                });
            }
            tracing::debug!("analysis worker stopped");
        });

        Ok(Self {
            request_tx,
            result_rx,
            _worker_thread: worker_thread,
        })
    }

    /// Queues an event for processing
    pub fn submit(&self, ticket: Ticket, event: AnalysisEvent) {
        let _ = self.request_tx.send(WorkItem { ticket, event });
    }

    /// Try to get a finished outcome (non-blocking)
    pub fn try_get_result(&self) -> Option<AnalysisOutcome> {
        self.result_rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next outcome
    pub fn recv_timeout(&self, timeout: Duration) -> Option<AnalysisOutcome> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drain all pending outcomes
    pub fn drain_results(&self) -> Vec<AnalysisOutcome> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }
        results
    }
}

/// Applies one event with the analyzer
pub async fn process(analyzer: &FlightHeightAnalyzer, event: AnalysisEvent) -> Result<FlightHeightResult> {
    match event {
        AnalysisEvent::ImageSelected(record) => analyzer.analyze(&record).await,
        AnalysisEvent::RecalculationRequested { current, recalculation } => match recalculation {
            Recalculation::Raster { raster, reference } => {
                analyzer.recalculate_from_raster(&current, &raster, &reference)
            }
            Recalculation::Resolution { resolution, reference } => {
                analyzer.recalculate_with_resolution(&current, resolution, &reference)
            }
            Recalculation::Manual { height_m } => analyzer.override_height(&current, height_m),
        },
    }
}
