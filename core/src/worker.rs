//! Runs batch requests on a background thread.
//!
//! Requests and responses are plain values sent over channels; the worker
//! shares nothing mutable with its caller. Every response carries the index
//! of the request that produced it. [`WorkerClient`] hands out indexes and
//! drops responses to anything but the latest request, which is how a newer
//! lever configuration supersedes an older run still in flight.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use thiserror::Error;
use tracing::{error, warn};

use crate::engine::{BatchEngine, RunFailure, RunRequest};
use crate::frames::ProjectionSet;
use crate::levers::CompiledLever;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Run(#[from] RunFailure),

    #[error("Run {request_index} panicked: {message}")]
    Panicked { request_index: u64, message: String },

    #[error("Worker is not running")]
    Disconnected,

    #[error("Timed out after {duration_ms}ms waiting for run {request_index}")]
    Timeout { request_index: u64, duration_ms: u64 },

    #[error("Could not start worker thread: {0}")]
    Spawn(String),
}

/// The reply to one [`RunRequest`].
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub request_index: u64,
    pub outcome: Result<ProjectionSet, WorkerError>,
}

/// A single background thread executing runs in submission order.
pub struct Worker {
    tx: Option<Sender<RunRequest>>,
    responses: Receiver<RunResponse>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn start(engine: Arc<BatchEngine>) -> Result<Self, WorkerError> {
        let (tx, rx) = unbounded::<RunRequest>();
        let (reply, responses) = unbounded::<RunResponse>();

        let handle = thread::Builder::new()
            .name("plastics-worker".to_string())
            .spawn(move || {
                while let Ok(request) = rx.recv() {
                    let request_index = request.request_index;
                    let outcome = match catch_unwind(AssertUnwindSafe(|| engine.run(&request))) {
                        Ok(result) => result.map_err(WorkerError::from),
                        Err(panic) => {
                            let message = panic_message(panic.as_ref());
                            error!(request_index, %message, "Batch run panicked");
                            Err(WorkerError::Panicked {
                                request_index,
                                message,
                            })
                        }
                    };
                    if reply
                        .send(RunResponse {
                            request_index,
                            outcome,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            })
            .map_err(|e| WorkerError::Spawn(e.to_string()))?;

        Ok(Self {
            tx: Some(tx),
            responses,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, request: RunRequest) -> Result<(), WorkerError> {
        match &self.tx {
            Some(tx) => tx.send(request).map_err(|_| WorkerError::Disconnected),
            None => Err(WorkerError::Disconnected),
        }
    }

    pub fn responses(&self) -> &Receiver<RunResponse> {
        &self.responses
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the request channel lets the thread finish queued runs and exit.
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Issues requests with increasing indexes and keeps only the latest reply.
pub struct WorkerClient {
    worker: Worker,
    next_index: u64,
    latest: Option<u64>,
}

impl WorkerClient {
    pub fn new(worker: Worker) -> Self {
        Self {
            worker,
            next_index: 0,
            latest: None,
        }
    }

    /// Submit a run, superseding any run still pending. Returns its index.
    pub fn request(
        &mut self,
        historical_years: RangeInclusive<i32>,
        projection_years: RangeInclusive<i32>,
        levers: Vec<CompiledLever>,
        inputs: BTreeMap<String, f64>,
    ) -> Result<u64, WorkerError> {
        let request_index = self.next_index;
        self.worker.submit(RunRequest {
            request_index,
            historical_years,
            projection_years,
            levers,
            inputs,
        })?;
        self.next_index += 1;
        self.latest = Some(request_index);
        Ok(request_index)
    }

    pub fn latest(&self) -> Option<u64> {
        self.latest
    }

    /// The reply to the latest request, if it has arrived.
    pub fn poll(&mut self) -> Result<Option<RunResponse>, WorkerError> {
        loop {
            match self.worker.responses().try_recv() {
                Ok(response) => {
                    if let Some(response) = self.accept(response) {
                        return Ok(Some(response));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(WorkerError::Disconnected),
            }
        }
    }

    /// Block until the reply to the latest request arrives.
    pub fn wait(&mut self, timeout: Duration) -> Result<RunResponse, WorkerError> {
        let Some(request_index) = self.latest else {
            return Err(WorkerError::Disconnected);
        };
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.worker.responses().recv_timeout(remaining) {
                Ok(response) => {
                    if let Some(response) = self.accept(response) {
                        return Ok(response);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(WorkerError::Timeout {
                        request_index,
                        duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(WorkerError::Disconnected),
            }
        }
    }

    fn accept(&mut self, response: RunResponse) -> Option<RunResponse> {
        if Some(response.request_index) == self.latest {
            self.latest = None;
            Some(response)
        } else {
            warn!(
                request_index = response.request_index,
                latest = ?self.latest,
                "Discarding stale run response"
            );
            None
        }
    }
}
