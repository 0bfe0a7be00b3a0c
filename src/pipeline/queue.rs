//! SubmissionQueue: FIFO of `eth_sendTransaction` jobs with a single active drain.
//!
//! Nonce resolution reads chain state at call time, so two submissions for the
//! same sender that resolve concurrently can receive the same nonce. The queue
//! serializes the whole nonce → sign → relay section per provider instance:
//! - `submit` pushes a job and starts a drain task only if none is active
//! - the drain task pops one job at a time, runs it to completion, then loops
//! - the draining flag is cleared under the same lock that observes the empty queue
//!
//! Jobs are never cancelled. A job whose receiver was dropped still runs.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::pipeline::{submit, PipelineDeps};
use crate::rpc::envelope::{Request, Response};
use crate::utils::errors::ProviderError;
use crate::utils::metrics::{METRICS, QUEUE_DEPTH, TX_FAILED, TX_RELAYED, TX_SUBMITTED};

pub type JobOutcome = Result<Response, ProviderError>;

/// A queued transaction request and the channel its outcome is delivered on.
pub struct Job {
    pub request: Request,
    responder: oneshot::Sender<JobOutcome>,
}

impl Job {
    fn complete(self, outcome: JobOutcome) {
        if self.responder.send(outcome).is_err() {
            debug!(id = %self.request.id_or_null(), "job receiver dropped before completion");
        }
    }
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    draining: bool,
}

/// Per-provider submission queue (cheap to clone; clones share state)
#[derive(Clone, Default)]
pub struct SubmissionQueue {
    state: Arc<Mutex<QueueState>>,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `request` and return the receiver for its outcome.
    ///
    /// Must be called within a tokio runtime; never blocks.
    pub fn submit<D: PipelineDeps>(
        &self,
        deps: D,
        request: Request,
    ) -> oneshot::Receiver<JobOutcome> {
        let (responder, rx) = oneshot::channel();
        let start_drain = {
            let mut state = self.state.lock();
            state.jobs.push_back(Job { request, responder });
            METRICS.set_gauge(QUEUE_DEPTH, state.jobs.len() as f64);
            !std::mem::replace(&mut state.draining, true)
        };
        METRICS.inc_counter(TX_SUBMITTED);

        if start_drain {
            tokio::spawn(Self::drain(self.state.clone(), deps));
        } else {
            debug!("drain already active, job queued");
        }
        rx
    }

    /// Jobs waiting to be processed (excludes the one in flight).
    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_draining(&self) -> bool {
        self.state.lock().draining
    }

    async fn drain<D: PipelineDeps>(state: Arc<Mutex<QueueState>>, deps: D) {
        loop {
            let (job, remaining) = {
                let mut state = state.lock();
                match state.jobs.pop_front() {
                    Some(job) => {
                        let remaining = state.jobs.len();
                        METRICS.set_gauge(QUEUE_DEPTH, remaining as f64);
                        (job, remaining)
                    }
                    None => {
                        state.draining = false;
                        debug!("submission queue empty");
                        return;
                    }
                }
            };
            debug!(id = %job.request.id_or_null(), remaining, "processing queued transaction");

            let outcome = AssertUnwindSafe(submit::process(&deps, &job.request))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(ProviderError::Internal("transaction job panicked".into()))
                });

            match &outcome {
                Ok(_) => METRICS.inc_counter(TX_RELAYED),
                Err(e) => {
                    METRICS.inc_counter(TX_FAILED);
                    warn!(id = %job.request.id_or_null(), error = %e, "transaction job failed");
                }
            }
            job.complete(outcome);
        }
    }
}
