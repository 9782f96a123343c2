//! Mining agents.
//!
//! Agents register with the worker and receive assembly work on their
//! own bounded channel. Sealed artifacts come back on the shared result
//! channel; the worker classifies them as fruits or blocks.

use super::work::Work;
use crate::consensus::Engine;
use crate::primitives::SnailBlock;
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

/// A sealed artifact returned by an agent.
#[derive(Debug, Clone)]
pub struct MinedResult {
    /// The assembly context the artifact was sealed from.
    pub work: Arc<Work>,
    /// The sealed block or fruit.
    pub block: SnailBlock,
}

/// A sealing agent registered with the worker.
pub trait Agent: Send + Sync {
    /// Channel the worker delivers new assembly work on.
    fn work_channel(&self) -> mpsc::Sender<Arc<Work>>;

    /// Install the shared channel sealed results return on. Called by
    /// the worker at registration.
    fn set_result_channel(&self, results: mpsc::Sender<MinedResult>);

    /// Start sealing.
    fn start(&self);

    /// Stop sealing; in-progress work is discarded.
    fn stop(&self);

    /// Current hash rate, zero if the agent cannot measure one.
    fn hash_rate(&self) -> u64;
}

/// An agent sealing on the local CPU through the consensus engine.
///
/// The work channel holds a single slot: while the agent seals, the
/// worker's next dispatch either parks there or is dropped, and the
/// agent drains to the newest work before sealing so stale candidates
/// are abandoned.
pub struct CpuAgent {
    engine: Arc<dyn Engine>,
    work_tx: mpsc::Sender<Arc<Work>>,
    work_rx: Arc<Mutex<Option<mpsc::Receiver<Arc<Work>>>>>,
    results: Mutex<Option<mpsc::Sender<MinedResult>>>,
    running: Arc<AtomicBool>,
    stop_notify: Arc<Notify>,
}

impl CpuAgent {
    /// Create an agent sealing through `engine`.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        let (work_tx, work_rx) = mpsc::channel(1);
        Self {
            engine,
            work_tx,
            work_rx: Arc::new(Mutex::new(Some(work_rx))),
            results: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            stop_notify: Arc::new(Notify::new()),
        }
    }

    async fn seal_loop(
        engine: Arc<dyn Engine>,
        mut work_rx: mpsc::Receiver<Arc<Work>>,
        results: mpsc::Sender<MinedResult>,
        running: Arc<AtomicBool>,
        stop_notify: Arc<Notify>,
        rx_slot: Arc<Mutex<Option<mpsc::Receiver<Arc<Work>>>>>,
    ) {
        loop {
            tokio::select! {
                received = work_rx.recv() => {
                    let Some(mut work) = received else { break };
                    // Newer work supersedes whatever queued behind it.
                    while let Ok(newer) = work_rx.try_recv() {
                        work = newer;
                    }
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    let Some(candidate) = work.block.as_ref() else { continue };
                    match engine.seal(candidate) {
                        Ok(sealed) => {
                            let result = MinedResult { work: work.clone(), block: sealed };
                            if results.send(result).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => debug!(target: "miner", %err, "sealing attempt aborted"),
                    }
                }
                _ = stop_notify.notified() => break,
            }
        }
        running.store(false, Ordering::SeqCst);
        *rx_slot.lock() = Some(work_rx);
    }
}

impl Agent for CpuAgent {
    fn work_channel(&self) -> mpsc::Sender<Arc<Work>> {
        self.work_tx.clone()
    }

    fn set_result_channel(&self, results: mpsc::Sender<MinedResult>) {
        *self.results.lock() = Some(results);
    }

    fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(work_rx) = self.work_rx.lock().take() else {
            // Previous seal loop still unwinding.
            self.running.store(false, Ordering::SeqCst);
            return;
        };
        let Some(results) = self.results.lock().clone() else {
            warn!(target: "miner", "cpu agent started before registration");
            *self.work_rx.lock() = Some(work_rx);
            self.running.store(false, Ordering::SeqCst);
            return;
        };
        tokio::spawn(Self::seal_loop(
            self.engine.clone(),
            work_rx,
            results,
            self.running.clone(),
            self.stop_notify.clone(),
            self.work_rx.clone(),
        ));
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.stop_notify.notify_one();
        }
    }

    fn hash_rate(&self) -> u64 {
        // The dev engine has no meaningful rate to report.
        0
    }
}
