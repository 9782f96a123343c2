//! The block-assembly worker.
//!
//! One worker runs two long-lived loops: the **update loop** selects
//! across the five event streams (pending fruits, pending fast blocks,
//! mined fruits, chain head, chain side) and triggers rebuilds; the
//! **result loop** drains the shared sealed-result channel, feeding
//! fruits back to the pool and writing blocks to the chain.
//!
//! Rebuild triggers are coalesced through a compare-and-swap latch: a
//! burst of events produces at most one in-flight build, and the latch
//! stays held from the start of a build until the result loop accepts a
//! sealed artifact or the build aborts.

use super::agent::{Agent, MinedResult};
use super::config::{ChainConfig, MinerConfig};
use super::error::{MinerError, MinerResult};
use super::unconfirmed::UnconfirmedBlocks;
use super::work::Work;
use super::{
    Backend, ANCESTOR_WINDOW, MAX_UNCLES, MINING_LOG_AT_DEPTH, POINTER_HASH_FRESH,
    RESULT_QUEUE_SIZE,
};
use crate::chain::{
    ChainEvent, ChainFeedEvent, ChainHeadEvent, ChainSideEvent, NewMinedBlockEvent,
    NewMinedFruitEvent, Snailchain, SnailchainReader, WriteStatus,
};
use crate::consensus::Engine;
use crate::pool::{NewFastBlocksEvent, NewFruitsEvent, SnailPool};
use crate::primitives::{FastBlock, SnailBlock, SnailHeader};
use alloy_primitives::{Address, Bytes, B256};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tokio::sync::{broadcast, broadcast::error::RecvError, mpsc, Mutex};
use tracing::{debug, error, info, trace, warn};

/// Worker state guarded by the outer configuration lock.
struct Settings {
    coinbase: Address,
    extra: Bytes,
    to_elect: bool,
    publickey: Bytes,
    agents: Vec<Arc<dyn Agent>>,
}

/// Receivers for the five event streams the worker follows.
struct EventStreams {
    fruits: broadcast::Receiver<NewFruitsEvent>,
    fast_blocks: broadcast::Receiver<NewFastBlocksEvent>,
    mined_fruit: broadcast::Receiver<NewMinedFruitEvent>,
    chain_head: broadcast::Receiver<ChainHeadEvent>,
    chain_side: broadcast::Receiver<ChainSideEvent>,
}

/// The snail block-assembly worker.
///
/// Lock order during a build is `mu` → `uncle_mu` → `current_mu`; the
/// snapshot lock is taken last and on its own.
pub struct Worker {
    engine: Arc<dyn Engine>,
    chain: Arc<dyn Snailchain>,
    pool: Arc<dyn SnailPool>,
    mux: broadcast::Sender<NewMinedBlockEvent>,
    chain_config: ChainConfig,

    mu: Mutex<Settings>,
    uncle_mu: Mutex<HashMap<B256, Arc<SnailBlock>>>,
    current_mu: Mutex<Option<Work>>,
    snapshot: parking_lot::RwLock<Option<SnailBlock>>,

    result_tx: mpsc::Sender<MinedResult>,
    unconfirmed: UnconfirmedBlocks,

    mining: AtomicBool,
    at_work: AtomicI32,
    building: AtomicBool,
    fruit_only: AtomicBool,
    /// Highest fast-number this worker has already sealed as a fruit.
    fast_block_number: AtomicU64,
}

fn unix_time() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

impl Worker {
    /// Create the worker, spawn its two loops and assemble an initial
    /// candidate.
    pub async fn spawn(
        config: MinerConfig,
        engine: Arc<dyn Engine>,
        backend: &dyn Backend,
        mux: broadcast::Sender<NewMinedBlockEvent>,
    ) -> Arc<Self> {
        let chain = backend.snail_chain();
        let pool = backend.snail_pool();

        let streams = EventStreams {
            fruits: pool.subscribe_new_fruits(),
            fast_blocks: pool.subscribe_new_fast_blocks(),
            mined_fruit: chain.subscribe_new_mined_fruit(),
            chain_head: chain.subscribe_chain_head(),
            chain_side: chain.subscribe_chain_side(),
        };
        let (result_tx, result_rx) = mpsc::channel(RESULT_QUEUE_SIZE);
        let confirm_reader: Arc<dyn SnailchainReader> = chain.clone();

        let worker = Arc::new(Self {
            engine,
            unconfirmed: UnconfirmedBlocks::new(confirm_reader, MINING_LOG_AT_DEPTH),
            chain,
            pool,
            mux,
            chain_config: config.chain,
            mu: Mutex::new(Settings {
                coinbase: config.coinbase,
                extra: config.extra_data,
                to_elect: config.to_elect,
                publickey: config.publickey,
                agents: Vec::new(),
            }),
            uncle_mu: Mutex::new(HashMap::new()),
            current_mu: Mutex::new(None),
            snapshot: parking_lot::RwLock::new(None),
            result_tx,
            mining: AtomicBool::new(false),
            at_work: AtomicI32::new(0),
            building: AtomicBool::new(false),
            fruit_only: AtomicBool::new(config.fruit_only),
            fast_block_number: AtomicU64::new(0),
        });

        tokio::spawn(Self::update_loop(worker.clone(), streams));
        tokio::spawn(Self::result_loop(worker.clone(), result_rx));
        worker.commit_new_work().await;

        worker
    }

    /// Whether mining is enabled.
    pub fn is_mining(&self) -> bool {
        self.mining.load(Ordering::SeqCst)
    }

    /// Whether a build is in flight or a candidate awaits sealing.
    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::SeqCst)
    }

    /// Mine pure fruits only.
    pub fn set_fruit_only(&self, fruit_only: bool) {
        self.fruit_only.store(fruit_only, Ordering::SeqCst);
    }

    fn fruit_only(&self) -> bool {
        self.fruit_only.load(Ordering::SeqCst)
    }

    /// Claim the build latch; at most one claimant wins per cycle.
    fn try_begin_build(&self) -> bool {
        self.building
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Set the mining beneficiary.
    pub async fn set_etherbase(&self, coinbase: Address) {
        self.mu.lock().await.coinbase = coinbase;
    }

    /// Set the extra bytes stamped into drafted headers.
    pub async fn set_extra(&self, extra: Bytes) {
        self.mu.lock().await.extra = extra;
    }

    /// Set election participation and public key.
    pub async fn set_election(&self, to_elect: bool, publickey: Bytes) {
        let mut settings = self.mu.lock().await;
        settings.to_elect = to_elect;
        settings.publickey = publickey;
    }

    /// Enable mining and start all registered agents.
    pub async fn start(&self) {
        let settings = self.mu.lock().await;
        self.mining.store(true, Ordering::SeqCst);
        for agent in &settings.agents {
            agent.start();
        }
    }

    /// Disable mining and stop all registered agents.
    pub async fn stop(&self) {
        let settings = self.mu.lock().await;
        if self.is_mining() {
            for agent in &settings.agents {
                agent.stop();
            }
        }
        self.building.store(false, Ordering::SeqCst);
        self.mining.store(false, Ordering::SeqCst);
        self.at_work.store(0, Ordering::SeqCst);
    }

    /// Register a sealing agent and hand it the shared result channel.
    pub async fn register(&self, agent: Arc<dyn Agent>) {
        agent.set_result_channel(self.result_tx.clone());
        self.mu.lock().await.agents.push(agent);
    }

    /// Remove a previously registered agent and stop it.
    pub async fn unregister(&self, agent: &Arc<dyn Agent>) {
        let mut settings = self.mu.lock().await;
        settings.agents.retain(|registered| !Arc::ptr_eq(registered, agent));
        agent.stop();
    }

    /// Combined hash rate over all registered agents.
    pub async fn hash_rate(&self) -> u64 {
        self.mu.lock().await.agents.iter().map(|agent| agent.hash_rate()).sum()
    }

    /// The candidate under assembly: the live one while mining, the
    /// last snapshot otherwise.
    pub async fn pending_snail_block(&self) -> Option<SnailBlock> {
        if !self.is_mining() {
            return self.snapshot.read().clone();
        }
        self.current_mu.lock().await.as_ref().and_then(|work| work.block.clone())
    }

    /// Alias of [`Self::pending_snail_block`]; the historical state
    /// snapshot is not carried by this worker.
    pub async fn pending_snail(&self) -> Option<SnailBlock> {
        self.pending_snail_block().await
    }

    async fn update_loop(worker: Arc<Self>, mut streams: EventStreams) {
        loop {
            tokio::select! {
                event = streams.chain_head.recv() => match event {
                    Ok(_) => {
                        if worker.is_mining() && worker.try_begin_build() {
                            debug!(target: "miner", "chain head advanced, committing new work");
                            worker.commit_new_work().await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(target: "miner", skipped, "chain head stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                event = streams.chain_side.recv() => match event {
                    Ok(ev) => {
                        worker.uncle_mu.lock().await.insert(ev.block.hash(), ev.block);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(target: "miner", skipped, "chain side stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                event = streams.fruits.recv() => match event {
                    Ok(_) => {
                        // In fruit-only mode incoming fruits cannot change
                        // what this worker produces.
                        if !worker.fruit_only() && worker.is_mining() && worker.try_begin_build() {
                            debug!(target: "miner", "new fruits pending, committing new work");
                            worker.commit_new_work().await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(target: "miner", skipped, "fruit stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                event = streams.fast_blocks.recv() => match event {
                    Ok(_) => {
                        if worker.is_mining() && worker.try_begin_build() {
                            debug!(target: "miner", "new fast blocks pending, committing new work");
                            worker.commit_new_work().await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(target: "miner", skipped, "fast block stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                event = streams.mined_fruit.recv() => match event {
                    // Informational: rebuilds consult the pool directly.
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!(target: "miner", "event stream closed, update loop terminating");
    }

    async fn result_loop(worker: Arc<Self>, mut results: mpsc::Receiver<MinedResult>) {
        while let Some(result) = results.recv().await {
            worker.at_work.fetch_sub(1, Ordering::SeqCst);
            let block = result.block;

            if block.is_fruit() {
                let fast_number = block.fast_number();
                if worker.fast_block_number.load(Ordering::SeqCst) != fast_number {
                    info!(
                        target: "miner",
                        fast_number,
                        elapsed = ?result.work.created_at.elapsed(),
                        "🍒 mined fruit"
                    );
                    if let Err(err) = worker.pool.add_remote_fruits(vec![Arc::new(block)]) {
                        warn!(target: "miner", %err, "fruit pool rejected sealed fruit");
                    }
                }
                worker.fast_block_number.store(fast_number, Ordering::SeqCst);

                // A candidate that carried only the fast attestation is
                // spent now; let the next trigger start a fresh cycle.
                let candidate_has_fruits = worker
                    .current_mu
                    .lock()
                    .await
                    .as_ref()
                    .map(|work| !work.fruits.is_empty())
                    .unwrap_or(false);
                if !candidate_has_fruits {
                    worker.building.store(false, Ordering::SeqCst);
                }
            } else {
                let number = block.number();
                let hash = block.hash();
                let status = match worker.chain.write_canonical_block(block.clone()) {
                    Ok(status) => status,
                    Err(err) => {
                        error!(target: "miner", %err, number, "failed writing block to chain");
                        continue;
                    }
                };

                info!(
                    target: "miner",
                    number,
                    %hash,
                    fruits = block.fruits().len(),
                    fast_number = block.fast_number(),
                    elapsed = ?result.work.created_at.elapsed(),
                    "mined block"
                );

                // Broadcast the block and announce the chain insertion.
                let block = Arc::new(block);
                let _ = worker.mux.send(NewMinedBlockEvent { block: block.clone() });
                let mut events =
                    vec![ChainFeedEvent::Chain(ChainEvent { block: block.clone(), hash })];
                if status == WriteStatus::Canonical {
                    events.push(ChainFeedEvent::Head(ChainHeadEvent { block }));
                }
                worker.chain.post_chain_events(events);

                worker.unconfirmed.insert(number, hash);
                worker.building.store(false, Ordering::SeqCst);
            }
        }
        debug!(target: "miner", "result channel closed, result loop terminating");
    }

    /// Assemble and dispatch a fresh candidate on top of the current
    /// chain head.
    pub async fn commit_new_work(&self) {
        let settings = self.mu.lock().await;
        let mut possible_uncles = self.uncle_mu.lock().await;
        let mut current = self.current_mu.lock().await;

        let tstart = Instant::now();
        let parent = self.chain.current_block();
        self.building.store(true, Ordering::SeqCst);

        let now = unix_time();
        let mut tstamp = now;
        if parent.time() >= tstamp {
            tstamp = parent.time() + 1;
        }
        // Never run more than one second ahead of the clock.
        if tstamp > now + 1 {
            let wait = Duration::from_secs(tstamp - now);
            info!(target: "miner", wait_secs = wait.as_secs(), "mining too far in the future, waiting");
            tokio::time::sleep(wait).await;
        }

        let mut header = SnailHeader {
            parent_hash: parent.hash(),
            number: parent.number() + 1,
            to_elect: settings.to_elect,
            publickey: settings.publickey.clone(),
            extra: settings.extra.clone(),
            time: tstamp,
            ..Default::default()
        };
        // Only set the coinbase while mining, avoiding spurious rewards.
        if self.is_mining() {
            header.coinbase = settings.coinbase;
        }

        let reader: &dyn SnailchainReader = &*self.chain;
        if let Err(err) = self.engine.prepare(reader, &mut header) {
            error!(target: "miner", %err, "failed to prepare header for mining");
            self.building.store(false, Ordering::SeqCst);
            return;
        }

        let pointer_number = parent.number().saturating_sub(POINTER_HASH_FRESH);
        let Some(pointer) = self.chain.block_by_number(pointer_number) else {
            error!(target: "miner", pointer_number, "pointer block missing from canonical chain");
            self.building.store(false, Ordering::SeqCst);
            return;
        };
        header.pointer_hash = pointer.hash();

        self.chain_config.apply_dao_extra(&mut header);

        let mut work = Work::new(header);
        for ancestor in self.chain.blocks_from_hash(parent.hash(), ANCESTOR_WINDOW) {
            work.family.insert(ancestor.hash());
            work.ancestors.insert(ancestor.hash());
        }

        let fast_blocks = match self.pool.pending_fast_blocks() {
            Ok(blocks) => blocks,
            Err(err) => {
                warn!(target: "miner", %err, "fast-block pool unavailable");
                self.building.store(false, Ordering::SeqCst);
                return;
            }
        };
        let mut fruits = match self.pool.pending_fruits() {
            Ok(fruits) => fruits,
            Err(err) => {
                warn!(target: "miner", %err, "fruit pool unavailable");
                self.building.store(false, Ordering::SeqCst);
                return;
            }
        };
        // In fruit-only mode pending fruits are left for other miners.
        if self.fruit_only() {
            fruits.clear();
        }

        if fast_blocks.is_empty() && fruits.is_empty() {
            debug!(target: "miner", "no pending fruits or fast blocks, not starting");
            self.building.store(false, Ordering::SeqCst);
            return;
        }

        if let Err(err) = self.commit_fast_blocks(&mut work, &fast_blocks) {
            debug!(target: "miner", %err, "no fast block selected");
        }
        if !fruits.is_empty() {
            work.commit_fruits(&fruits, reader);
        }

        let draft = SnailBlock::new(work.header.clone(), work.fruits.clone(), work.signs.clone());
        if draft.fast_number() == 0 && draft.fruits().is_empty() {
            debug!(target: "miner", "candidate empty after selection, not starting");
            self.building.store(false, Ordering::SeqCst);
            return;
        }
        work.block = Some(draft);

        let mut uncles: Vec<SnailHeader> = Vec::new();
        let mut rejected: Vec<B256> = Vec::new();
        for (hash, uncle) in possible_uncles.iter() {
            if uncles.len() == MAX_UNCLES {
                break;
            }
            match work.commit_uncle(&uncle.header) {
                Ok(()) => {
                    debug!(target: "miner", %hash, "committing new uncle to block");
                    uncles.push(uncle.header.clone());
                }
                Err(err) => {
                    trace!(target: "miner", %hash, %err, "bad uncle found and will be removed");
                    rejected.push(*hash);
                }
            }
        }
        for hash in rejected {
            possible_uncles.remove(&hash);
        }

        let finalized = match self.engine.finalize(
            reader,
            work.header.clone(),
            &uncles,
            work.fruits.clone(),
            work.signs.clone(),
        ) {
            Ok(block) => block,
            Err(err) => {
                error!(target: "miner", %err, "failed to finalize block for sealing");
                self.building.store(false, Ordering::SeqCst);
                return;
            }
        };
        work.block = Some(finalized);

        if self.is_mining() {
            info!(
                target: "miner",
                number = work.header.number,
                uncles = uncles.len(),
                fruits = work.fruits.len(),
                fast_number = work.header.fast_number,
                elapsed = ?tstart.elapsed(),
                "commit new mining work"
            );
            self.unconfirmed.shift(work.header.number - 1);
        }

        self.push(&settings, &work);
        self.update_snapshot(&work);
        *current = Some(work);
    }

    /// Pick the first pending fast block above the fruit watermark into
    /// the candidate and copy its signatures.
    fn commit_fast_blocks(&self, work: &mut Work, pending: &[Arc<FastBlock>]) -> MinerResult<()> {
        if !self.is_mining() {
            return Ok(());
        }
        if pending.is_empty() {
            return Err(MinerError::NoFastBlockToMine);
        }

        let watermark = self.fast_block_number.load(Ordering::SeqCst);
        let mut selected: Option<&Arc<FastBlock>> = None;
        for fast_block in pending {
            if watermark == 0 {
                selected = Some(fast_block);
                break;
            }
            // Already sealed as a fruit; the pending view lags.
            if fast_block.number <= watermark {
                continue;
            }
            selected = Some(fast_block);
            break;
        }

        match selected {
            Some(fast_block) => {
                work.header.fast_number = fast_block.number;
                work.header.fast_hash = fast_block.hash;
                work.signs = fast_block.signs().to_vec();
                Ok(())
            }
            None => Err(MinerError::NoFastBlockToMine),
        }
    }

    /// Fan the work out to every registered agent.
    fn push(&self, settings: &Settings, work: &Work) {
        if !self.is_mining() {
            self.building.store(false, Ordering::SeqCst);
            return;
        }
        let work = Arc::new(work.clone());
        for agent in &settings.agents {
            self.at_work.fetch_add(1, Ordering::SeqCst);
            if let Err(err) = agent.work_channel().try_send(work.clone()) {
                self.at_work.fetch_sub(1, Ordering::SeqCst);
                debug!(target: "miner", %err, "agent busy, dispatch dropped");
            }
        }
    }

    /// Rebuild the read-only snapshot handed out while not mining.
    fn update_snapshot(&self, work: &Work) {
        *self.snapshot.write() = Some(SnailBlock::new(
            work.header.clone(),
            work.fruits.clone(),
            work.signs.clone(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InMemorySnailchain;
    use crate::consensus::DevEngine;
    use crate::miner::CpuAgent;
    use crate::pool::InMemorySnailPool;
    use crate::primitives::FastBody;

    struct TestBackend {
        chain: Arc<InMemorySnailchain>,
        pool: Arc<InMemorySnailPool>,
    }

    impl Backend for TestBackend {
        fn snail_chain(&self) -> Arc<dyn Snailchain> {
            self.chain.clone()
        }

        fn snail_pool(&self) -> Arc<dyn SnailPool> {
            self.pool.clone()
        }
    }

    fn genesis() -> SnailBlock {
        SnailBlock::new(SnailHeader::default(), Vec::new(), Vec::new())
    }

    fn fruit(fast_number: u64, pointer_hash: B256) -> Arc<SnailBlock> {
        Arc::new(SnailBlock::new(
            SnailHeader { fast_number, pointer_hash, ..Default::default() },
            Vec::new(),
            Vec::new(),
        ))
    }

    fn fast_block(number: u64) -> Arc<FastBlock> {
        Arc::new(FastBlock::new(number, B256::repeat_byte(number as u8), FastBody::default()))
    }

    async fn spawn_worker(
        config: MinerConfig,
    ) -> (
        Arc<Worker>,
        Arc<InMemorySnailchain>,
        Arc<InMemorySnailPool>,
        broadcast::Receiver<NewMinedBlockEvent>,
    ) {
        let chain = Arc::new(InMemorySnailchain::new(genesis()));
        let pool = Arc::new(InMemorySnailPool::new());
        let backend = TestBackend { chain: chain.clone(), pool: pool.clone() };
        let (mux, mux_rx) = broadcast::channel(16);
        let worker = Worker::spawn(config, Arc::new(DevEngine::new()), &backend, mux).await;
        (worker, chain, pool, mux_rx)
    }

    fn default_config() -> MinerConfig {
        MinerConfig::new(Address::repeat_byte(0xaa))
    }

    /// Extend the canonical chain with an empty (fruitless) block.
    fn extend_chain(chain: &InMemorySnailchain) -> Arc<SnailBlock> {
        let head = chain.current_block();
        let block = SnailBlock::new(
            SnailHeader {
                parent_hash: head.hash(),
                number: head.number() + 1,
                time: head.time() + 1,
                ..Default::default()
            },
            Vec::new(),
            Vec::new(),
        );
        chain.write_canonical_block(block).unwrap();
        chain.current_block()
    }

    #[tokio::test]
    async fn test_nothing_to_mine_releases_latch() {
        let (worker, _chain, _pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;

        worker.commit_new_work().await;

        assert!(!worker.is_building());
        assert!(worker.pending_snail_block().await.is_none());
    }

    #[tokio::test]
    async fn test_fruit_only_candidate_is_pure_fruit() {
        let (worker, chain, pool, _mux) = spawn_worker(default_config()).await;
        worker.set_fruit_only(true);
        worker.start().await;

        let anchor = chain.current_block().hash();
        pool.add_remote_fruits(vec![fruit(10, anchor), fruit(11, anchor), fruit(12, anchor)])
            .unwrap();
        pool.add_fast_blocks(vec![fast_block(5)]);

        worker.commit_new_work().await;

        let candidate = worker.pending_snail_block().await.expect("candidate built");
        assert_eq!(candidate.fast_number(), 5);
        assert!(candidate.fruits().is_empty());
        assert!(candidate.is_fruit());
        // Dispatched work keeps the latch held until a result lands.
        assert!(worker.is_building());
    }

    #[tokio::test]
    async fn test_fruits_only_candidate_when_no_fast_blocks() {
        let (worker, chain, pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;

        let anchor = chain.current_block().hash();
        pool.add_remote_fruits(vec![fruit(10, anchor), fruit(11, anchor), fruit(12, anchor)])
            .unwrap();

        worker.commit_new_work().await;

        let candidate = worker.pending_snail_block().await.expect("candidate built");
        assert_eq!(candidate.fast_number(), 0);
        assert_eq!(
            candidate.fruits().iter().map(|f| f.fast_number()).collect::<Vec<_>>(),
            vec![10, 11, 12]
        );
        assert!(!candidate.is_fruit());
    }

    #[tokio::test]
    async fn test_fast_block_selection_skips_watermark() {
        let (worker, _chain, pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;
        worker.fast_block_number.store(55, Ordering::SeqCst);

        pool.add_fast_blocks(vec![fast_block(50), fast_block(55), fast_block(56)]);
        worker.commit_new_work().await;

        let candidate = worker.pending_snail_block().await.expect("candidate built");
        assert_eq!(candidate.fast_number(), 56);
        assert_eq!(candidate.fast_hash(), B256::repeat_byte(56));
    }

    #[tokio::test]
    async fn test_fast_block_signs_copied() {
        let (worker, _chain, pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;

        let mut fb = FastBlock::new(7, B256::repeat_byte(7), FastBody::default());
        fb.body.signs.push(crate::primitives::PbftSign {
            fast_number: 7,
            fast_hash: fb.hash,
            sign: Bytes::from_static(&[1, 2, 3]),
        });
        pool.add_fast_blocks(vec![Arc::new(fb)]);

        worker.commit_new_work().await;
        let candidate = worker.pending_snail_block().await.expect("candidate built");
        assert_eq!(candidate.signs().len(), 1);
        assert_eq!(candidate.signs()[0].fast_number, 7);
    }

    #[tokio::test]
    async fn test_pointer_hash_anchoring() {
        let (worker, chain, pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;

        for _ in 1..=10 {
            extend_chain(&chain);
        }
        pool.add_fast_blocks(vec![fast_block(200)]);

        worker.commit_new_work().await;
        let candidate = worker.pending_snail_block().await.expect("candidate built");

        // parent.number (10) - 7 = 3.
        assert_eq!(
            candidate.pointer_hash(),
            chain.block_by_number(3).unwrap().hash()
        );
    }

    #[tokio::test]
    async fn test_continuity_gap_against_parent() {
        let (worker, chain, pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;

        // Head embeds fruits up to fast-number 40.
        let head = chain.current_block();
        let embedded = vec![
            (*fruit(39, head.hash())).clone(),
            (*fruit(40, head.hash())).clone(),
        ];
        let block = SnailBlock::new(
            SnailHeader { parent_hash: head.hash(), number: 1, time: 1, ..Default::default() },
            embedded,
            Vec::new(),
        );
        chain.write_canonical_block(block).unwrap();

        let anchor = chain.current_block().hash();
        pool.add_remote_fruits(vec![
            fruit(41, anchor),
            fruit(42, anchor),
            fruit(44, anchor),
            fruit(45, anchor),
        ])
        .unwrap();

        worker.commit_new_work().await;
        let candidate = worker.pending_snail_block().await.expect("candidate built");
        assert_eq!(
            candidate.fruits().iter().map(|f| f.fast_number()).collect::<Vec<_>>(),
            vec![41, 42]
        );
    }

    #[tokio::test]
    async fn test_uncle_admission_caps_at_two() {
        let (worker, chain, pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;

        extend_chain(&chain);
        let b2 = extend_chain(&chain);

        // Three valid siblings of the head plus one orphan.
        let mut uncles = worker.uncle_mu.lock().await;
        for n in 0..3u64 {
            let sibling = SnailBlock::new(
                SnailHeader {
                    parent_hash: b2.parent_hash(),
                    number: b2.number(),
                    time: b2.time() + 10 + n,
                    ..Default::default()
                },
                Vec::new(),
                Vec::new(),
            );
            uncles.insert(sibling.hash(), Arc::new(sibling));
        }
        let orphan = SnailBlock::new(
            SnailHeader {
                parent_hash: B256::repeat_byte(0x99),
                number: 9,
                ..Default::default()
            },
            Vec::new(),
            Vec::new(),
        );
        uncles.insert(orphan.hash(), Arc::new(orphan.clone()));
        drop(uncles);

        pool.add_fast_blocks(vec![fast_block(500)]);
        worker.commit_new_work().await;

        let admitted = worker
            .current_mu
            .lock()
            .await
            .as_ref()
            .map(|work| work.uncles.len())
            .unwrap();
        assert_eq!(admitted, MAX_UNCLES);

        // The orphan was evicted; the valid-but-unpicked sibling stays.
        let uncles = worker.uncle_mu.lock().await;
        assert!(!uncles.contains_key(&orphan.hash()));
        assert_eq!(uncles.len(), 3);
    }

    #[tokio::test]
    async fn test_side_event_collects_possible_uncle() {
        let (worker, chain, _pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;

        let head = extend_chain(&chain);
        // A sibling of the head: written as a side block, which the
        // chain announces on the side feed.
        let sibling = SnailBlock::new(
            SnailHeader {
                parent_hash: head.parent_hash(),
                number: head.number(),
                time: head.time() + 5,
                ..Default::default()
            },
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(chain.write_canonical_block(sibling.clone()).unwrap(), WriteStatus::Side);

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if worker.uncle_mu.lock().await.contains_key(&sibling.hash()) {
                break;
            }
            assert!(Instant::now() < deadline, "side block never reached possibleUncles");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_watermark_dedup_in_result_loop() {
        let (worker, _chain, pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;

        let mut fruit_events = pool.subscribe_new_fruits();
        let sealed = SnailBlock::new(
            SnailHeader { number: 1, fast_number: 55, ..Default::default() },
            Vec::new(),
            Vec::new(),
        );
        let work = Arc::new(Work::new(sealed.header.clone()));

        let tx = worker.result_tx.clone();
        tx.send(MinedResult { work: work.clone(), block: sealed.clone() }).await.unwrap();
        tx.send(MinedResult { work, block: sealed }).await.unwrap();

        // First result reaches the pool...
        let event =
            tokio::time::timeout(Duration::from_secs(1), fruit_events.recv()).await.unwrap().unwrap();
        assert_eq!(event.fruits[0].fast_number(), 55);

        // ...the duplicate does not.
        assert!(
            tokio::time::timeout(Duration::from_millis(200), fruit_events.recv()).await.is_err()
        );
        assert_eq!(pool.fruit_count(), 1);
        assert_eq!(worker.fast_block_number.load(Ordering::SeqCst), 55);
        assert!(!worker.is_building());
    }

    #[tokio::test]
    async fn test_block_result_written_and_announced() {
        let (worker, chain, _pool, mut mux_rx) = spawn_worker(default_config()).await;
        worker.start().await;

        let mut head_events = chain.subscribe_chain_head();
        let parent = chain.current_block();
        let embedded = (*fruit(1, parent.hash())).clone();
        let sealed = SnailBlock::new(
            SnailHeader {
                parent_hash: parent.hash(),
                number: 1,
                time: 1,
                ..Default::default()
            },
            vec![embedded],
            Vec::new(),
        );
        let work = Arc::new(Work::new(sealed.header.clone()));

        worker.result_tx.clone().send(MinedResult { work, block: sealed.clone() }).await.unwrap();

        let mined = tokio::time::timeout(Duration::from_secs(1), mux_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mined.block.number(), 1);
        assert_eq!(chain.current_block().hash(), sealed.hash());

        let head = tokio::time::timeout(Duration::from_secs(1), head_events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(head.block.hash(), sealed.hash());

        assert_eq!(worker.unconfirmed.len(), 1);
        assert!(!worker.is_building());
    }

    #[tokio::test]
    async fn test_snapshot_served_while_not_mining() {
        let (worker, chain, pool, _mux) = spawn_worker(default_config()).await;

        let anchor = chain.current_block().hash();
        pool.add_remote_fruits(vec![fruit(10, anchor)]).unwrap();
        worker.commit_new_work().await;

        // Mining is off: the accessor serves the snapshot, the latch is
        // released by the dispatch path, and no coinbase was set.
        let candidate = worker.pending_snail_block().await.expect("snapshot built");
        assert_eq!(candidate.fruits().len(), 1);
        assert_eq!(candidate.header.coinbase, Address::ZERO);
        assert!(!worker.is_building());
    }

    #[tokio::test]
    async fn test_event_triggered_rebuild() {
        let (worker, _chain, pool, _mux) = spawn_worker(default_config()).await;
        worker.start().await;

        pool.add_fast_blocks(vec![fast_block(5)]);

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(candidate) = worker.pending_snail_block().await {
                if candidate.fast_number() == 5 {
                    break;
                }
            }
            assert!(Instant::now() < deadline, "fast-block event never produced a candidate");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_with_cpu_agent() {
        let (worker, chain, pool, mut mux_rx) = spawn_worker(default_config()).await;

        let agent: Arc<dyn Agent> = Arc::new(CpuAgent::new(Arc::new(DevEngine::new())));
        worker.register(agent).await;
        worker.start().await;

        // One fast block in: the worker seals a fruit for it, the fruit
        // lands in the pool, and the follow-up cycle packs it into a
        // full block that reaches the chain.
        pool.add_fast_blocks(vec![fast_block(1)]);

        let mined = tokio::time::timeout(Duration::from_secs(5), mux_rx.recv())
            .await
            .expect("no block mined")
            .unwrap();
        assert_eq!(mined.block.number(), 1);
        assert_eq!(mined.block.fruits().len(), 1);
        assert_eq!(mined.block.fruits()[0].fast_number(), 1);
        assert_eq!(chain.current_block().number(), 1);

        worker.stop().await;
    }
}
