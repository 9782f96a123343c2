//! Snail node demo.
//!
//! Wires an in-memory chain and pool to the assembly worker with a CPU
//! sealing agent, feeds a handful of fast blocks through the pool, and
//! reports the fruits and blocks that come out the other side.
//!
//! Run with: `cargo run`

use alloy_primitives::{Address, Bytes, B256};
use snail_node::{
    Backend, CpuAgent, DevEngine, FastBlock, FastBody, InMemorySnailPool, InMemorySnailchain,
    MinerConfig, NewMinedBlockEvent, PbftSign, SnailBlock, SnailHeader, SnailPool, Snailchain,
    SnailchainReader, Worker,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::info;

struct NodeBackend {
    chain: Arc<InMemorySnailchain>,
    pool: Arc<InMemorySnailPool>,
}

impl Backend for NodeBackend {
    fn snail_chain(&self) -> Arc<dyn Snailchain> {
        self.chain.clone()
    }

    fn snail_pool(&self) -> Arc<dyn SnailPool> {
        self.pool.clone()
    }
}

fn fast_block(number: u64) -> Arc<FastBlock> {
    let hash = B256::repeat_byte(number as u8);
    let sign = PbftSign { fast_number: number, fast_hash: hash, sign: Bytes::from_static(&[0xcc; 4]) };
    Arc::new(FastBlock::new(number, hash, FastBody { signs: vec![sign] }))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let genesis = SnailBlock::new(SnailHeader::default(), Vec::new(), Vec::new());
    let chain = Arc::new(InMemorySnailchain::new(genesis));
    let pool = Arc::new(InMemorySnailPool::new());
    let backend = NodeBackend { chain: chain.clone(), pool: pool.clone() };

    let engine = Arc::new(DevEngine::new());
    let (mux, mut mined_blocks) = broadcast::channel::<NewMinedBlockEvent>(16);

    let config = MinerConfig::new(Address::repeat_byte(0xaa))
        .with_extra_data(Bytes::from_static(b"snail-node demo"));
    let worker = Worker::spawn(config, engine.clone(), &backend, mux).await;

    worker.register(Arc::new(CpuAgent::new(engine))).await;
    worker.start().await;

    // Feed the fast stream one block at a time; each becomes a fruit,
    // and follow-up cycles pack pending fruits into full blocks.
    for number in 1..=3u64 {
        pool.add_fast_blocks(vec![fast_block(number)]);

        match tokio::time::timeout(Duration::from_secs(5), mined_blocks.recv()).await {
            Ok(Ok(event)) => {
                let block = event.block;
                info!(
                    number = block.number(),
                    fruits = block.fruits().len(),
                    fast_number = block.fast_number(),
                    "block on chain"
                );
                // Absorbed fruits and their fast blocks leave the pool.
                if let Some(last) = block.fruits().last() {
                    pool.remove_below(last.fast_number());
                }
            }
            Ok(Err(err)) => return Err(eyre::eyre!("mined-block feed closed: {err}")),
            Err(_) => info!(number, "no block sealed for this fast block yet"),
        }
    }

    worker.stop().await;

    let head = chain.current_block();
    info!(
        height = head.number(),
        pending_fruits = pool.fruit_count(),
        "demo complete"
    );
    Ok(())
}
