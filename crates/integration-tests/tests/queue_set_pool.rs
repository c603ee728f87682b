//! Queue set and worker pool tests
//!
//! Several queues multiplexed into one set, served by a shared pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;

use peerq_core::application::{PeerQueueSet, WorkerContext, WorkerPool, WorkerState};
use peerq_core::domain::{ItemKind, MsgType, PeerMsg, RpcHandle, RpcMsg};
use peerq_core::port::peer_handler::mocks::RecordingHandler;
use peerq_core::port::transport::mocks::RecordingTransport;
use peerq_core::queue::{Queue, QueueSet};
use peerq_core::PeerQueueConfig;

const WAIT: Duration = Duration::from_secs(10);
const LABELS: [&str; 3] = ["table", "vnode", "grant"];

fn item(msg_type: MsgType, handle: u64) -> PeerMsg {
    PeerMsg::allocate(&RpcMsg {
        msg_type,
        handle: RpcHandle(handle),
        ahandle: handle,
        content: Vec::new(),
    })
}

/// Queue index encoded in the handle: queue `q`, sequence `n` -> q * 10_000 + n
fn handle_of(queue: usize, seq: usize) -> u64 {
    (queue * 10_000 + seq) as u64
}

fn queue_of(handle: RpcHandle) -> usize {
    (handle.0 / 10_000) as usize
}

fn setup(count: usize) -> (Arc<PeerQueueSet>, Vec<Arc<Queue<PeerMsg>>>) {
    let qset = Arc::new(PeerQueueSet::new());
    let queues: Vec<_> = (0..count)
        .map(|i| {
            let queue = Arc::new(Queue::new());
            qset.add(Arc::clone(&queue), LABELS[i % LABELS.len()]).unwrap();
            queue
        })
        .collect();
    (qset, queues)
}

fn context(handler: &Arc<RecordingHandler>, transport: &Arc<RecordingTransport>) -> WorkerContext {
    WorkerContext {
        handler: handler.clone(),
        transport: transport.clone(),
    }
}

#[test]
fn test_backlogged_queue_does_not_starve_others() {
    let mut rng = rand::thread_rng();
    let (qset, queues) = setup(3);

    let heavy = rng.gen_range(100..300);
    for seq in 0..heavy {
        queues[0]
            .enqueue(item(MsgType::ConfigTable, handle_of(0, seq)), ItemKind::Rpc)
            .unwrap();
    }
    queues[1]
        .enqueue(item(MsgType::ConfigVnode, handle_of(1, 0)), ItemKind::Rpc)
        .unwrap();
    for seq in 0..rng.gen_range(1..20) {
        queues[2]
            .enqueue(item(MsgType::Grant, handle_of(2, seq)), ItemKind::Rpc)
            .unwrap();
    }
    let total = qset.item_count();

    let handler = Arc::new(RecordingHandler::new_success());
    let transport = Arc::new(RecordingTransport::new());
    let mut pool = WorkerPool::new(PeerQueueConfig::new(1), Arc::clone(&qset)).unwrap();
    pool.start(context(&handler, &transport)).unwrap();

    assert!(transport.wait_for(total, WAIT));
    for queue in &queues {
        queue.close();
    }
    pool.shutdown();

    let processed = handler.processed();
    let position = processed
        .iter()
        .position(|(_, h)| queue_of(*h) == 1)
        .unwrap();
    assert!(
        position < queues.len(),
        "lone item served at position {}",
        position
    );
}

#[test]
fn test_per_queue_order_under_round_robin() {
    let mut rng = rand::thread_rng();
    let (qset, queues) = setup(3);

    let mut expected: HashMap<usize, Vec<u64>> = HashMap::new();
    for seq in 0..150 {
        let q = rng.gen_range(0..queues.len());
        let handle = handle_of(q, seq);
        queues[q]
            .enqueue(item(MsgType::Status, handle), ItemKind::Rpc)
            .unwrap();
        expected.entry(q).or_default().push(handle);
    }

    let handler = Arc::new(RecordingHandler::new_success());
    let transport = Arc::new(RecordingTransport::new());
    let mut pool = WorkerPool::new(PeerQueueConfig::new(1), Arc::clone(&qset)).unwrap();
    pool.start(context(&handler, &transport)).unwrap();

    assert!(transport.wait_for(150, WAIT));
    for queue in &queues {
        queue.close();
    }
    pool.shutdown();

    let mut seen: HashMap<usize, Vec<u64>> = HashMap::new();
    for (_, handle) in handler.processed() {
        seen.entry(queue_of(handle)).or_default().push(handle.0);
    }
    assert_eq!(seen, expected);
}

#[test]
fn test_pool_serves_every_item_once_across_queues() {
    let mut rng = rand::thread_rng();
    let (qset, queues) = setup(3);

    let handler = Arc::new(RecordingHandler::new_success());
    let transport = Arc::new(RecordingTransport::new());
    let mut pool = WorkerPool::new(PeerQueueConfig::new(4), Arc::clone(&qset)).unwrap();
    assert_eq!(pool.start(context(&handler, &transport)).unwrap(), 4);

    // Producers race the workers
    let producers: Vec<_> = queues
        .iter()
        .enumerate()
        .map(|(q, queue)| {
            let queue = Arc::clone(queue);
            let count = 50 + rng.gen_range(0..100);
            let producer = thread::spawn(move || {
                for seq in 0..count {
                    queue
                        .enqueue(item(MsgType::Grant, handle_of(q, seq)), ItemKind::Rpc)
                        .unwrap();
                }
            });
            (producer, count)
        })
        .collect();

    let mut total = 0;
    for (producer, count) in producers {
        producer.join().unwrap();
        total += count;
    }
    for queue in &queues {
        queue.close();
    }
    pool.shutdown();

    assert_eq!(qset.item_count(), 0);
    assert!(pool.states().iter().all(|s| *s == WorkerState::Stopped));

    let mut released: Vec<u64> = handler.released().iter().map(|h| h.0).collect();
    released.sort_unstable();
    released.dedup();
    assert_eq!(released.len(), total);
    assert_eq!(transport.responses().len(), total);
}

#[test]
fn test_idle_pool_shuts_down_without_closing_queues() {
    let (qset, queues) = setup(2);
    let handler = Arc::new(RecordingHandler::new_success());
    let transport = Arc::new(RecordingTransport::new());

    let mut pool = WorkerPool::new(PeerQueueConfig::new(3), Arc::clone(&qset)).unwrap();
    pool.start(context(&handler, &transport)).unwrap();
    thread::sleep(Duration::from_millis(20));

    pool.shutdown();
    assert_eq!(pool.running(), 0);
    assert!(pool.states().iter().all(|s| *s == WorkerState::Stopped));

    // Queues stay usable for the next generation of workers
    queues[1]
        .enqueue(item(MsgType::Status, handle_of(1, 0)), ItemKind::Rpc)
        .unwrap();
    pool.start(context(&handler, &transport)).unwrap();
    assert!(transport.wait_for(1, WAIT));
    for queue in &queues {
        queue.close();
    }
    pool.shutdown();
}

#[test]
fn test_queue_joins_one_set_only() {
    let first: QueueSet<PeerMsg, &'static str> = QueueSet::new();
    let second: QueueSet<PeerMsg, &'static str> = QueueSet::new();
    let queue = Arc::new(Queue::new());

    first.add(Arc::clone(&queue), "first").unwrap();
    assert!(second.add(Arc::clone(&queue), "second").is_err());

    assert!(first.remove(&queue));
    second.add(queue, "second").unwrap();
    assert_eq!(second.queue_count(), 1);
    assert_eq!(first.queue_count(), 0);
}
