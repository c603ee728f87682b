// Queue Set - one wait point over many queues

use super::fifo::{Poll, Queue};
use super::signal::{Signal, Wake};
use super::{lock, QueueError};
use crate::domain::ItemKind;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Item pulled from a queue set together with its provenance
#[derive(Debug)]
pub struct Delivery<T, C> {
    pub kind: ItemKind,
    pub item: T,
    /// Context registered with the source queue in `QueueSet::add`
    pub context: C,
}

struct Member<T, C> {
    queue: Arc<Queue<T>>,
    context: C,
}

struct Members<T, C> {
    list: Vec<Member<T, C>>,
    /// Next member to poll first; advanced past every member served
    cursor: usize,
}

enum Scan<T, C> {
    Ready(Delivery<T, C>),
    /// Nothing queued, at least one member may still produce work
    Idle,
    /// Every member is closed and drained
    Exhausted,
}

/// Multiplexes a dynamic set of queues behind one blocking wait.
///
/// Members are polled round-robin starting after the last member served,
/// so with M members each non-empty member is served within M consecutive
/// deliveries regardless of how skewed the load is.
pub struct QueueSet<T, C = ()> {
    members: Mutex<Members<T, C>>,
    signal: Arc<Signal>,
}

impl<T, C: Clone> QueueSet<T, C> {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(Members {
                list: Vec::new(),
                cursor: 0,
            }),
            signal: Arc::new(Signal::default()),
        }
    }

    /// Register `queue`; `context` is handed back with every item it yields.
    ///
    /// # Errors
    /// - `QueueError::AlreadyMember` if the queue belongs to a set already
    pub fn add(&self, queue: Arc<Queue<T>>, context: C) -> Result<(), QueueError> {
        let mut members = lock(&self.members);
        queue.attach(Arc::clone(&self.signal))?;
        members.list.push(Member { queue, context });
        drop(members);

        // The queue may already hold items
        self.signal.notify_all();
        Ok(())
    }

    /// Unregister `queue` without closing it. Returns false if it was not a member.
    pub fn remove(&self, queue: &Arc<Queue<T>>) -> bool {
        let mut members = lock(&self.members);
        let Some(pos) = members
            .list
            .iter()
            .position(|m| Arc::ptr_eq(&m.queue, queue))
        else {
            return false;
        };

        let member = members.list.remove(pos);
        member.queue.detach();
        if members.cursor > pos {
            members.cursor -= 1;
        }
        if members.cursor >= members.list.len() {
            members.cursor = 0;
        }
        drop(members);

        // Removing the last open member can exhaust the set
        self.signal.notify_all();
        true
    }

    /// Block until any member yields an item.
    ///
    /// Returns `None` when every member is closed and drained, or when an
    /// exit was requested through `resume_threads` and no work is queued.
    /// A set without members blocks: members may still be added.
    pub fn wait_any_blocking(&self) -> Option<Delivery<T, C>> {
        loop {
            let seen = self.signal.generation();
            match self.scan() {
                Scan::Ready(delivery) => return Some(delivery),
                Scan::Exhausted => return None,
                Scan::Idle => {}
            }
            if let Wake::Resumed = self.signal.wait_change(seen) {
                return None;
            }
        }
    }

    /// Wake one waiter and make it return `None` if it finds no work.
    pub fn resume_threads(&self) {
        self.signal.resume_one();
    }

    /// Drop exit requests no waiter consumed
    pub(crate) fn discard_resumes(&self) {
        self.signal.discard_resumes();
    }

    pub fn queue_count(&self) -> usize {
        lock(&self.members).list.len()
    }

    /// Items queued across all members
    pub fn item_count(&self) -> usize {
        lock(&self.members)
            .list
            .iter()
            .map(|m| m.queue.len())
            .sum()
    }

    fn scan(&self) -> Scan<T, C> {
        let mut members = lock(&self.members);
        let len = members.list.len();
        if len == 0 {
            return Scan::Idle;
        }

        let start = members.cursor % len;
        let mut exhausted = true;
        for offset in 0..len {
            let index = (start + offset) % len;
            let member = &members.list[index];
            match member.queue.poll() {
                Poll::Ready(kind, item) => {
                    let context = member.context.clone();
                    members.cursor = (index + 1) % len;
                    return Scan::Ready(Delivery {
                        kind,
                        item,
                        context,
                    });
                }
                Poll::Empty { closed } => exhausted &= closed,
            }
        }

        if exhausted {
            Scan::Exhausted
        } else {
            Scan::Idle
        }
    }
}

impl<T, C: Clone> Default for QueueSet<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> fmt::Debug for QueueSet<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members = lock(&self.members);
        f.debug_struct("QueueSet")
            .field("queues", &members.list.len())
            .field("cursor", &members.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn filled(items: std::ops::Range<u32>) -> Arc<Queue<u32>> {
        let queue = Arc::new(Queue::new());
        for i in items {
            queue.enqueue(i, ItemKind::Rpc).unwrap();
        }
        queue
    }

    #[test]
    fn test_delivery_carries_source_context() {
        let qset: QueueSet<u32, &str> = QueueSet::new();
        let queue = filled(0..1);
        qset.add(Arc::clone(&queue), "peer").unwrap();

        let delivery = qset.wait_any_blocking().unwrap();
        assert_eq!(delivery.item, 0);
        assert_eq!(delivery.kind, ItemKind::Rpc);
        assert_eq!(delivery.context, "peer");
    }

    #[test]
    fn test_round_robin_across_members() {
        let qset: QueueSet<u32, usize> = QueueSet::new();
        for id in 0..3 {
            qset.add(filled(0..10), id).unwrap();
        }

        let served: Vec<usize> = (0..9)
            .map(|_| qset.wait_any_blocking().unwrap().context)
            .collect();
        assert_eq!(served, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
        assert_eq!(qset.item_count(), 21);
    }

    #[test]
    fn test_skewed_load_does_not_starve() {
        let qset: QueueSet<u32, usize> = QueueSet::new();
        let heavy = filled(0..1000);
        let light = filled(0..1);
        qset.add(heavy, 0).unwrap();
        qset.add(light, 1).unwrap();

        let first_two: Vec<usize> = (0..2)
            .map(|_| qset.wait_any_blocking().unwrap().context)
            .collect();
        assert!(first_two.contains(&1));
    }

    #[test]
    fn test_none_only_when_all_members_closed_and_drained() {
        let qset: QueueSet<u32> = QueueSet::new();
        let a = filled(0..1);
        let b = filled(0..0);
        qset.add(Arc::clone(&a), ()).unwrap();
        qset.add(Arc::clone(&b), ()).unwrap();

        a.close();
        b.close();
        assert_eq!(qset.wait_any_blocking().map(|d| d.item), Some(0));
        assert!(qset.wait_any_blocking().is_none());
    }

    #[test]
    fn test_waiter_wakes_on_enqueue() {
        let qset: Arc<QueueSet<u32>> = Arc::new(QueueSet::new());
        let queue = Arc::new(Queue::new());
        qset.add(Arc::clone(&queue), ()).unwrap();

        let waiter = {
            let qset = Arc::clone(&qset);
            thread::spawn(move || qset.wait_any_blocking().map(|d| d.item))
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue(42, ItemKind::Rpc).unwrap();
        assert_eq!(waiter.join().unwrap(), Some(42));
    }

    #[test]
    fn test_close_wakes_all_waiters() {
        let qset: Arc<QueueSet<u32>> = Arc::new(QueueSet::new());
        let queue = Arc::new(Queue::new());
        qset.add(Arc::clone(&queue), ()).unwrap();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let qset = Arc::clone(&qset);
                thread::spawn(move || qset.wait_any_blocking().is_none())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.close();
        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }

    #[test]
    fn test_resume_releases_idle_waiter() {
        let qset: Arc<QueueSet<u32>> = Arc::new(QueueSet::new());
        qset.add(Arc::new(Queue::new()), ()).unwrap();

        let waiter = {
            let qset = Arc::clone(&qset);
            thread::spawn(move || qset.wait_any_blocking().is_none())
        };

        thread::sleep(Duration::from_millis(20));
        qset.resume_threads();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_queue_joins_one_set_only() {
        let first: QueueSet<u32> = QueueSet::new();
        let second: QueueSet<u32> = QueueSet::new();
        let queue = Arc::new(Queue::new());

        first.add(Arc::clone(&queue), ()).unwrap();
        assert_eq!(
            second.add(Arc::clone(&queue), ()),
            Err(QueueError::AlreadyMember)
        );

        assert!(first.remove(&queue));
        assert!(!first.remove(&queue));
        assert!(second.add(queue, ()).is_ok());
        assert_eq!(first.queue_count(), 0);
        assert_eq!(second.queue_count(), 1);
    }

    #[test]
    fn test_removed_member_is_not_polled() {
        let qset: QueueSet<u32, usize> = QueueSet::new();
        let a = filled(0..3);
        let b = filled(100..103);
        qset.add(Arc::clone(&a), 0).unwrap();
        qset.add(Arc::clone(&b), 1).unwrap();
        assert!(qset.remove(&a));

        b.close();
        let items: Vec<u32> =
            std::iter::from_fn(|| qset.wait_any_blocking().map(|d| d.item)).collect();
        assert_eq!(items, vec![100, 101, 102]);
        // Removal does not drain or close the queue
        assert_eq!(a.len(), 3);
        assert!(!a.is_closed());
    }
}
