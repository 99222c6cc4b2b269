//! Background layout execution.
//!
//! Layout runs on a dedicated thread. Inputs are moved in as an owned
//! [`LayoutInput`] and results come back as an owned primitive vector, so
//! nothing is shared mutably between the threads. At most one computation
//! is in flight; see [`WorkerBridge::submit`].

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::color::ColorTable;
use crate::draw_list::DrawList;
use crate::error::EngineError;
use crate::layout::{self, LayoutSettings};
use crate::primitive::DrawPrimitive;
use crate::tree::Tree;

/// Snapshot moved to the worker for one computation.
#[derive(Clone, Debug)]
pub struct LayoutInput {
    pub tree: Tree,
    pub settings: LayoutSettings,
    pub colors: ColorTable,
}

type LayoutFn = dyn Fn(&Tree, &LayoutSettings, &ColorTable) -> Vec<DrawPrimitive> + Send;

enum Outcome {
    Running,
    Ready(Vec<DrawPrimitive>),
    /// A newer override submission replaced this one, or the worker failed
    Discarded,
    Taken,
}

struct SlotState {
    outcome: Outcome,
    waker: Option<Waker>,
}

/// Where the worker leaves one computation's result.
struct Slot {
    state: Mutex<SlotState>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                outcome: Outcome::Running,
                waker: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(&self, outcome: Outcome) {
        let waker = {
            let mut state = self.lock();
            state.outcome = outcome;
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn is_running(&self) -> bool {
        matches!(self.lock().outcome, Outcome::Running)
    }
}

struct Request {
    generation: u64,
    input: LayoutInput,
    slot: Arc<Slot>,
}

/// Future of one layout computation.
///
/// Resolves to the arranged [`DrawList`], or `None` when the computation
/// was superseded by an override submission or the worker failed.
pub struct PendingLayout {
    generation: u64,
    subtree_size: usize,
    slot: Arc<Slot>,
}

impl PendingLayout {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Non-blocking check, for callers polling from a frame loop.
    pub fn try_take(&mut self) -> Poll<Option<DrawList>> {
        let mut state = self.slot.lock();
        match std::mem::replace(&mut state.outcome, Outcome::Taken) {
            Outcome::Running => {
                state.outcome = Outcome::Running;
                Poll::Pending
            }
            Outcome::Ready(primitives) => {
                Poll::Ready(Some(DrawList::arrange(primitives, self.subtree_size)))
            }
            Outcome::Discarded | Outcome::Taken => Poll::Ready(None),
        }
    }
}

impl Future for PendingLayout {
    type Output = Option<DrawList>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.try_take() {
            Poll::Pending => {
                let mut state = this.slot.lock();
                // the worker may have finished between the two locks
                if matches!(state.outcome, Outcome::Running) {
                    state.waker = Some(cx.waker().clone());
                    Poll::Pending
                } else {
                    drop(state);
                    this.try_take()
                }
            }
            ready => ready,
        }
    }
}

/// Single-in-flight bridge to the layout thread.
pub struct WorkerBridge {
    sender: Option<Sender<Request>>,
    handle: Option<JoinHandle<()>>,
    latest: Arc<AtomicU64>,
    generation: u64,
    current: Option<Arc<Slot>>,
}

impl WorkerBridge {
    /// Start the worker running [`layout::compute`].
    pub fn spawn() -> Result<Self, EngineError> {
        Self::with_layout(layout::compute)
    }

    /// Start the worker with a custom layout function.
    pub fn with_layout<F>(layout: F) -> Result<Self, EngineError>
    where
        F: Fn(&Tree, &LayoutSettings, &ColorTable) -> Vec<DrawPrimitive> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<Request>();
        let latest = Arc::new(AtomicU64::new(0));
        let worker_latest = Arc::clone(&latest);
        let layout: Box<LayoutFn> = Box::new(layout);

        let handle = thread::Builder::new()
            .name("canopy-layout".to_string())
            .spawn(move || {
                while let Ok(request) = receiver.recv() {
                    run_request(&*layout, request, &worker_latest);
                }
                log::debug!("Layout worker exiting");
            })?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            latest,
            generation: 0,
            current: None,
        })
    }

    /// True while the most recent submission has not finished.
    pub fn is_busy(&self) -> bool {
        self.current.as_ref().is_some_and(|slot| slot.is_running())
    }

    /// Dispatch a layout computation.
    ///
    /// Returns `None` without doing any work when the tree is empty, when
    /// a computation is already in flight and `force` is false, or when
    /// the worker has stopped. With `force`, the new request supersedes
    /// whatever is in flight: the older future resolves to `None`.
    pub fn submit(&mut self, input: LayoutInput, force: bool) -> Option<PendingLayout> {
        if input.tree.is_empty() {
            log::debug!("Skipping layout of an empty tree");
            return None;
        }
        if self.is_busy() && !force {
            log::debug!("Layout already in flight; request dropped");
            return None;
        }
        let sender = self.sender.as_ref()?;

        self.generation += 1;
        self.latest.store(self.generation, Ordering::SeqCst);
        let slot = Arc::new(Slot::new());
        let subtree_size = input.tree.subtree_size();
        let request = Request {
            generation: self.generation,
            input,
            slot: Arc::clone(&slot),
        };
        if sender.send(request).is_err() {
            log::error!("Layout worker is gone; request dropped");
            return None;
        }

        log::info!(
            "Layout {} dispatched ({} nodes)",
            self.generation,
            subtree_size
        );
        self.current = Some(Arc::clone(&slot));
        Some(PendingLayout {
            generation: self.generation,
            subtree_size,
            slot,
        })
    }

    /// Stop the worker thread, waiting for any computation in flight.
    pub fn shutdown(&mut self) {
        self.sender = None;
        self.current = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Layout worker panicked");
            }
        }
    }
}

impl Drop for WorkerBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_request(layout: &LayoutFn, request: Request, latest: &AtomicU64) {
    let Request {
        generation,
        input,
        slot,
    } = request;

    if generation < latest.load(Ordering::SeqCst) {
        log::debug!("Layout {} superseded before it started", generation);
        slot.complete(Outcome::Discarded);
        return;
    }

    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        layout(&input.tree, &input.settings, &input.colors)
    }));

    match result {
        Ok(_) if generation < latest.load(Ordering::SeqCst) => {
            log::debug!("Layout {} superseded; result discarded", generation);
            slot.complete(Outcome::Discarded);
        }
        Ok(primitives) => {
            log::info!(
                "Layout {} resolved: {} primitives in {:?}",
                generation,
                primitives.len(),
                started.elapsed()
            );
            slot.complete(Outcome::Ready(primitives));
        }
        Err(_) => {
            log::error!("Layout {} panicked", generation);
            slot.complete(Outcome::Discarded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{sample_tree, NodeSpec};
    use std::sync::atomic::AtomicUsize;

    fn input(tree: Tree) -> LayoutInput {
        LayoutInput {
            colors: ColorTable::default(),
            settings: LayoutSettings::default(),
            tree,
        }
    }

    /// Worker whose every computation waits for a message on the gate.
    fn gated() -> (WorkerBridge, Sender<()>, Arc<AtomicUsize>) {
        let (gate, wait) = mpsc::channel::<()>();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let bridge = WorkerBridge::with_layout(move |tree, settings, colors| {
            let _ = wait.recv();
            counter.fetch_add(1, Ordering::SeqCst);
            layout::compute(tree, settings, colors)
        })
        .unwrap();
        (bridge, gate, runs)
    }

    #[test]
    fn test_resolves_arranged_list() {
        let mut bridge = WorkerBridge::spawn().unwrap();
        let pending = bridge.submit(input(sample_tree()), false).unwrap();
        let list = pollster::block_on(pending).unwrap();
        assert_eq!(list.len(), 9);
        for id in 0..9 {
            assert_eq!(list.get(id).unwrap().identifier, Some(id));
        }
        assert!(!bridge.is_busy());
    }

    #[test]
    fn test_empty_tree_not_dispatched() {
        let mut bridge = WorkerBridge::spawn().unwrap();
        assert!(bridge.submit(input(Tree::empty()), false).is_none());
        assert!(!bridge.is_busy());
    }

    #[test]
    fn test_busy_submission_dropped() {
        let (mut bridge, gate, runs) = gated();
        let first = bridge.submit(input(sample_tree()), false).unwrap();
        assert!(bridge.is_busy());

        let other = Tree::from_spec(NodeSpec::new("other"));
        assert!(bridge.submit(input(other), false).is_none());

        gate.send(()).unwrap();
        let list = pollster::block_on(first).unwrap();
        assert_eq!(list.len(), 9);
        assert_eq!(list.get(0).unwrap().identifier, Some(0));

        bridge.shutdown();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_force_supersedes_in_flight() {
        let (mut bridge, gate, _runs) = gated();
        let first = bridge.submit(input(sample_tree()), false).unwrap();
        let single = Tree::from_spec(NodeSpec::new("single"));
        let second = bridge.submit(input(single), true).unwrap();
        assert!(second.generation() > first.generation());

        gate.send(()).unwrap();
        gate.send(()).unwrap();
        assert!(pollster::block_on(first).is_none());
        let list = pollster::block_on(second).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_try_take_polls_without_blocking() {
        let (mut bridge, gate, _runs) = gated();
        let mut pending = bridge.submit(input(sample_tree()), false).unwrap();
        assert!(pending.try_take().is_pending());
        gate.send(()).unwrap();
        let list = loop {
            if let Poll::Ready(list) = pending.try_take() {
                break list;
            }
            thread::yield_now();
        };
        assert_eq!(list.unwrap().len(), 9);
        assert_eq!(pending.try_take(), Poll::Ready(None));
    }
}
