//! SPMD collectives.
//!
//! All cross-rank communication goes through a [`Communicator`]. Every collective must be
//! called by all ranks of a group in the same order, with buffers of the same length.
//! Ranks with nothing to contribute pass zeros instead of skipping the call.
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::{Arc, Barrier};

/// A group of ranks executing the same program.
pub trait Communicator: Debug + Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Blocks until all ranks of the group have reached the barrier.
    fn barrier(&self);

    /// Replaces `values` on every rank by the elementwise sum over all ranks.
    ///
    /// The summation order is the same on every rank, so all ranks obtain bitwise identical
    /// results.
    fn all_reduce_sum(&self, values: &mut [f64]);
}

/// The trivial communicator of a single process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfCommunicator;

impl Communicator for SelfCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_reduce_sum(&self, _values: &mut [f64]) {}
}

#[derive(Debug)]
struct ThreadGroup {
    barrier: Barrier,
    // One contribution slot per rank
    slots: Mutex<Vec<Vec<f64>>>,
}

/// A rank of an in-process group whose ranks run on separate threads.
#[derive(Debug, Clone)]
pub struct ThreadCommunicator {
    rank: usize,
    size: usize,
    group: Arc<ThreadGroup>,
}

impl ThreadCommunicator {
    /// Creates the communicators of a group with `size` ranks, ordered by rank.
    ///
    /// Each communicator must be moved to its own thread before any collective is called.
    pub fn group(size: usize) -> Vec<Self> {
        assert!(size > 0, "a communicator group needs at least one rank");
        let group = Arc::new(ThreadGroup {
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![Vec::new(); size]),
        });
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                group: Arc::clone(&group),
            })
            .collect()
    }
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.group.barrier.wait();
    }

    fn all_reduce_sum(&self, values: &mut [f64]) {
        {
            let mut slots = self.group.slots.lock();
            slots[self.rank].clear();
            slots[self.rank].extend_from_slice(values);
        }
        self.group.barrier.wait();
        {
            let slots = self.group.slots.lock();
            values.fill(0.0);
            for contribution in slots.iter() {
                assert_eq!(
                    contribution.len(),
                    values.len(),
                    "all ranks must reduce buffers of the same length"
                );
                for (v, c) in values.iter_mut().zip(contribution) {
                    *v += c;
                }
            }
        }
        // Nobody may overwrite its slot before every rank has read all slots
        self.group.barrier.wait();
    }
}

/// Execution context passed explicitly to every operation that takes part in collectives.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    comm: Arc<dyn Communicator>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::serial()
    }
}

impl ExecutionContext {
    pub fn new(comm: impl Communicator + 'static) -> Self {
        Self { comm: Arc::new(comm) }
    }

    /// A context for a single process.
    pub fn serial() -> Self {
        Self::new(SelfCommunicator)
    }

    pub fn communicator(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn size(&self) -> usize {
        self.comm.size()
    }

    pub fn is_root(&self) -> bool {
        self.rank() == 0
    }

    pub fn barrier(&self) {
        self.comm.barrier();
    }

    /// Waits until every rank has arrived, so that rank 0 may act on behalf of the group.
    pub fn sync_to_root(&self) {
        self.comm.barrier();
    }

    /// Waits until rank 0 has finished acting on behalf of the group.
    pub fn sync_from_root(&self) {
        self.comm.barrier();
    }

    pub fn all_reduce_sum(&self, values: &mut [f64]) {
        self.comm.all_reduce_sum(values);
    }

    pub fn all_reduce_sum_scalar(&self, value: f64) -> f64 {
        let mut buffer = [value];
        self.comm.all_reduce_sum(&mut buffer);
        buffer[0]
    }

    /// Whether `flag` holds on at least one rank.
    pub fn any(&self, flag: bool) -> bool {
        self.all_reduce_sum_scalar(if flag { 1.0 } else { 0.0 }) > 0.0
    }

    /// Makes a rank-local outcome collective.
    ///
    /// If any rank failed, the failing ranks return their own error and all other ranks return
    /// `peer_error()`. Must be called by every rank before the next collective that follows
    /// fallible local work.
    pub fn agree<T, E>(
        &self,
        result: std::result::Result<T, E>,
        peer_error: impl FnOnce() -> E,
    ) -> std::result::Result<T, E> {
        let failed = self.any(result.is_err());
        match result {
            Err(err) => Err(err),
            Ok(_) if failed => Err(peer_error()),
            Ok(value) => Ok(value),
        }
    }
}

/// Runs `f` on a threaded group of `size` ranks and returns the results ordered by rank.
pub fn run_threaded<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(ExecutionContext) -> R + Sync,
    R: Send,
{
    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = ThreadCommunicator::group(size)
            .into_iter()
            .map(|comm| scope.spawn(move || f(ExecutionContext::new(comm))))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}
