//! Worker thread pools
//!
//! A fixed set of worker threads fed through a crossbeam channel. The scene
//! core uses two of them: one fans out the per-object animation tasks and joins
//! them before the scenegraph update, the other runs background scene
//! conversion for asynchronous library loads.
//!
//! A pool built with zero workers runs every job inline on the calling thread.

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// In-flight job counter used by [`TaskPool::work_and_wait`]
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn begin(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self.idle.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Decrements the pending counter even when the job panics
struct FinishGuard(Arc<Pending>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Fixed-size pool of worker threads
pub struct TaskPool {
    name: String,
    workers: Vec<Worker>,
    sender: Option<Sender<Job>>,
    pending: Arc<Pending>,
}

impl TaskPool {
    /// Create a pool with `size` worker threads named after `name`
    pub fn new(name: &str, size: usize) -> Self {
        let (sender, receiver) = unbounded::<Job>();

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            match Worker::spawn(name, id, receiver.clone()) {
                Ok(worker) => workers.push(worker),
                Err(err) => log::error!("Failed to spawn {} worker {}: {}", name, id, err),
            }
        }

        log::debug!("Task pool '{}' started with {} workers", name, workers.len());

        Self {
            name: name.to_string(),
            workers,
            sender: Some(sender),
            pending: Arc::new(Pending::default()),
        }
    }

    /// Name given at construction
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job; runs inline when the pool has no workers
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.begin();
        let guard = FinishGuard(Arc::clone(&self.pending));
        let job: Job = Box::new(move || {
            let _guard = guard;
            f();
        });

        match &self.sender {
            Some(sender) if !self.workers.is_empty() => {
                if let Err(err) = sender.send(job) {
                    log::error!("Task pool '{}' channel closed, running job inline", self.name);
                    (err.into_inner())();
                }
            }
            _ => job(),
        }
    }

    /// Block until every queued job has finished
    pub fn work_and_wait(&self) {
        self.pending.wait_idle();
    }

    /// Run `f` over every item on the pool and join.
    ///
    /// Results come back in submission order. A job that panics contributes
    /// no result; the panic is logged by the worker.
    pub fn scatter<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let count = items.len();
        let f = Arc::new(f);
        let (result_tx, result_rx) = unbounded();

        for (index, item) in items.into_iter().enumerate() {
            let f = Arc::clone(&f);
            let result_tx = result_tx.clone();
            self.execute(move || {
                let result = (*f)(item);
                let _ = result_tx.send((index, result));
            });
        }
        drop(result_tx);

        // Every sender is dropped once its job ends, so this is the join barrier
        let mut slots: Vec<Option<R>> = (0..count).map(|_| None).collect();
        for (index, result) in result_rx.iter() {
            slots[index] = Some(result);
        }

        let results: Vec<R> = slots.into_iter().flatten().collect();
        if results.len() != count {
            log::error!(
                "Task pool '{}': {} of {} tasks produced no result",
                self.name,
                count - results.len(),
                count
            );
        }
        results
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // Closing the channel ends each worker loop
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.thread.join().is_err() {
                log::error!("Task pool '{}' worker {} terminated abnormally", self.name, worker.id);
            }
        }
    }
}

struct Worker {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn spawn(pool: &str, id: usize, receiver: Receiver<Job>) -> std::io::Result<Self> {
        let thread_name = format!("{pool}-{id}");
        let thread = thread::Builder::new().name(thread_name).spawn(move || {
            while let Ok(job) = receiver.recv() {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    log::error!("Worker {} job panicked", id);
                }
            }
        })?;

        Ok(Self { id, thread })
    }
}
