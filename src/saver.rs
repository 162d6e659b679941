//! Background saves with single-flight discipline.
//!
//! A mutation hands a snapshot of the collection to [`BackgroundSaver`],
//! which writes it on tokio's blocking pool and reports the outcome on a
//! completion channel. Only one write may be in flight; a second submission
//! is rejected with [`Error::WriteInProgress`] instead of racing the first
//! one for the same file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::storage::TaskStore;
use crate::task::Task;

/// Delivered once per submitted write.
#[derive(Debug)]
pub struct SaveCompletion {
    /// Sequence number returned by [`BackgroundSaver::submit`].
    pub ticket: u64,
    /// Ids of the tasks the triggering mutation touched.
    pub task_ids: Vec<u64>,
    pub outcome: Result<()>,
}

impl SaveCompletion {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Clears the in-flight flag even if the store panics mid-write.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct BackgroundSaver<S: ?Sized> {
    store: Arc<S>,
    handle: Handle,
    in_flight: Arc<AtomicBool>,
    next_ticket: u64,
    completions: mpsc::UnboundedSender<SaveCompletion>,
}

impl<S> BackgroundSaver<S>
where
    S: TaskStore + ?Sized + 'static,
{
    /// Build a saver running on `handle` and the receiving end of its
    /// completion channel.
    pub fn new(store: Arc<S>, handle: Handle) -> (Self, mpsc::UnboundedReceiver<SaveCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let saver = Self {
            store,
            handle,
            in_flight: Arc::new(AtomicBool::new(false)),
            next_ticket: 0,
            completions: tx,
        };
        (saver, rx)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start writing `tasks`. Returns the ticket carried by the matching
    /// [`SaveCompletion`].
    pub fn submit(&mut self, tasks: Vec<Task>, task_ids: Vec<u64>) -> Result<u64> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::WriteInProgress);
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let store = Arc::clone(&self.store);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let completions = self.completions.clone();

        self.handle.spawn_blocking(move || {
            let outcome = store.save(&tasks);
            if let Err(err) = &outcome {
                tracing::warn!(ticket, error = %err, "background save failed");
            } else {
                tracing::debug!(ticket, tasks = tasks.len(), "background save finished");
            }
            // Release before notifying so the receiver can submit again.
            drop(guard);
            let _ = completions.send(SaveCompletion {
                ticket,
                task_ids,
                outcome,
            });
        });

        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, RawLoad};
    use crate::task::TaskStatus;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;

    fn task(id: u64) -> Task {
        Task {
            id,
            description: format!("task {id}"),
            due_date: None,
            status: TaskStatus::Pending,
            note: String::new(),
            creation_time: None,
            image_path: None,
        }
    }

    /// Store whose save blocks until the test releases it.
    struct GatedStore {
        gate: Mutex<std_mpsc::Receiver<()>>,
        inner: MemoryStore,
    }

    impl TaskStore for GatedStore {
        fn load_raw(&self) -> RawLoad {
            self.inner.load_raw()
        }

        fn save(&self, tasks: &[Task]) -> Result<()> {
            let gate = self.gate.lock().expect("gate lock");
            gate.recv().expect("gate open");
            self.inner.save(tasks)
        }

        fn describe(&self) -> String {
            "<gated>".to_string()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn completion_reports_success_and_ids() {
        let store = Arc::new(MemoryStore::new());
        let (mut saver, mut rx) = BackgroundSaver::new(Arc::clone(&store), Handle::current());

        let ticket = saver.submit(vec![task(0), task(1)], vec![1]).unwrap();
        let done = rx.recv().await.expect("completion");

        assert_eq!(done.ticket, ticket);
        assert_eq!(done.task_ids, vec![1]);
        assert!(done.is_success());
        assert_eq!(store.save_count(), 1);
        assert!(!saver.is_busy());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn overlapping_submit_is_rejected() {
        let (open, gate) = std_mpsc::channel();
        let store = Arc::new(GatedStore {
            gate: Mutex::new(gate),
            inner: MemoryStore::new(),
        });
        let (mut saver, mut rx) = BackgroundSaver::new(Arc::clone(&store), Handle::current());

        saver.submit(vec![task(0)], vec![0]).unwrap();
        assert!(saver.is_busy());
        let err = saver.submit(vec![task(0), task(1)], vec![1]).unwrap_err();
        assert!(matches!(err, Error::WriteInProgress));

        open.send(()).unwrap();
        let done = rx.recv().await.expect("completion");
        assert!(done.is_success());
        assert_eq!(store.inner.records().len(), 1);

        // Free again once the first write finished.
        saver.submit(vec![task(0), task(1)], vec![1]).unwrap();
        open.send(()).unwrap();
        let done = rx.recv().await.expect("completion");
        assert_eq!(done.ticket, 1);
        assert_eq!(store.inner.records().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_save_is_reported_not_raised() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_saves(true);
        let (mut saver, mut rx) = BackgroundSaver::new(Arc::clone(&store), Handle::current());

        saver.submit(vec![task(3)], vec![3]).unwrap();
        let done = rx.recv().await.expect("completion");
        assert!(!done.is_success());
        assert!(matches!(done.outcome, Err(Error::SaveFailed { .. })));
        assert!(!saver.is_busy());
    }
}
