use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex as AsyncMutex, Notify};

use crate::device::{PrinterDriver, PrinterHandle};
use crate::error::PrintError;
use crate::job::{Job, Status};

/// One printer: a serialized execution slot plus a FIFO queue of
/// pending jobs (spec §4.2). Lazily created by [`PrinterRegistry`] and
/// never removed (spec §9: "The source never destroys Printers").
pub struct Printer {
    pub id: u32,
    queue: RwLock<VecDeque<Arc<Job>>>,
    /// Turn protocol rendezvous. Broadcast on every enqueue/dequeue;
    /// every waiter re-checks "am I head now?" rather than relying on
    /// signal ordering (spec §4.2's rationale), matching the condvar
    /// the original pthread implementation used.
    turn: Notify,
    handle: AsyncMutex<Box<dyn PrinterHandle>>,
}

impl Printer {
    fn new(id: u32, handle: Box<dyn PrinterHandle>) -> Arc<Self> {
        Arc::new(Printer {
            id,
            queue: RwLock::new(VecDeque::new()),
            turn: Notify::new(),
            handle: AsyncMutex::new(handle),
        })
    }

    /// Append `job` to the tail of the queue and wake any worker
    /// waiting for its turn.
    pub fn enqueue(&self, job: Arc<Job>) {
        self.queue.write().unwrap().push_back(job);
        self.turn.notify_waiters();
    }

    /// Remove `job` from the queue, wherever it sits. A no-op if it is
    /// not (or no longer) present — both the canceller and the job's
    /// own worker may race to unlink the same job.
    pub fn dequeue(&self, job: &Arc<Job>) {
        let mut queue = self.queue.write().unwrap();
        if let Some(pos) = queue.iter().position(|queued| Arc::ptr_eq(queued, job)) {
            queue.remove(pos);
        }
        drop(queue);
        self.turn.notify_waiters();
    }

    /// Peek the current head of the queue, the only job eligible to
    /// run (spec §4.1's `for_each`/`head` contract: shared lock only).
    pub fn head(&self) -> Option<Arc<Job>> {
        self.queue.read().unwrap().front().cloned()
    }

    /// List jobs currently queued on this printer, for the `jobs`
    /// command (read-only, shared lock).
    pub fn queued_jobs(&self) -> Vec<Arc<Job>> {
        self.queue.read().unwrap().iter().cloned().collect()
    }

    /// Block until `job` reaches the head of the queue, or until it is
    /// observed `CANCELED` while still waiting. Returns `true` if the
    /// job should proceed, `false` if it should abort.
    pub async fn wait_for_turn(&self, job: &Arc<Job>) -> bool {
        loop {
            let notified = self.turn.notified();
            tokio::pin!(notified);
            // Register before checking state: otherwise a notify_waiters()
            // that races between the check below and the `.await` would
            // be silently missed.
            notified.as_mut().enable();

            if self.is_head(job) {
                return true;
            }

            if job.status() == Status::Canceled {
                return false;
            }

            notified.await;
        }
    }

    fn is_head(&self, job: &Arc<Job>) -> bool {
        matches!(self.queue.read().unwrap().front(), Some(head) if Arc::ptr_eq(head, job))
    }

    /// Write one byte to the device. Only ever called by the worker
    /// currently at the head of the queue, so this lock is never
    /// contended in practice; it exists to give the trait object safe
    /// shared ownership across the lifetime of the `Printer`.
    pub async fn write_char(&self, byte: u8) -> std::io::Result<()> {
        self.handle.lock().await.write_char(byte).await
    }
}

/// Maps printer ids to [`Printer`] records, creating them lazily on
/// first reference (spec §4.1).
#[derive(Default)]
pub struct PrinterRegistry {
    printers: RwLock<HashMap<u32, Arc<Printer>>>,
}

impl PrinterRegistry {
    pub fn new() -> Self {
        PrinterRegistry::default()
    }

    /// Return the existing printer for `id`, or probe and open a new
    /// one via `driver`. The registry lock is never held across the
    /// (potentially slow) probe/open calls.
    pub async fn lookup_or_create(
        &self,
        id: u32,
        driver: &dyn PrinterDriver,
    ) -> Result<Arc<Printer>, PrintError> {
        if let Some(printer) = self.printers.read().unwrap().get(&id).cloned() {
            return Ok(printer);
        }

        if !driver.exists(id).await {
            return Err(PrintError::PrinterUnknown(id));
        }

        let handle = driver
            .open(id)
            .await
            .map_err(|_| PrintError::PrinterUnknown(id))?;

        let printer = Printer::new(id, handle);

        let mut printers = self.printers.write().unwrap();
        let printer = printers.entry(id).or_insert(printer).clone();
        Ok(printer)
    }

    /// Iterate all known printers under a shared lock. The visitor
    /// must not attempt to mutate the registry itself.
    pub fn for_each(&self, mut visitor: impl FnMut(&Arc<Printer>)) {
        for printer in self.printers.read().unwrap().values() {
            visitor(printer);
        }
    }
}
