use std::sync::{Arc, RwLock};

use tokio::task::JoinHandle;

use crate::printer::Printer;

/// Job lifecycle states (spec §4.5). Terminal states never transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Waiting,
    InProgress,
    Canceled,
    Finished,
    PrinterError,
    FileError,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Canceled | Status::Finished | Status::PrinterError | Status::FileError
        )
    }

    /// Static mapping from status to its wire-protocol text, replacing
    /// the original's allocate-and-free-a-short-string-per-query
    /// approach (spec §9).
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Waiting => "waiting",
            Status::InProgress => "printing",
            Status::Canceled => "cancelled",
            Status::Finished => "finished",
            Status::PrinterError => "printer error",
            Status::FileError => "file error",
        }
    }
}

/// The mutable attributes of a job, guarded by one lock (spec: "Job's
/// attribute lock"). Only the job's own worker writes `page_count`.
pub struct JobAttrs {
    pub status: Status,
    pub page_count: u32,
}

/// A unit of work referenced from exactly one printer queue and one
/// client index until it is removed by `invoice`, `cancel`+teardown, or
/// `quit` (spec §3).
pub struct Job {
    /// Client-local job id, unique and monotonically increasing per
    /// client (spec §4.4).
    pub id: u64,
    /// Id of the client that created this job, used by `jobs`.
    pub client_id: u64,
    pub filename: String,
    /// `None` only when the printer referenced at creation time does
    /// not exist (spec §7 `PrinterUnknown`); the job is then created
    /// directly in `PrinterError` and never enqueued anywhere.
    pub printer: Option<Arc<Printer>>,
    /// Billed cost per page, fixed at creation time to whatever the
    /// server was configured with (spec §6's `page_price`, promoted to
    /// a per-server override).
    page_price: f64,
    attrs: RwLock<JobAttrs>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Job {
    pub fn new(
        id: u64,
        client_id: u64,
        filename: String,
        printer: Option<Arc<Printer>>,
        initial_status: Status,
        page_price: f64,
    ) -> Self {
        Job {
            id,
            client_id,
            filename,
            printer,
            page_price,
            attrs: RwLock::new(JobAttrs {
                status: initial_status,
                page_count: 0,
            }),
            worker: std::sync::Mutex::new(None),
        }
    }

    pub fn status(&self) -> Status {
        self.attrs.read().unwrap().status
    }

    pub fn page_count(&self) -> u32 {
        self.attrs.read().unwrap().page_count
    }

    /// Record the worker's task handle so `invoice`/`cancel` can join or
    /// abort it later.
    pub fn set_worker(&self, handle: JoinHandle<()>) {
        *self.worker.lock().unwrap() = Some(handle);
    }

    pub fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker.lock().unwrap().take()
    }

    /// Enter `IN_PROGRESS`, set the initial page count of 1 (spec
    /// §4.5: "page_count starts at 1 on entering IN_PROGRESS").
    pub fn mark_in_progress(&self) {
        let mut attrs = self.attrs.write().unwrap();
        attrs.status = Status::InProgress;
        attrs.page_count = 1;
    }

    pub fn mark_file_error(&self) {
        self.attrs.write().unwrap().status = Status::FileError;
    }

    pub fn mark_printer_error(&self) {
        self.attrs.write().unwrap().status = Status::PrinterError;
    }

    pub fn mark_finished(&self) {
        self.attrs.write().unwrap().status = Status::Finished;
    }

    pub fn bump_page(&self) {
        self.attrs.write().unwrap().page_count += 1;
    }

    /// Transition this job to `CANCELED` if, and only if, it is not
    /// already terminal. Returns the status that was observed *before*
    /// the attempted transition, which callers use to decide whether
    /// they must also unlink the job from its printer queue (spec
    /// §4.6's cancellation protocol).
    pub fn try_cancel(&self) -> Status {
        let mut attrs = self.attrs.write().unwrap();
        let previous = attrs.status;
        if !previous.is_terminal() {
            attrs.status = Status::Canceled;
        }
        previous
    }

    /// Total billed amount for this job (spec §4.7 `invoice`): zero for
    /// jobs that never printed a character and for error states.
    pub fn total(&self) -> f64 {
        let attrs = self.attrs.read().unwrap();
        match attrs.status {
            Status::FileError | Status::PrinterError => 0.0,
            _ => self.page_price * attrs.page_count as f64,
        }
    }
}
