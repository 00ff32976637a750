//! Core print job scheduler: printer registry, FIFO turn protocol, job
//! lifecycle and the device boundary. The wire protocol, command
//! dispatcher and per-client bookkeeping live in the `server` crate.

pub mod constants;
pub mod device;
pub mod error;
pub mod job;
pub mod printer;
pub mod worker;

pub use constants::{DEFAULT_LINES_PER_PAGE, DEFAULT_PAGE_PRICE};
pub use device::{PrinterDriver, PrinterHandle};
pub use error::PrintError;
pub use job::{Job, JobAttrs, Status};
pub use printer::{Printer, PrinterRegistry};
