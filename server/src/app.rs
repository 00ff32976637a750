//! Top-level shared state (spec §4.3/§4.4), built once at startup and
//! handed to every accepted connection as a cheap `Arc` clone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use printd::device::PrinterDriver;
use printd::printer::PrinterRegistry;

use crate::client::ClientRegistry;
use crate::command::Dispatcher;

pub struct Server {
    pub clients: Arc<ClientRegistry>,
    pub printers: Arc<PrinterRegistry>,
    pub driver: Arc<dyn PrinterDriver>,
    pub dispatcher: Dispatcher,
    /// Per-server override of spec §6's `lines_per_page` constant.
    pub lines_per_page: u32,
    /// Per-server override of spec §6's `page_price` constant.
    pub page_price: f64,
    next_client_id: AtomicU64,
}

impl Server {
    pub fn new(driver: Arc<dyn PrinterDriver>, lines_per_page: u32, page_price: f64) -> Arc<Self> {
        Arc::new(Server {
            clients: Arc::new(ClientRegistry::new()),
            printers: Arc::new(PrinterRegistry::new()),
            driver,
            dispatcher: Dispatcher::new(),
            lines_per_page,
            page_price,
            next_client_id: AtomicU64::new(0),
        })
    }

    pub fn next_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}
