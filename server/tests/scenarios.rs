//! End-to-end scenarios exercising the command dispatcher against a
//! [`SimulatedPrinterDriver`], mirroring the literal scenarios in the
//! specification's testable-properties section.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use printd::device::SimulatedPrinterDriver;
use printd::printer::PrinterRegistry;
use print_server::client::{Client, ClientRegistry};
use print_server::command::{Context, Dispatcher};

fn tokens(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_owned).collect()
}

fn is_terminal(reply: &str) -> bool {
    ["finished", "cancelled", "printer error", "file error"]
        .iter()
        .any(|marker| reply.contains(marker))
}

struct Harness {
    dispatcher: Dispatcher,
    clients: Arc<ClientRegistry>,
    printers: Arc<PrinterRegistry>,
    driver: Arc<SimulatedPrinterDriver>,
    next_client_id: std::sync::atomic::AtomicU64,
}

impl Harness {
    fn new() -> Self {
        Harness {
            dispatcher: Dispatcher::new(),
            clients: Arc::new(ClientRegistry::new()),
            printers: Arc::new(PrinterRegistry::new()),
            driver: Arc::new(SimulatedPrinterDriver::new()),
            next_client_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    fn connect(&self) -> Context {
        let id = self
            .next_client_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        let client = Client::new(id);
        self.clients.insert(client.clone());
        Context {
            client,
            clients: self.clients.clone(),
            printers: self.printers.clone(),
            driver: self.driver.clone(),
            lines_per_page: printd::DEFAULT_LINES_PER_PAGE,
            page_price: printd::DEFAULT_PAGE_PRICE,
        }
    }

    async fn send(&self, ctx: &Context, line: &str) -> String {
        self.dispatcher.dispatch(ctx, &tokens(line)).await
    }

    async fn wait_until_terminal(&self, ctx: &Context, job_id: u64) -> String {
        for _ in 0..500 {
            let reply = self.send(ctx, &format!("status {job_id}")).await;
            if is_terminal(&reply) {
                return reply;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {job_id} never reached a terminal status");
    }
}

fn file_with_lines(count: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for i in 0..count {
        writeln!(file, "line {i}").unwrap();
    }
    file
}

#[tokio::test(start_paused = true)]
async fn happy_path_finishes_and_bills_one_page() {
    let harness = Harness::new();
    let ctx = harness.connect();
    let file = file_with_lines(3);
    let path = file.path().to_str().unwrap();

    let reply = harness.send(&ctx, &format!("print 7 {path}")).await;
    assert_eq!(reply, "  Created job no. 1\n");

    harness.wait_until_terminal(&ctx, 1).await;

    let invoice = harness.send(&ctx, "invoice 1").await;
    assert!(invoice.contains("status 'finished', printed 1 pages. 0.05 total."));
}

#[tokio::test(start_paused = true)]
async fn queued_jobs_on_one_printer_start_in_fifo_order() {
    let harness = Harness::new();
    let ctx = harness.connect();
    let f1 = file_with_lines(1);
    let f2 = file_with_lines(1);
    let f3 = file_with_lines(1);

    for (n, file) in [&f1, &f2, &f3].into_iter().enumerate() {
        let reply = harness
            .send(&ctx, &format!("print 7 {}", file.path().to_str().unwrap()))
            .await;
        assert_eq!(reply, format!("  Created job no. {}\n", n + 1));
    }

    harness.wait_until_terminal(&ctx, 1).await;
    harness.wait_until_terminal(&ctx, 2).await;
    harness.wait_until_terminal(&ctx, 3).await;

    for job_id in 1..=3 {
        let status = harness.send(&ctx, &format!("status {job_id}")).await;
        assert!(status.contains("finished"));
    }
}

#[tokio::test(start_paused = true)]
async fn cancel_while_queued_bills_zero() {
    let harness = Harness::new();
    let client_a = harness.connect();
    let client_b = harness.connect();

    let big = file_with_lines(500);
    let small = file_with_lines(1);

    harness
        .send(&client_a, &format!("print 7 {}", big.path().to_str().unwrap()))
        .await;
    harness
        .send(
            &client_b,
            &format!("print 7 {}", small.path().to_str().unwrap()),
        )
        .await;

    // job 1 (big file, client A) is now occupying the printer; job 1 on
    // client B is still queued behind it.
    let cancel_reply = harness.send(&client_b, "cancel 1").await;
    assert_eq!(cancel_reply, "  Job 1 was cancelled.\n");

    let invoice = harness.send(&client_b, "invoice 1").await;
    assert!(invoice.contains("status 'cancelled', printed 0 pages. 0.00 total."));
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_print_bills_pages_already_printed() {
    let harness = Harness::new();
    let ctx = harness.connect();
    let big = file_with_lines(50);

    harness
        .send(&ctx, &format!("print 7 {}", big.path().to_str().unwrap()))
        .await;

    // Wait until the job is observably printing before canceling it.
    for _ in 0..500 {
        if harness.send(&ctx, "status 1").await.contains("printing") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let cancel_reply = harness.send(&ctx, "cancel 1").await;
    assert_eq!(cancel_reply, "  Job 1 was cancelled.\n");

    harness.wait_until_terminal(&ctx, 1).await;
    let invoice = harness.send(&ctx, "invoice 1").await;
    assert!(invoice.contains("status 'cancelled'"));
    assert!(!invoice.contains("printed 0 pages"));
}

#[tokio::test(start_paused = true)]
async fn unknown_printer_yields_printer_error_and_omits_printer_id() {
    let harness = Harness::new();
    let ctx = harness.connect();

    let reply = harness.send(&ctx, "print 99 anything").await;
    assert_eq!(reply, "  Created job no. 1\n");

    harness.wait_until_terminal(&ctx, 1).await;
    let status = harness.send(&ctx, "status 1").await;
    assert!(status.contains("printer error"));

    let invoice = harness.send(&ctx, "invoice 1").await;
    assert_eq!(
        invoice,
        "  Job 1: status 'printer error', printed 0 pages. 0.00 total.\n"
    );
}

#[tokio::test(start_paused = true)]
async fn quit_cancels_every_job_and_leaves_no_orphans() {
    let harness = Harness::new();
    let ctx = harness.connect();
    let f1 = file_with_lines(1);
    let f2 = file_with_lines(1);

    harness
        .send(&ctx, &format!("print 7 {}", f1.path().to_str().unwrap()))
        .await;
    harness
        .send(&ctx, &format!("print 7 {}", f2.path().to_str().unwrap()))
        .await;

    let reply = harness.send(&ctx, "quit").await;
    let lines: Vec<&str> = reply.lines().collect();
    assert_eq!(lines.len(), 2);

    let printer = harness.printers.lookup_or_create(7, &*harness.driver).await.unwrap();
    assert!(printer.queued_jobs().is_empty());
    assert!(ctx.client.should_quit());
}

#[tokio::test]
async fn status_on_unknown_job_reports_not_found() {
    let harness = Harness::new();
    let ctx = harness.connect();

    let reply = harness.send(&ctx, "status 42").await;
    assert_eq!(reply, "  Job 42 could not be found. \n");
}

#[tokio::test]
async fn malformed_argument_count_is_rejected() {
    let harness = Harness::new();
    let ctx = harness.connect();

    let reply = harness.send(&ctx, "print 7").await;
    assert_eq!(
        reply,
        "  This command takes 2 arguments. Instead received 1.\n"
    );
}

#[tokio::test]
async fn unknown_verb_is_rejected() {
    let harness = Harness::new();
    let ctx = harness.connect();

    let reply = harness.send(&ctx, "frobnicate").await;
    assert_eq!(reply, "  'frobnicate' is not a valid command.\n");
}
