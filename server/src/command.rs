//! The Command Dispatcher (spec §4.7): maps a verb to a handler that
//! operates over `(Client, args)` and produces a reply string. Built
//! once at server construction as a plain table, per spec §9's
//! "Global mutable registries" re-architecture guidance — no
//! process-global statics.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use printd::device::PrinterDriver;
use printd::job::{Job, Status};
use printd::printer::PrinterRegistry;
use printd::worker;

use crate::client::{Client, ClientRegistry};

/// Everything a handler needs: the calling client, and the shared
/// registries/driver it may touch.
pub struct Context {
    pub client: Arc<Client>,
    pub clients: Arc<ClientRegistry>,
    pub printers: Arc<PrinterRegistry>,
    pub driver: Arc<dyn PrinterDriver>,
    /// Per-server override of spec §6's `lines_per_page` constant.
    pub lines_per_page: u32,
    /// Per-server override of spec §6's `page_price` constant.
    pub page_price: f64,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
type Handler = for<'a> fn(&'a Context, &'a [String]) -> BoxFuture<'a, String>;

/// Process-global-equivalent table of commands, immutable after
/// construction.
pub struct Dispatcher {
    commands: HashMap<&'static str, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut commands: HashMap<&'static str, Handler> = HashMap::new();
        commands.insert("print", |ctx, args| Box::pin(handle_print(ctx, args)));
        commands.insert("status", |ctx, args| Box::pin(handle_status(ctx, args)));
        commands.insert("invoice", |ctx, args| Box::pin(handle_invoice(ctx, args)));
        commands.insert("cancel", |ctx, args| Box::pin(handle_cancel(ctx, args)));
        commands.insert("jobs", |ctx, args| Box::pin(handle_jobs(ctx, args)));
        commands.insert("quit", |ctx, args| Box::pin(handle_quit(ctx, args)));
        Dispatcher { commands }
    }

    /// Dispatch one already-tokenized request line. `tokens[0]` is the
    /// verb; an empty line is treated as a no-op with an empty reply.
    pub async fn dispatch(&self, ctx: &Context, tokens: &[String]) -> String {
        let Some(verb) = tokens.first() else {
            return String::new();
        };

        match self.commands.get(verb.as_str()) {
            Some(handler) => handler(ctx, tokens).await,
            None => format!("  '{verb}' is not a valid command.\n"),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

fn check_argc(args: &[String], required: usize) -> Option<String> {
    let actual = args.len() - 1;
    if actual != required {
        Some(format!(
            "  This command takes {required} arguments. Instead received {actual}.\n"
        ))
    } else {
        None
    }
}

/// `atoi`-compatible parse: a malformed id behaves like `atoi`'s 0,
/// which in turn behaves like an unknown printer/job id (spec §4.7
/// resolves this the same way the original C server's `atoi` calls
/// did).
fn parse_id(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}

fn parse_printer_id(s: &str) -> u32 {
    s.parse().unwrap_or(0)
}

async fn handle_print(ctx: &Context, args: &[String]) -> String {
    if let Some(reply) = check_argc(args, 2) {
        return reply;
    }

    let printer_id = parse_printer_id(&args[1]);
    let filename = args[2].clone();

    let printer = if printer_id == 0 {
        None
    } else {
        ctx.printers
            .lookup_or_create(printer_id, &*ctx.driver)
            .await
            .ok()
    };

    let initial_status = if printer.is_some() {
        Status::Waiting
    } else {
        Status::PrinterError
    };

    let job_id = ctx.client.next_job_id();
    let job = Arc::new(Job::new(
        job_id,
        ctx.client.id,
        filename,
        printer.clone(),
        initial_status,
        ctx.page_price,
    ));

    ctx.client.add_job(job.clone());
    if let Some(printer) = &printer {
        printer.enqueue(job.clone());
    }

    // tokio::spawn on the multi-thread runtime this server requires
    // does not fail synchronously, so the `WorkerSpawnFailed` path
    // (undo both insertions, reply with error) never triggers here; it
    // is kept in `printd::error` for API completeness.
    let handle = worker::spawn(job.clone(), ctx.driver.clone(), ctx.lines_per_page);
    job.set_worker(handle);

    format!("  Created job no. {job_id}\n")
}

async fn handle_status(ctx: &Context, args: &[String]) -> String {
    if let Some(reply) = check_argc(args, 1) {
        return reply;
    }

    let raw = &args[1];
    match ctx.client.find_job(parse_id(raw)) {
        Some(job) => format!(
            "  Job {} has status '{}'.\n",
            job.id,
            job.status().as_str()
        ),
        None => format!("  Job {raw} could not be found. \n"),
    }
}

async fn handle_invoice(ctx: &Context, args: &[String]) -> String {
    if let Some(reply) = check_argc(args, 1) {
        return reply;
    }

    let raw = &args[1];
    let Some(job) = ctx.client.find_job(parse_id(raw)) else {
        return format!("  Job {raw} could not be found. \n");
    };

    match job.status() {
        Status::Waiting | Status::Canceled => {
            // The worker may still be asleep waiting for its turn;
            // don't wait for it to wake up on its own (spec §4.7).
            if let Some(printer) = &job.printer {
                printer.dequeue(&job);
            }
            if let Some(handle) = job.take_worker() {
                handle.abort();
            }
        }
        _ => {
            if let Some(handle) = job.take_worker() {
                let _ = handle.await;
            }
        }
    }

    let status = job.status();
    let pages = job.page_count();
    let total = job.total();

    let reply = if status == Status::PrinterError {
        format!(
            "  Job {}: status '{}', printed {} pages. {:.2} total.\n",
            job.id,
            status.as_str(),
            pages,
            total
        )
    } else {
        let printer_id = job.printer.as_ref().map(|printer| printer.id).unwrap_or(0);
        format!(
            "  Job {}, printer {}: status '{}', printed {} pages. {:.2} total.\n",
            job.id,
            printer_id,
            status.as_str(),
            pages,
            total
        )
    };

    ctx.client.remove_job(job.id);
    reply
}

async fn handle_cancel(ctx: &Context, args: &[String]) -> String {
    if let Some(reply) = check_argc(args, 1) {
        return reply;
    }

    let job_id = parse_id(&args[1]);
    let Some(job) = ctx.client.find_job(job_id) else {
        return format!("  Job {job_id} could not be found. \n");
    };

    cancel_job(&job)
}

/// Shared cancellation logic for `cancel` and `quit` (spec §4.7: "quit
/// ... reuse cancel path").
fn cancel_job(job: &Arc<Job>) -> String {
    match job.try_cancel() {
        Status::Waiting => {
            if let Some(printer) = &job.printer {
                printer.dequeue(job);
            }
            if let Some(handle) = job.take_worker() {
                handle.abort();
            }
            format!("  Job {} was cancelled.\n", job.id)
        }
        Status::InProgress => {
            // The worker polls its own status and unlinks itself; no
            // signal needed (spec §4.6).
            format!("  Job {} was cancelled.\n", job.id)
        }
        _ => format!(
            "  Job {} has already finished or is in error state.\n",
            job.id
        ),
    }
}

async fn handle_jobs(ctx: &Context, args: &[String]) -> String {
    if let Some(reply) = check_argc(args, 1) {
        return reply;
    }

    let raw = &args[1];
    let printer_id = parse_printer_id(raw);
    let mut text = String::new();
    let mut found = 0usize;

    ctx.clients.for_each(|client| {
        for job in client.jobs() {
            if job.printer.as_ref().map(|printer| printer.id) == Some(printer_id) {
                text.push_str(&format!(
                    "  Client {}, job {}, file '{}', status '{}'\n",
                    job.client_id,
                    job.id,
                    job.filename,
                    job.status().as_str()
                ));
                found += 1;
            }
        }
    });

    if found == 0 {
        format!("  Currently there are no jobs for printer {raw}.\n")
    } else {
        text
    }
}

async fn handle_quit(ctx: &Context, args: &[String]) -> String {
    if let Some(reply) = check_argc(args, 0) {
        return reply;
    }

    let text = teardown(ctx).await;
    ctx.client.set_quit();
    text
}

/// Cancel and join every job still owned by this client (spec §4.7
/// `quit`; also spec §3/§7: disconnect or a read error tears a client
/// down exactly as `quit` would, just with no reply sent anywhere).
/// Idempotent: a client with no remaining jobs (e.g. `quit` already
/// ran) produces an empty string and does nothing.
pub async fn teardown(ctx: &Context) -> String {
    let mut text = String::new();

    for job in ctx.client.drain_jobs() {
        let previous = job.status();
        text.push_str(&cancel_job(&job));

        // A job that had already progressed past WAITING may still be
        // running (or only just finished); join its worker before
        // dropping the job so we never free state the worker is still
        // touching.
        if previous != Status::Waiting {
            if let Some(handle) = job.take_worker() {
                let _ = handle.await;
            }
        }
    }

    text
}
