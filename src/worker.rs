//! The Job Worker (spec §4.6): waits for its turn on a printer, streams
//! a file to the device character by character, and honors
//! cancellation at every step.

use std::sync::Arc;

use tokio::io::AsyncBufReadExt;

use crate::device::PrinterDriver;
use crate::job::{Job, Status};
use crate::printer::Printer;

/// Spawn the worker for `job` and return its task handle so the caller
/// can record it via [`Job::set_worker`].
pub fn spawn(
    job: Arc<Job>,
    driver: Arc<dyn PrinterDriver>,
    lines_per_page: u32,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run_job(job, driver, lines_per_page))
}

pub async fn run_job(job: Arc<Job>, driver: Arc<dyn PrinterDriver>, lines_per_page: u32) {
    // Step 1: no printer was resolved at creation time (PrinterUnknown);
    // status is already terminal PRINTER_ERROR, nothing to do.
    let Some(printer) = job.printer.clone() else {
        return;
    };

    // Step 2-3: wait for FIFO turn, or abort if canceled while waiting.
    // The canceller is responsible for unlinking a waiting job from the
    // queue (spec §4.6's cancellation note), so a `false` result here
    // means this job has already been removed.
    if !printer.wait_for_turn(&job).await {
        return;
    }

    // Step 4: open the file.
    let file = match tokio::fs::File::open(&job.filename).await {
        Ok(file) => file,
        Err(_) => {
            job.mark_file_error();
            log::warn!("job {}: could not open file {:?}", job.id, job.filename);
            printer.dequeue(&job);
            return;
        }
    };

    if job.status() == Status::Canceled {
        printer.dequeue(&job);
        return;
    }

    job.mark_in_progress();
    log::info!(
        "job {}: start printing on printer {}",
        job.id,
        printer.id
    );

    let aborted = print_lines(&job, &printer, &*driver, file, lines_per_page).await;

    // Step 6: unlink from the printer queue and wake the next waiter.
    printer.dequeue(&job);

    // Step 7: no abort occurred, so the job ran to completion.
    if !aborted {
        job.mark_finished();
        log::info!(
            "job {}: finished, printed {} pages",
            job.id,
            job.page_count()
        );
    } else {
        log::debug!("job {}: worker exiting after abort", job.id);
    }
}

/// Stream `file` to the device one character at a time, honoring page
/// breaks (spec §4.5) and checking for printer loss / cancellation
/// between every character (spec §4.6 step 5). Returns `true` if the
/// job was aborted (error or cancellation), `false` on a clean EOF.
async fn print_lines(
    job: &Arc<Job>,
    printer: &Printer,
    driver: &dyn PrinterDriver,
    file: tokio::fs::File,
    lines_per_page: u32,
) -> bool {
    let mut lines = tokio::io::BufReader::new(file).lines();
    let mut line_count: u32 = 0;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return false,
            Err(_) => {
                job.mark_printer_error();
                return true;
            }
        };

        line_count += 1;

        let mut bytes = line.into_bytes();
        bytes.push(b'\n');

        for byte in bytes {
            if !driver.exists(printer.id).await {
                job.mark_printer_error();
                log::warn!(
                    "job {}: printer {} became unavailable mid-print",
                    job.id,
                    printer.id
                );
                return true;
            }

            if line_count > lines_per_page {
                if printer.write_char(b'\n').await.is_err() {
                    job.mark_printer_error();
                    return true;
                }
                job.bump_page();
                line_count = 1;
            }

            if printer.write_char(byte).await.is_err() {
                job.mark_printer_error();
                return true;
            }

            if job.status() == Status::Canceled {
                log::info!("job {}: canceled mid-print", job.id);
                return true;
            }
        }
    }
}
