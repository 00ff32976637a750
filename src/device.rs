//! The printer device boundary (spec §6). The scheduler only ever talks
//! to a printer through [`PrinterDriver`]/[`PrinterHandle`]; how bytes
//! actually reach a physical device is someone else's problem.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Simulated per-character latency of a slow serial printer.
pub const WRITE_LATENCY: Duration = Duration::from_millis(100);

/// Probes and opens printers by id. Mirrors `printer_exists`/
/// `open_printer` in the original C driver.
#[async_trait]
pub trait PrinterDriver: Send + Sync {
    /// Cheap, concurrency-safe existence probe.
    async fn exists(&self, id: u32) -> bool;

    /// Open a handle to the device, failing if it does not exist.
    async fn open(&self, id: u32) -> std::io::Result<Box<dyn PrinterHandle>>;
}

/// A single opened connection to a printer. Dropping the handle is the
/// `close_printer` equivalent.
#[async_trait]
pub trait PrinterHandle: Send + Sync {
    /// Write one byte. Implementations special-case form-feed (`\f`) by
    /// emitting a decorative separator line, and should simulate the
    /// device's real-world latency.
    async fn write_char(&mut self, byte: u8) -> std::io::Result<()>;
}

/// Default backend: maps printer ids to pseudoterminal device paths,
/// the same scheme as `printer_management.c`'s `tty_path`.
pub struct PtyPrinterDriver {
    path_pattern: String,
}

impl PtyPrinterDriver {
    /// `path_pattern` must contain exactly one `{}` placeholder for the
    /// printer id, e.g. `/dev/pts/{}`.
    pub fn new(path_pattern: impl Into<String>) -> Self {
        PtyPrinterDriver {
            path_pattern: path_pattern.into(),
        }
    }

    fn path_for(&self, id: u32) -> PathBuf {
        PathBuf::from(self.path_pattern.replace("{}", &id.to_string()))
    }
}

#[async_trait]
impl PrinterDriver for PtyPrinterDriver {
    async fn exists(&self, id: u32) -> bool {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            tokio::fs::metadata(self.path_for(id))
                .await
                .map(|meta| meta.file_type().is_char_device())
                .unwrap_or(false)
        }
        #[cfg(not(unix))]
        {
            tokio::fs::metadata(self.path_for(id)).await.is_ok()
        }
    }

    async fn open(&self, id: u32) -> std::io::Result<Box<dyn PrinterHandle>> {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(self.path_for(id))
            .await?;

        Ok(Box::new(PtyPrinterHandle { file }))
    }
}

struct PtyPrinterHandle {
    file: tokio::fs::File,
}

#[async_trait]
impl PrinterHandle for PtyPrinterHandle {
    async fn write_char(&mut self, byte: u8) -> std::io::Result<()> {
        write_with_form_feed(&mut self.file, byte).await
    }
}

async fn write_with_form_feed(
    sink: &mut (impl AsyncWriteExt + Unpin),
    byte: u8,
) -> std::io::Result<()> {
    if byte == b'\x0c' {
        for _ in 0..30 {
            sink.write_all(b"- ").await?;
        }
        sink.write_all(b"\n").await?;
    } else {
        sink.write_all(&[byte]).await?;
    }

    tokio::time::sleep(WRITE_LATENCY).await;
    Ok(())
}

/// In-memory backend used by tests and local development, grounded on
/// the teacher's `LabelVirtualization::DropJobs`/`ZplOnly` simulation
/// modes: no real character device is touched, but every byte written
/// is captured for assertions and a printer can be made to "disappear"
/// mid-job.
#[derive(Clone, Default)]
pub struct SimulatedPrinterDriver {
    down: Arc<Mutex<HashSet<u32>>>,
    output: Arc<Mutex<HashMap<u32, Vec<u8>>>>,
}

impl SimulatedPrinterDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `id` fail its next `exists` probe, simulating a printer
    /// going away mid-job (spec's `PrinterLostMidJob`).
    pub fn take_down(&self, id: u32) {
        self.down.lock().unwrap().insert(id);
    }

    /// Bytes written to `id` so far, in order.
    pub fn written(&self, id: u32) -> Vec<u8> {
        self.output.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PrinterDriver for SimulatedPrinterDriver {
    async fn exists(&self, id: u32) -> bool {
        !self.down.lock().unwrap().contains(&id)
    }

    async fn open(&self, id: u32) -> std::io::Result<Box<dyn PrinterHandle>> {
        if !self.exists(id).await {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("printer {id} does not exist"),
            ));
        }

        self.output.lock().unwrap().entry(id).or_default();

        Ok(Box::new(SimulatedPrinterHandle {
            id,
            output: self.output.clone(),
        }))
    }
}

struct SimulatedPrinterHandle {
    id: u32,
    output: Arc<Mutex<HashMap<u32, Vec<u8>>>>,
}

#[async_trait]
impl PrinterHandle for SimulatedPrinterHandle {
    async fn write_char(&mut self, byte: u8) -> std::io::Result<()> {
        if byte == b'\x0c' {
            let mut guard = self.output.lock().unwrap();
            let buf = guard.entry(self.id).or_default();
            for _ in 0..30 {
                buf.extend_from_slice(b"- ");
            }
            buf.push(b'\n');
        } else {
            self.output
                .lock()
                .unwrap()
                .entry(self.id)
                .or_default()
                .push(byte);
        }

        tokio::time::sleep(WRITE_LATENCY).await;
        Ok(())
    }
}
