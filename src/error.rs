use thiserror::Error;

/// In-band error kinds surfaced to clients (spec §7). These never cause
/// the server to crash; a handler that hits one replies with the
/// corresponding text instead of the normal success reply.
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("printer {0} does not exist")]
    PrinterUnknown(u32),

    #[error("could not open file {0:?}")]
    FileOpenFailed(std::path::PathBuf),

    #[error("printer {0} became unavailable while printing")]
    PrinterLostMidJob(u32),

    #[error("failed to start job worker: {0}")]
    WorkerSpawnFailed(#[source] std::io::Error),

    #[error("job {0} could not be found")]
    JobNotFound(u64),
}
