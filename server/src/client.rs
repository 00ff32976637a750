use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use printd::Job;

/// A connected client (spec §4.4): owns a per-client job index and a
/// monotonic job-id counter. Created on accept, torn down when its
/// handler loop exits.
pub struct Client {
    pub id: u64,
    job_counter: AtomicU64,
    jobs: RwLock<Vec<Arc<Job>>>,
    quit: AtomicBool,
}

impl Client {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Client {
            id,
            job_counter: AtomicU64::new(0),
            jobs: RwLock::new(Vec::new()),
            quit: AtomicBool::new(false),
        })
    }

    /// Next client-local job id. Ids are unique per client, monotonic,
    /// and never reused (spec §3).
    pub fn next_job_id(&self) -> u64 {
        self.job_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn add_job(&self, job: Arc<Job>) {
        self.jobs.write().unwrap().push(job);
    }

    pub fn find_job(&self, job_id: u64) -> Option<Arc<Job>> {
        self.jobs
            .read()
            .unwrap()
            .iter()
            .find(|job| job.id == job_id)
            .cloned()
    }

    pub fn remove_job(&self, job_id: u64) {
        self.jobs.write().unwrap().retain(|job| job.id != job_id);
    }

    /// Snapshot of every job still tracked by this client, in insertion
    /// order, for the `jobs` command.
    pub fn jobs(&self) -> Vec<Arc<Job>> {
        self.jobs.read().unwrap().clone()
    }

    /// Remove and return every job this client still owns, for `quit`
    /// teardown (spec §4.7).
    pub fn drain_jobs(&self) -> Vec<Arc<Job>> {
        std::mem::take(&mut *self.jobs.write().unwrap())
    }

    pub fn set_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    pub fn should_quit(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}

/// The set of connected clients (spec §4.3).
#[derive(Default)]
pub struct ClientRegistry {
    clients: RwLock<Vec<Arc<Client>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry::default()
    }

    pub fn insert(&self, client: Arc<Client>) {
        self.clients.write().unwrap().push(client);
    }

    pub fn remove(&self, client_id: u64) {
        self.clients
            .write()
            .unwrap()
            .retain(|client| client.id != client_id);
    }

    /// Iterate all connected clients under a shared lock. The visitor
    /// may take per-client locks, but must never re-enter the registry.
    pub fn for_each(&self, mut visitor: impl FnMut(&Arc<Client>)) {
        for client in self.clients.read().unwrap().iter() {
            visitor(client);
        }
    }
}
