// ------------- Database -------------
// A shareable handle around one fact store. Every operation takes the store
// lock once and runs to completion, so a flushed batch or a scan-and-delete is
// never seen half applied. Concurrent writers are not ordered against each
// other: whichever batch is applied last wins.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::LocalClient;
use crate::error::{Result, RoomError};
use crate::grammar::{DEFAULT_PARSE_CACHE_CAPACITY, OtherHasher};
use crate::store::{FactStore, FlushOutcome, Solution};
use crate::term::Term;
use crate::unify::Bindings;

#[derive(Debug)]
struct ClientRegistry {
    connected: HashSet<String, OtherHasher>,
    next_client_id: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    store: Arc<Mutex<FactStore>>,
    clients: Arc<Mutex<ClientRegistry>>,
    parse_cache_capacity: usize,
}

impl Database {
    pub fn new() -> Self {
        Self::with_parse_cache_capacity(DEFAULT_PARSE_CACHE_CAPACITY)
    }
    /// Clients connected through this database get parse caches of this size.
    pub fn with_parse_cache_capacity(parse_cache_capacity: usize) -> Self {
        Self {
            store: Arc::new(Mutex::new(FactStore::new())),
            clients: Arc::new(Mutex::new(ClientRegistry {
                connected: HashSet::default(),
                next_client_id: 1,
            })),
            parse_cache_capacity,
        }
    }

    pub fn store(&self) -> Result<MutexGuard<'_, FactStore>> {
        Ok(self.store.lock()?)
    }

    /// Registers a local client. Without an id one is generated (`_1`, `_2`, ...).
    pub fn connect(&self, id: Option<&str>) -> Result<LocalClient> {
        let mut clients = self.clients.lock()?;
        let id = match id {
            Some(id) => id.to_string(),
            None => loop {
                let candidate = format!("_{}", clients.next_client_id);
                clients.next_client_id += 1;
                if !clients.connected.contains(&candidate) {
                    break candidate;
                }
            },
        };
        if !clients.connected.insert(id.clone()) {
            return Err(RoomError::DuplicateClientId(id));
        }
        Ok(LocalClient::new(self.clone(), id, self.parse_cache_capacity))
    }

    /// Frees a client id for reuse. Returns false if it was not connected.
    pub fn disconnect(&self, id: &str) -> Result<bool> {
        Ok(self.clients.lock()?.connected.remove(id))
    }

    pub fn select(&self, patterns: &[Vec<Term>]) -> Result<Vec<Solution>> {
        self.store()?.select(patterns)
    }

    pub fn select_bindings(&self, patterns: &[Vec<Term>]) -> Result<Vec<Bindings>> {
        self.store()?.select_bindings(patterns)
    }

    pub fn apply(&self, client_id: &str, retractions: &[Vec<Term>], assertions: Vec<Vec<Term>>) -> Result<FlushOutcome> {
        self.store()?.apply(client_id, retractions, assertions)
    }

    pub fn retract_everything_about(&self, name: &str) -> Result<usize> {
        Ok(self.store()?.retract_everything_about(name))
    }

    pub fn retract_everything_asserted_by(&self, client_id: &str) -> Result<usize> {
        Ok(self.store()?.retract_everything_asserted_by(client_id))
    }

    pub fn all_facts(&self) -> Result<Vec<String>> {
        Ok(self.store()?.all_facts())
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
