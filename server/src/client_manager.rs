//! Connection registry and per-client intent queues.

use log::{debug, info, warn};
use shared::{MoveIntent, REPLAY_WINDOW_TICKS};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Clients silent for this long are dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// One connected predicting peer.
#[derive(Debug)]
pub struct RemoteClient {
    pub id: u32,
    pub addr: SocketAddr,
    last_seen: Instant,
    /// Pending intents keyed by the client's tick number. The most recent
    /// intent received for a tick wins; consumption is strictly lowest
    /// tick first.
    intents: BTreeMap<u64, MoveIntent>,
    last_processed_tick: Option<u64>,
}

impl RemoteClient {
    fn new(id: u32, addr: SocketAddr) -> Self {
        RemoteClient {
            id,
            addr,
            last_seen: Instant::now(),
            intents: BTreeMap::new(),
            last_processed_tick: None,
        }
    }

    fn refresh_last_seen(&mut self) {
        self.last_seen = Instant::now();
    }

    fn is_timed_out(&self) -> bool {
        Instant::now().duration_since(self.last_seen) > CLIENT_TIMEOUT
    }

    fn add_intent(&mut self, tick: u64, intent: MoveIntent) {
        self.refresh_last_seen();

        if self.last_processed_tick.map_or(false, |t| tick <= t) {
            debug!(
                "client {}: intent for tick {} already processed, dropping",
                self.id, tick
            );
            return;
        }

        self.intents.insert(tick, intent);

        while self.intents.len() > REPLAY_WINDOW_TICKS {
            if let Some((&oldest, _)) = self.intents.iter().next() {
                self.intents.remove(&oldest);
                warn!(
                    "client {}: intent queue full, dropping oldest tick {}",
                    self.id, oldest
                );
            }
        }
    }

    /// Pops the lowest pending tick, advancing the acknowledgment cursor.
    fn take_next_intent(&mut self) -> Option<(u64, MoveIntent)> {
        let tick = *self.intents.keys().next()?;
        let intent = self.intents.remove(&tick)?;
        self.last_processed_tick = Some(tick);
        Some((tick, intent))
    }
}

/// Tracks every connected client and their unprocessed intents.
pub struct ClientManager {
    clients: HashMap<u32, RemoteClient>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        ClientManager {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        self.clients.insert(client_id, RemoteClient::new(client_id, addr));
        info!("Client {} connected from {}", client_id, addr);
        Some(client_id)
    }

    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if self.clients.remove(client_id).is_some() {
            info!("Client {} removed", client_id);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| client.id)
    }

    pub fn addr_of(&self, client_id: u32) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|client| client.addr)
    }

    pub fn client_ids(&self) -> Vec<u32> {
        self.clients.keys().cloned().collect()
    }

    pub fn add_intent(&mut self, client_id: u32, tick: u64, intent: MoveIntent) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.add_intent(tick, intent);
                true
            }
            None => false,
        }
    }

    pub fn take_next_intent(&mut self, client_id: u32) -> Option<(u64, MoveIntent)> {
        self.clients
            .get_mut(&client_id)
            .and_then(|client| client.take_next_intent())
    }

    /// Tick of the last intent applied for this client, if any. Echoed in
    /// snapshots so the peer knows which buffered intents are confirmed.
    pub fn last_processed_tick(&self, client_id: u32) -> Option<u64> {
        self.clients
            .get(&client_id)
            .and_then(|client| client.last_processed_tick)
    }

    pub fn check_timeouts(&mut self) -> Vec<u32> {
        self.clients
            .values()
            .filter(|client| client.is_timed_out())
            .map(|client| client.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
