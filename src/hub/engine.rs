//! Hub engine
//!
//! The hub is the connection set behind `/ws`. It is responsible for:
//! - registering and removing client handles
//! - serializing an envelope once and handing the same frame to every open
//!   client
//!
//! Concurrency and usage notes:
//! - The hub is shared as `Arc<Hub>` by the transport, the bridge and the
//!   tickers. Its lock is held only for map operations and channel sends,
//!   never across an `.await`.
//! - Sends go into unbounded per-client channels, so a broadcast never waits
//!   on a slow socket. Closed clients are skipped here and removed by the
//!   transport when their connection ends.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info};

use super::client::{Client, ClientId};
use super::envelope::Envelope;

#[derive(Debug, Default)]
pub struct Hub {
    clients: Mutex<HashMap<ClientId, Client>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_client(&self, client: Client) {
        let mut clients = self.clients.lock();
        info!(client_id = %client.id, total = clients.len() + 1, "client connected");
        clients.insert(client.id.clone(), client);
    }

    /// Forget a client. Unknown ids are ignored.
    pub fn remove_client(&self, client_id: &str) {
        let mut clients = self.clients.lock();
        if clients.remove(client_id).is_some() {
            info!(client_id, total = clients.len(), "client disconnected");
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    /// Wrap `data` in an envelope on `channel` and send it to every open
    /// client. Returns how many clients the frame was handed to.
    pub fn broadcast(&self, channel: &str, data: Value) -> usize {
        let frame = match Envelope::now(channel, data).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(channel, error = %e, "failed to serialize envelope");
                return 0;
            }
        };

        let clients = self.clients.lock();
        let mut delivered = 0;
        for client in clients.values().filter(|c| c.is_open()) {
            match client.sender.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(client_id = %client.id, error = %e, "send failed"),
            }
        }
        debug!(channel, delivered, "broadcast");
        delivered
    }
}
