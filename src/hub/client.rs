//! Client representation
//!
//! `Client` models one connected WebSocket and holds the sending side of the
//! per-connection channel the hub pushes frames into. The transport task owns
//! the receiving side and forwards frames to the socket.

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use super::envelope::Frame;

pub type ClientId = String;

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub sender: UnboundedSender<Frame>,
}

impl Client {
    /// Create a new client with a sender channel. The `id` is a UUID used
    /// to identify the client across hub operations.
    pub fn new(sender: UnboundedSender<Frame>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
        }
    }

    /// A client is open until its transport task drops the receiver.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}
