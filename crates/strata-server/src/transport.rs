//! Message delivery between the server and its clients
//!
//! The server only needs "send to one" and "send to all"; [`Outbox`] is that seam.
//! [`ChannelHub`] is the in-process implementation: every message crosses a
//! crossbeam channel as an encoded frame, exactly as it would cross a socket.

use ahash::AHashMap;
use crossbeam_channel::{Receiver, Sender, unbounded};
use strata_core::protocol::{self, ClientId, ClientMessage, ProtocolError, ServerMessage};

/// One inbound frame tagged with its sender
pub type InboundFrame = (ClientId, Vec<u8>);

/// Outbound side of the transport
pub trait Outbox {
    fn send(&mut self, client: ClientId, message: &ServerMessage);

    fn broadcast(&mut self, message: &ServerMessage);

    /// Forget a client; further sends to it are dropped
    fn disconnect(&mut self, _client: ClientId) {}
}

/// In-process transport over crossbeam channels
pub struct ChannelHub {
    inbound_tx: Sender<InboundFrame>,
    inbound_rx: Receiver<InboundFrame>,
    clients: AHashMap<ClientId, Sender<Vec<u8>>>,
    next_client: u32,
}

impl ChannelHub {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        Self {
            inbound_tx,
            inbound_rx,
            clients: AHashMap::new(),
            next_client: 1,
        }
    }

    /// Receiver the server drains each tick
    pub fn inbound(&self) -> Receiver<InboundFrame> {
        self.inbound_rx.clone()
    }

    /// Register a new client and hand back its end of the pipe
    pub fn connect(&mut self) -> ClientEndpoint {
        let id = ClientId(self.next_client);
        self.next_client += 1;

        let (outbound_tx, outbound_rx) = unbounded();
        self.clients.insert(id, outbound_tx);
        log::info!("[NET] {} connected", id);

        ClientEndpoint {
            id,
            to_server: self.inbound_tx.clone(),
            from_server: outbound_rx,
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    fn deliver(&mut self, client: ClientId, frame: Vec<u8>) {
        let Some(sender) = self.clients.get(&client) else {
            log::debug!("[NET] Dropping frame for unknown {}", client);
            return;
        };
        if sender.send(frame).is_err() {
            log::warn!("[NET] {} hung up, removing", client);
            self.clients.remove(&client);
        }
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Outbox for ChannelHub {
    fn send(&mut self, client: ClientId, message: &ServerMessage) {
        match protocol::encode(message) {
            Ok(frame) => self.deliver(client, frame),
            Err(e) => log::error!("[NET] {}", e),
        }
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let frame = match protocol::encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("[NET] {}", e);
                return;
            }
        };

        let mut hung_up = Vec::new();
        for (&client, sender) in &self.clients {
            if sender.send(frame.clone()).is_err() {
                hung_up.push(client);
            }
        }
        for client in hung_up {
            log::warn!("[NET] {} hung up, removing", client);
            self.clients.remove(&client);
        }
    }

    fn disconnect(&mut self, client: ClientId) {
        if self.clients.remove(&client).is_some() {
            log::debug!("[NET] {} removed from hub", client);
        }
    }
}

/// A client's handle on the hub
pub struct ClientEndpoint {
    id: ClientId,
    to_server: Sender<InboundFrame>,
    from_server: Receiver<Vec<u8>>,
}

impl ClientEndpoint {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Encode and queue a message for the server
    ///
    /// Returns false once the server side is gone.
    pub fn send(&self, message: &ClientMessage) -> Result<bool, ProtocolError> {
        let frame = protocol::encode(message)?;
        Ok(self.to_server.send((self.id, frame)).is_ok())
    }

    /// Next message from the server, if one is waiting
    ///
    /// Undecodable frames are logged and skipped.
    pub fn try_recv(&self) -> Option<ServerMessage> {
        while let Ok(frame) = self.from_server.try_recv() {
            match protocol::decode(&frame) {
                Ok(message) => return Some(message),
                Err(e) => log::warn!("[NET] {} dropped a frame: {}", self.id, e),
            }
        }
        None
    }

    /// Every message currently waiting
    pub fn drain(&self) -> Vec<ServerMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Outbox that records messages instead of sending them
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    pub sent: Vec<(ClientId, ServerMessage)>,
    pub broadcasts: Vec<ServerMessage>,
    pub disconnected: Vec<ClientId>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent directly to one client
    pub fn sent_to(&self, client: ClientId) -> Vec<&ServerMessage> {
        self.sent
            .iter()
            .filter(|(to, _)| *to == client)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
        self.broadcasts.clear();
    }
}

impl Outbox for MemoryOutbox {
    fn send(&mut self, client: ClientId, message: &ServerMessage) {
        self.sent.push((client, message.clone()));
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        self.broadcasts.push(message.clone());
    }

    fn disconnect(&mut self, client: ClientId) {
        self.disconnected.push(client);
    }
}
