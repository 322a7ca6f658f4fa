//! Carrying the ticket between client and server.
//!
//! The transport owns encoding and cryptographic protection. The session and
//! slider only see decoded tickets.

use tracing::trace;

use crate::ticket::SessionToken;

/// Per-request access to the client's ticket.
pub trait TicketTransport {
    /// The ticket the client sent, if any. Tickets that fail to decode are
    /// reported as absent.
    fn read_token(&mut self) -> Option<SessionToken>;

    /// Queue a ticket for the response. `None` deletes the client's ticket.
    fn write_token(&mut self, token: Option<SessionToken>);

    /// Whether this response already carries a ticket update.
    fn has_pending_write(&self) -> bool;
}

/// Transport backed by plain fields, for hosts without cookies and for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    incoming: Option<SessionToken>,
    pending: Option<Option<SessionToken>>,
    reads: usize,
    writes: usize,
}

impl MemoryTransport {
    pub fn new(incoming: Option<SessionToken>) -> Self {
        Self {
            incoming,
            ..Self::default()
        }
    }

    /// The queued update: `Some(None)` means delete.
    pub fn pending(&self) -> Option<&Option<SessionToken>> {
        self.pending.as_ref()
    }

    pub fn take_pending(&mut self) -> Option<Option<SessionToken>> {
        self.pending.take()
    }

    pub fn read_count(&self) -> usize {
        self.reads
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl TicketTransport for MemoryTransport {
    fn read_token(&mut self) -> Option<SessionToken> {
        self.reads += 1;
        self.incoming.clone()
    }

    fn write_token(&mut self, token: Option<SessionToken>) {
        trace!("Queued ticket update (delete: {})", token.is_none());
        self.writes += 1;
        self.pending = Some(token);
    }

    fn has_pending_write(&self) -> bool {
        self.pending.is_some()
    }
}
