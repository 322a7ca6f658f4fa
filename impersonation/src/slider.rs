//! Sliding expiration for tickets.
//!
//! A live ticket is reissued only once at most half of the timeout is left.
//! Expired tickets are deleted, never renewed.

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::{
    ticket::{expiry_after, SessionToken},
    transport::TicketTransport,
};

/// What the slider did with a request's ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideOutcome {
    /// The response already carries a ticket update
    AlreadyWritten,
    /// The client sent no ticket
    NoTicket,
    /// The ticket had expired and was deleted
    Invalidated,
    /// The ticket was reissued with a new expiry
    Renewed(SessionToken),
    /// More than half the timeout is left
    Untouched,
}

/// Half-life renewal policy for tickets.
#[derive(Debug, Clone, Copy)]
pub struct ExpirySlider {
    timeout: Duration,
}

impl ExpirySlider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Decide what to do with `ticket` at `now`, without side effects.
    pub fn evaluate(&self, ticket: &SessionToken, now: DateTime<Utc>) -> SlideOutcome {
        if ticket.is_expired(now) {
            return SlideOutcome::Invalidated;
        }

        let remaining = ticket.remaining(now);
        if remaining > self.timeout / 2 {
            return SlideOutcome::Untouched;
        }

        trace!(
            "Ticket age left is {} minutes, refreshing expiration.",
            remaining.num_minutes()
        );
        SlideOutcome::Renewed(ticket.renewed(expiry_after(now, self.timeout)))
    }

    /// Apply the policy to the request's ticket through `transport`.
    pub fn slide<T: TicketTransport>(&self, transport: &mut T, now: DateTime<Utc>) -> SlideOutcome {
        if transport.has_pending_write() {
            return SlideOutcome::AlreadyWritten;
        }

        let Some(ticket) = transport.read_token() else {
            return SlideOutcome::NoTicket;
        };

        let outcome = self.evaluate(&ticket, now);
        match &outcome {
            SlideOutcome::Invalidated => {
                trace!("Found expired ticket, removing it.");
                transport.write_token(None);
            }
            SlideOutcome::Renewed(renewed) => transport.write_token(Some(renewed.clone())),
            _ => trace!(
                "Found valid existing ticket with expiration: {}",
                ticket.expire_time.to_rfc3339()
            ),
        }
        outcome
    }
}
