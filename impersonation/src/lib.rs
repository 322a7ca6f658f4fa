//! Impersonation sessions for claim-based platforms
//!
//! This crate lets an authenticated operator act as another registered user:
//! - Request identities and the accepted authentication schemes
//! - The session ticket and its `Impersonating:` payload marker
//! - The start/stop state machine, gated by `authz::PermissionGate`
//! - Sliding ticket expiration
//! - The effective-user view the rest of the platform authorizes against
//!
//! Ticket transport (cookies, headers, encryption) belongs to the host and
//! is reached through [`TicketTransport`].

pub mod config;
pub mod error;
pub mod identity;
pub mod session;
pub mod slider;
pub mod ticket;
pub mod transport;
pub mod user_info;

// Re-export commonly used types
pub use config::ImpersonationConfig;
pub use error::{ImpersonationError, Result as ImpersonationResult};
pub use identity::{Identity, RequestContext};
pub use session::{ImpersonationSession, ImpersonationState};
pub use slider::{ExpirySlider, SlideOutcome};
pub use ticket::{SessionToken, IMPERSONATING_PREFIX, TICKET_VERSION};
pub use transport::{MemoryTransport, TicketTransport};
pub use user_info::EffectiveUser;
