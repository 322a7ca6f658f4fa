//! The impersonation state machine over one client's ticket.

use authz::{
    types::{Decision, DenyReason},
    PermissionGate,
};
use tracing::{debug, info, trace};

use crate::{
    config::ImpersonationConfig,
    error::{ImpersonationError, Result},
    identity::RequestContext,
    ticket::SessionToken,
    transport::TicketTransport,
};

/// Impersonation state, derived from the ticket payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImpersonationState {
    NotImpersonating,
    Impersonating {
        actual_user: String,
        impersonated_user: String,
    },
}

/// Request-scoped view of the caller's ticket.
///
/// The ticket is read from the transport at most once and then memoized, so
/// repeated queries never repeat transport I/O. `start` and `stop` either
/// hand a complete update to the transport or leave everything untouched.
pub struct ImpersonationSession<'a, T: TicketTransport> {
    ctx: &'a RequestContext,
    config: &'a ImpersonationConfig,
    transport: &'a mut T,
    ticket: Option<SessionToken>,
}

impl<'a, T: TicketTransport> ImpersonationSession<'a, T> {
    pub fn new(ctx: &'a RequestContext, config: &'a ImpersonationConfig, transport: &'a mut T) -> Self {
        Self {
            ctx,
            config,
            transport,
            ticket: None,
        }
    }

    /// The externally authenticated user behind this request.
    pub fn actual_user(&self) -> Result<&'a str> {
        self.ctx.resolve_actual_user(self.config)
    }

    /// Client workstation reported by the transport, if any.
    pub fn workstation(&self) -> Option<&'a str> {
        self.ctx.workstation.as_deref()
    }

    /// The caller's ticket, creating a fresh one if none is usable.
    pub fn ticket(&mut self) -> Result<&SessionToken> {
        let ticket = match self.ticket.take() {
            Some(ticket) => ticket,
            None => self.load_ticket()?,
        };
        Ok(self.ticket.insert(ticket))
    }

    /// The user currently being impersonated, if any.
    pub fn current_impersonated_user(&mut self) -> Result<Option<String>> {
        self.ticket()?.impersonated_user()
    }

    pub fn state(&mut self) -> Result<ImpersonationState> {
        let actual_user = self.actual_user()?;
        Ok(match self.current_impersonated_user()? {
            Some(impersonated_user) => ImpersonationState::Impersonating {
                actual_user: actual_user.to_string(),
                impersonated_user,
            },
            None => ImpersonationState::NotImpersonating,
        })
    }

    /// Begin acting as `impersonated_user`.
    ///
    /// Requires the session to be `NotImpersonating` and the permission gate
    /// to allow it. On any failure the ticket is left as it was.
    pub async fn start(&mut self, gate: &PermissionGate, impersonated_user: &str) -> Result<()> {
        let actual_user = self.actual_user()?;
        trace!("Impersonate: {} as {}.", actual_user, impersonated_user);

        if impersonated_user.trim().is_empty() {
            return Err(ImpersonationError::InvalidArgument(
                "Empty impersonated user is not allowed.".to_string(),
            ));
        }

        if let Some(current) = self.current_impersonated_user()? {
            return Err(ImpersonationError::AlreadyImpersonating(current));
        }

        match gate.can_impersonate(actual_user, impersonated_user).await? {
            Decision::Allow => {}
            Decision::Deny(DenyReason::NotPermitted) => {
                return Err(ImpersonationError::NotPermitted(
                    impersonated_user.to_string(),
                ))
            }
            Decision::Deny(DenyReason::PrivilegeEscalation { .. }) => {
                return Err(ImpersonationError::PrivilegeEscalation(
                    impersonated_user.to_string(),
                ))
            }
        }

        let updated = self.ticket()?.with_impersonated_user(Some(impersonated_user));
        self.transport.write_token(Some(updated.clone()));
        self.ticket = Some(updated);

        info!("User '{}' is now impersonating '{}'", actual_user, impersonated_user);
        Ok(())
    }

    /// Stop impersonating. Does nothing if not impersonating.
    pub fn stop(&mut self) -> Result<()> {
        let actual_user = self.actual_user()?;
        let impersonated_user = self.current_impersonated_user()?;
        trace!("StopImpersonating: {} as {:?}.", actual_user, impersonated_user);

        let Some(impersonated_user) = impersonated_user else {
            return Ok(());
        };

        self.transport.write_token(None);
        self.ticket = Some(self.fresh_ticket(actual_user));

        info!(
            "User '{}' stopped impersonating '{}'",
            actual_user, impersonated_user
        );
        Ok(())
    }

    fn fresh_ticket(&self, actual_user: &str) -> SessionToken {
        SessionToken::fresh(actual_user, self.ctx.now, self.config.ticket_timeout)
            .with_path(self.config.cookie_path.as_str())
    }

    fn load_ticket(&mut self) -> Result<SessionToken> {
        let actual_user = self.actual_user()?;

        match self.transport.read_token() {
            Some(ticket) if ticket.is_expired(self.ctx.now) => {
                debug!("Ignoring expired ticket for {}", ticket.actual_user);
            }
            Some(ticket) if ticket.actual_user != actual_user => {
                debug!(
                    "Ignoring ticket issued to {} for request authenticated as {}",
                    ticket.actual_user, actual_user
                );
            }
            Some(ticket) => return Ok(ticket),
            None => {}
        }

        Ok(self.fresh_ticket(actual_user))
    }
}
