//! Session, authorization, and account-lifecycle core for Vitrine.
//!
//! One [`SessionStore`] maps the authenticated identity to its profile,
//! role, and derived permission set, publishes that view through a watch
//! channel, and keeps it converged with server truth via the auth-event
//! listener and the change feed. The [`SubscriptionManager`] shares one
//! underlying feed channel per table across any number of subscribers.
//!
//! Everything here is advisory with respect to authorization: the backend's
//! row-level policies are the real boundary.

pub mod accounts;
pub mod error;
pub mod session;
pub mod subscription;

pub use accounts::{generate_temp_password, ProvisionedAccount};
pub use error::{Result, SessionError};
pub use session::{SessionSnapshot, SessionStore};
pub use subscription::{Hooks, Subscription, SubscriptionManager};

#[cfg(test)]
mod tests;
