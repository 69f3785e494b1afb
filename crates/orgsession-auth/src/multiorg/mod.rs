//! Multi-organization session coordination.

pub mod coordinator;
pub mod session;
pub mod signout;

pub use coordinator::MultiOrgCoordinator;
pub use session::SubOrgSession;
pub use signout::{SignOutReport, SignOutSubscribers, SignOutSubscription};
