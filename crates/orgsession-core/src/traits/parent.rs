//! Boundaries to the parent session and the identity provider.
//!
//! Sign-in, token storage, and the OAuth exchange itself live in the host
//! application; OrgSession only consumes them through these traits.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{Organization, OrganizationId, TokenResult};

/// Anything that can hand out a current access token.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Return the current access token. Implementations must not cache
    /// beyond what their own token store already does.
    async fn access_token(&self) -> AppResult<String>;
}

/// The parent instance's session state, as seen by a sub-organization coordinator.
#[async_trait]
pub trait ParentSession: AccessTokenSource {
    /// Whether the parent has completed sign-in.
    async fn is_signed_in(&self) -> bool;

    /// Organizations the signed-in principal belongs to.
    ///
    /// `None` means the membership list has not been loaded.
    async fn available_organizations(&self) -> Option<Vec<Organization>>;
}

/// Exchanges the parent's credential for an organization-scoped one.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Perform the exchange for `organization_id`.
    async fn exchange(&self, organization_id: &OrganizationId) -> AppResult<TokenResult>;
}
