mod repo;
pub mod repo_types;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

pub use crate::db::StoreError;
pub use repo::PgUserStore;
pub use repo_types::{
    Avatar, NewUser, ResetTokenFields, Role, User, UserCredentials, UserPatch,
};

/// Persistence for user records. Emails are compared case-insensitively;
/// callers pass them already normalized.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn credentials_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, StoreError>;
    async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError>;

    /// User whose reset hash equals `hash` and whose expiry is after `now`.
    async fn find_by_reset_hash(
        &self,
        hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;

    /// Swaps in `password_hash` and clears the reset fields in one write,
    /// but only while `hash` still names an unexpired token.
    async fn consume_reset_token(
        &self,
        hash: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn create(&self, new: NewUser<'_>) -> Result<User, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError>;
    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<ResetTokenFields>,
    ) -> Result<(), StoreError>;
    /// Returns false when no such user existed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
