//! Password reset tokens.
//!
//! The plaintext only ever leaves the process inside the reset email; the
//! user record keeps only its SHA-256 digest.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::password::HashedPassword;
use crate::users::{ResetTokenFields, StoreError, User, UserStore};

const TOKEN_BYTES: usize = 20;

pub struct ResetToken {
    pub plaintext: String,
    pub hash: String,
}

pub fn generate() -> ResetToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    let hash = hash_token(&plaintext);
    ResetToken { plaintext, hash }
}

pub fn hash_token(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Stores `hash` on the user, replacing any earlier token.
pub async fn attach(
    store: &dyn UserStore,
    user_id: Uuid,
    hash: &str,
    ttl: Duration,
) -> Result<OffsetDateTime, StoreError> {
    let expires_at = OffsetDateTime::now_utc() + ttl;
    store
        .set_reset_token(
            user_id,
            Some(ResetTokenFields {
                hash: hash.to_string(),
                expires_at,
            }),
        )
        .await?;
    debug!(%user_id, "reset token attached");
    Ok(expires_at)
}

/// Expired and unknown tokens both come back as `None`.
pub async fn resolve(store: &dyn UserStore, plaintext: &str) -> Result<Option<User>, StoreError> {
    store
        .find_by_reset_hash(&hash_token(plaintext), OffsetDateTime::now_utc())
        .await
}

/// Sets the new password and spends the token in a single store write.
/// Only one caller can win for a given token.
pub async fn consume(
    store: &dyn UserStore,
    plaintext: &str,
    password: &HashedPassword,
) -> Result<Option<User>, StoreError> {
    let user = store
        .consume_reset_token(
            &hash_token(plaintext),
            OffsetDateTime::now_utc(),
            password.as_str(),
        )
        .await?;
    if let Some(u) = &user {
        debug!(user_id = %u.id, "reset token consumed");
    }
    Ok(user)
}

pub async fn clear(store: &dyn UserStore, user_id: Uuid) -> Result<(), StoreError> {
    store.set_reset_token(user_id, None).await?;
    debug!(%user_id, "reset token cleared");
    Ok(())
}
