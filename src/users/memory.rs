//! In-process user store backing the router tests.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    NewUser, ResetTokenFields, StoreError, User, UserCredentials, UserPatch, UserStore,
};

struct Record {
    user: User,
    password_hash: String,
    reset: Option<ResetTokenFields>,
}

impl Record {
    fn credentials(&self) -> UserCredentials {
        UserCredentials {
            id: self.user.id,
            password_hash: self.password_hash.clone(),
        }
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    records: RwLock<HashMap<Uuid, Record>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reset_fields(&self, id: Uuid) -> Option<ResetTokenFields> {
        self.records
            .read()
            .await
            .get(&id)
            .and_then(|r| r.reset.clone())
    }

    pub async fn password_hash(&self, id: Uuid) -> Option<String> {
        self.records
            .read()
            .await
            .get(&id)
            .map(|r| r.password_hash.clone())
    }
}

fn email_taken(records: &HashMap<Uuid, Record>, email: &str, except: Option<Uuid>) -> bool {
    records
        .values()
        .any(|r| Some(r.user.id) != except && r.user.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.records.read().await.get(&id).map(|r| r.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
            .map(|r| r.user.clone()))
    }

    async fn credentials_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, StoreError> {
        Ok(self.records.read().await.get(&id).map(Record::credentials))
    }

    async fn credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
            .map(Record::credentials))
    }

    async fn find_by_reset_hash(
        &self,
        hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| {
                r.reset
                    .as_ref()
                    .is_some_and(|t| t.hash == hash && t.expires_at > now)
            })
            .map(|r| r.user.clone()))
    }

    async fn consume_reset_token(
        &self,
        hash: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.values_mut().find(|r| {
            r.reset
                .as_ref()
                .is_some_and(|t| t.hash == hash && t.expires_at > now)
        }) else {
            return Ok(None);
        };
        record.password_hash = password_hash.to_string();
        record.reset = None;
        Ok(Some(record.user.clone()))
    }

    async fn create(&self, new: NewUser<'_>) -> Result<User, StoreError> {
        let mut records = self.records.write().await;
        if email_taken(&records, new.email, None) {
            return Err(StoreError::Conflict("email"));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name.to_string(),
            email: new.email.to_string(),
            role: new.role,
            avatar: new.avatar,
            created_at: OffsetDateTime::now_utc(),
        };
        records.insert(
            user.id,
            Record {
                user: user.clone(),
                password_hash: new.password.as_str().to_string(),
                reset: None,
            },
        );
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .records
            .read()
            .await
            .values()
            .map(|r| r.user.clone())
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut records = self.records.write().await;
        if let Some(email) = patch.email.as_deref() {
            if email_taken(&records, email, Some(id)) {
                return Err(StoreError::Conflict("email"));
            }
        }
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            record.user.name = name;
        }
        if let Some(email) = patch.email {
            record.user.email = email;
        }
        if let Some(role) = patch.role {
            record.user.role = role;
        }
        Ok(Some(record.user.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        if let Some(record) = self.records.write().await.get_mut(&id) {
            record.password_hash = hash.to_string();
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token: Option<ResetTokenFields>,
    ) -> Result<(), StoreError> {
        if let Some(record) = self.records.write().await.get_mut(&id) {
            record.reset = token;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }
}
