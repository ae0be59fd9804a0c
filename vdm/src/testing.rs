//! In-memory collaborators for tests.
//!
//! Enabled by the `testing` feature. [`InMemoryRepository`] keeps all state
//! behind one mutex so every trait operation is atomic, which is what the
//! PostgreSQL transactions guarantee in production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::{NewUserToken, PasswordHashingConfig, SecurityConfig, TokenKind, User, UserId};
use crate::db::{AuthRepository, DbError, DbResult};
use crate::mail::{MailError, Mailer};
use crate::rbac::RoleName;

/// Security configuration with cheap Argon2 parameters
pub fn fast_security_config() -> SecurityConfig {
    SecurityConfig {
        password_hashing: PasswordHashingConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        },
        ..SecurityConfig::development()
    }
}

#[derive(Debug, Clone)]
struct StoredToken {
    user_id: UserId,
    kind: TokenKind,
    hash: String,
    expiry: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    tokens: Vec<StoredToken>,
    failing: bool,
}

impl State {
    fn check(&self) -> DbResult<()> {
        if self.failing {
            Err(DbError::Timeout(Duration::from_secs(5)))
        } else {
            Ok(())
        }
    }

    fn remove_tokens(&mut self, user_id: UserId, kind: TokenKind) -> u64 {
        let before = self.tokens.len();
        self.tokens
            .retain(|t| !(t.user_id == user_id && t.kind == kind));
        (before - self.tokens.len()) as u64
    }

    fn take_token(&mut self, kind: TokenKind, hash: &str) -> Option<StoredToken> {
        let index = self
            .tokens
            .iter()
            .position(|t| t.kind == kind && t.hash == hash)?;
        Some(self.tokens.remove(index))
    }
}

/// Repository keeping users and tokens in process memory
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a user and return the stored record
    pub fn insert_user(
        &self,
        email: &str,
        tag: &str,
        password_hash: &str,
        roles: &[RoleName],
    ) -> User {
        let mut roles = roles.to_vec();
        roles.sort();
        roles.dedup();

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            tag: tag.to_string(),
            password_hash: password_hash.to_string(),
            roles,
            created_at: Utc::now(),
        };
        self.state().users.insert(user.id, user.clone());
        user
    }

    /// Number of stored tokens of `kind` owned by the user, expired ones included
    pub fn token_count(&self, user_id: UserId, kind: TokenKind) -> usize {
        self.state()
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id && t.kind == kind)
            .count()
    }

    /// Move the expiry of every token of `kind` owned by the user into the past
    pub fn expire_tokens(&self, user_id: UserId, kind: TokenKind) {
        let past = Utc::now() - chrono::Duration::seconds(1);
        for token in self
            .state()
            .tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.kind == kind)
        {
            token.expiry = past;
        }
    }

    /// Current password hash of a user
    pub fn password_hash(&self, user_id: UserId) -> Option<String> {
        self.state()
            .users
            .get(&user_id)
            .map(|u| u.password_hash.clone())
    }

    /// Make every subsequent operation fail as if the database timed out
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    fn find_user(&self, predicate: impl Fn(&User) -> bool) -> DbResult<Option<User>> {
        let state = self.state();
        state.check()?;
        Ok(state.users.values().find(|u| predicate(u)).cloned())
    }
}

#[async_trait]
impl AuthRepository for InMemoryRepository {
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        self.find_user(|u| u.email == email)
    }

    async fn find_user_by_tag(&self, tag: &str) -> DbResult<Option<User>> {
        self.find_user(|u| u.tag == tag)
    }

    async fn find_user_by_id(&self, user_id: UserId) -> DbResult<Option<User>> {
        self.find_user(|u| u.id == user_id)
    }

    async fn find_roles(&self, user_id: UserId) -> DbResult<Vec<RoleName>> {
        let state = self.state();
        state.check()?;
        Ok(state
            .users
            .get(&user_id)
            .map(|u| u.roles.clone())
            .unwrap_or_default())
    }

    async fn replace_token(&self, token: &NewUserToken) -> DbResult<()> {
        let mut state = self.state();
        state.check()?;
        state.remove_tokens(token.user_id, token.kind);
        state.tokens.push(StoredToken {
            user_id: token.user_id,
            kind: token.kind,
            hash: token.hash.clone(),
            expiry: token.expiry,
        });
        Ok(())
    }

    async fn rotate_token(
        &self,
        kind: TokenKind,
        presented_hash: &str,
        replacement_hash: &str,
        replacement_expiry: DateTime<Utc>,
    ) -> DbResult<Option<UserId>> {
        let mut state = self.state();
        state.check()?;

        let Some(presented) = state.take_token(kind, presented_hash) else {
            return Ok(None);
        };
        if presented.expiry <= Utc::now() {
            return Ok(None);
        }

        state.remove_tokens(presented.user_id, kind);
        state.tokens.push(StoredToken {
            user_id: presented.user_id,
            kind,
            hash: replacement_hash.to_string(),
            expiry: replacement_expiry,
        });
        Ok(Some(presented.user_id))
    }

    async fn consume_token(&self, kind: TokenKind, hash: &str) -> DbResult<Option<UserId>> {
        let mut state = self.state();
        state.check()?;

        let now = Utc::now();
        let index = state
            .tokens
            .iter()
            .position(|t| t.kind == kind && t.hash == hash && t.expiry > now);
        Ok(index.map(|i| state.tokens.remove(i).user_id))
    }

    async fn delete_tokens(&self, user_id: UserId, kind: TokenKind) -> DbResult<u64> {
        let mut state = self.state();
        state.check()?;
        Ok(state.remove_tokens(user_id, kind))
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> DbResult<()> {
        let mut state = self.state();
        state.check()?;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
        }
        state.remove_tokens(user_id, TokenKind::Refresh);
        Ok(())
    }

    async fn create_user_role(&self, user_id: UserId, role: RoleName) -> DbResult<bool> {
        let mut state = self.state();
        state.check()?;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if user.roles.contains(&role) {
            return Ok(false);
        }
        user.roles.push(role);
        user.roles.sort();
        Ok(true)
    }

    async fn delete_user_role(&self, user_id: UserId, role: RoleName) -> DbResult<bool> {
        let mut state = self.state();
        state.check()?;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = user.roles.len();
        user.roles.retain(|r| *r != role);
        Ok(user.roles.len() != before)
    }

    async fn health_check(&self) -> DbResult<()> {
        self.state().check()
    }
}

/// Mailer that keeps every reset link it was handed
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    failing: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mailer whose deliveries always fail
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            failing: true,
        }
    }

    /// `(destination, link)` pairs in delivery order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Raw token embedded in the most recent link
    pub fn last_token(&self) -> Option<String> {
        self.sent()
            .last()
            .and_then(|(_, link)| link.split("token=").nth(1).map(str::to_string))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError::Delivery("mail relay unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((to.to_string(), link.to_string()));
        Ok(())
    }
}
