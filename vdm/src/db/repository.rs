//! Repository trait for the authentication core and its PostgreSQL implementation.
//!
//! Every multi-statement operation runs inside one `sqlx::Transaction`.
//! Transactions that replace a user's tokens first lock the user's row, so at
//! most one token of each kind per user is live even under concurrent
//! sign-ins, refreshes and reset requests. A unique index on
//! `(user_id, category)` backs the same rule in the schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use super::timeouts::{DbError, DbResult, with_default_timeout, with_transaction_timeout};
use crate::auth::{NewUserToken, TokenKind, User, UserId};
use crate::rbac::RoleName;

/// Persistence operations needed by the authentication and role components
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Find a user and their roles by email
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>>;

    /// Find a user and their roles by public tag
    async fn find_user_by_tag(&self, tag: &str) -> DbResult<Option<User>>;

    /// Find a user and their roles by ID
    async fn find_user_by_id(&self, user_id: UserId) -> DbResult<Option<User>>;

    /// Roles currently granted to a user
    async fn find_roles(&self, user_id: UserId) -> DbResult<Vec<RoleName>>;

    /// Delete every token of `token.kind` owned by the user, then insert `token`.
    ///
    /// Both statements commit together or not at all.
    async fn replace_token(&self, token: &NewUserToken) -> DbResult<()>;

    /// Exchange a live token for a new one of the same kind.
    ///
    /// In one transaction: delete the row matching `presented_hash`; if it is
    /// missing return `None`; if it was expired commit the deletion and return
    /// `None`; otherwise delete the owner's remaining tokens of that kind,
    /// insert the replacement and return the owner.
    async fn rotate_token(
        &self,
        kind: TokenKind,
        presented_hash: &str,
        replacement_hash: &str,
        replacement_expiry: DateTime<Utc>,
    ) -> DbResult<Option<UserId>>;

    /// Delete a live token and return its owner; expired or unknown tokens yield `None`.
    async fn consume_token(&self, kind: TokenKind, hash: &str) -> DbResult<Option<UserId>>;

    /// Delete every token of `kind` owned by the user, returning how many existed
    async fn delete_tokens(&self, user_id: UserId, kind: TokenKind) -> DbResult<u64>;

    /// Store a new password hash and end every refresh session of the user
    async fn update_password(&self, user_id: UserId, password_hash: &str) -> DbResult<()>;

    /// Grant a role; `false` if the association already existed
    async fn create_user_role(&self, user_id: UserId, role: RoleName) -> DbResult<bool>;

    /// Revoke a role; `false` if there was no association to remove
    async fn delete_user_role(&self, user_id: UserId, role: RoleName) -> DbResult<bool>;

    /// Check that the store answers queries
    async fn health_check(&self) -> DbResult<()>;
}

const USER_WITH_ROLES: &str = r#"
    SELECT u.id, u.email, u.tag, u.password, u.created_at,
           COALESCE(array_agg(r.name ORDER BY r.name) FILTER (WHERE r.name IS NOT NULL), '{}'::text[]) AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

/// Default PostgreSQL implementation of `AuthRepository`
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_user_where(&self, column: &str, value: UserLookup<'_>) -> DbResult<Option<User>> {
        let sql = format!("{USER_WITH_ROLES} WHERE u.{column} = $1 GROUP BY u.id");
        let query = sqlx::query(&sql);
        let query = match value {
            UserLookup::Text(text) => query.bind(text),
            UserLookup::Id(id) => query.bind(id),
        };

        let row = with_default_timeout(query.fetch_optional(&self.pool)).await?;
        row.map(|r| user_from_row(&r)).transpose()
    }
}

enum UserLookup<'a> {
    Text(&'a str),
    Id(UserId),
}

fn parse_roles(names: Vec<String>) -> DbResult<Vec<RoleName>> {
    names
        .into_iter()
        .map(|name| {
            name.parse::<RoleName>()
                .map_err(|e| DbError::CorruptRow(e.to_string()))
        })
        .collect()
}

fn user_from_row(row: &PgRow) -> DbResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        tag: row.try_get("tag")?,
        password_hash: row.try_get("password")?,
        roles: parse_roles(row.try_get("roles")?)?,
        created_at: row.try_get("created_at")?,
    })
}

/// Take the per-user write lock that serializes token replacement.
///
/// Every transaction that deletes and re-inserts a user's tokens takes this
/// lock first, so a second writer re-reads the token table only after the
/// first has committed.
async fn lock_user(conn: &mut PgConnection, user_id: UserId) -> DbResult<()> {
    with_default_timeout(
        sqlx::query("SELECT 1 FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(conn),
    )
    .await?;
    Ok(())
}

async fn delete_tokens_of_kind(
    conn: &mut PgConnection,
    user_id: UserId,
    kind: TokenKind,
) -> DbResult<u64> {
    let result = with_default_timeout(
        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1 AND category = $2")
            .bind(user_id)
            .bind(kind.as_str())
            .execute(conn),
    )
    .await?;
    Ok(result.rows_affected())
}

async fn insert_token(conn: &mut PgConnection, token: &NewUserToken) -> DbResult<()> {
    with_default_timeout(
        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, category, hash, expiry)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(token.user_id)
        .bind(token.kind.as_str())
        .bind(&token.hash)
        .bind(token.expiry)
        .execute(conn),
    )
    .await?;
    Ok(())
}

#[async_trait]
impl AuthRepository for PgAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        self.find_user_where("email", UserLookup::Text(email)).await
    }

    async fn find_user_by_tag(&self, tag: &str) -> DbResult<Option<User>> {
        self.find_user_where("tag", UserLookup::Text(tag)).await
    }

    async fn find_user_by_id(&self, user_id: UserId) -> DbResult<Option<User>> {
        self.find_user_where("id", UserLookup::Id(user_id)).await
    }

    async fn find_roles(&self, user_id: UserId) -> DbResult<Vec<RoleName>> {
        let names: Vec<String> = with_default_timeout(
            sqlx::query_scalar(
                r#"
                SELECT r.name
                FROM roles r
                JOIN user_roles ur ON ur.role_id = r.id
                WHERE ur.user_id = $1
                ORDER BY r.name
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await?;

        parse_roles(names)
    }

    async fn replace_token(&self, token: &NewUserToken) -> DbResult<()> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;
            lock_user(&mut *tx, token.user_id).await?;
            delete_tokens_of_kind(&mut *tx, token.user_id, token.kind).await?;
            insert_token(&mut *tx, token).await?;
            tx.commit().await?;
            Ok::<_, DbError>(())
        })
        .await
    }

    async fn rotate_token(
        &self,
        kind: TokenKind,
        presented_hash: &str,
        replacement_hash: &str,
        replacement_expiry: DateTime<Utc>,
    ) -> DbResult<Option<UserId>> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            // Resolve the owner without locking, then take the user lock before
            // touching any token row so every writer locks in the same order.
            let owner: Option<UserId> = with_default_timeout(
                sqlx::query_scalar(
                    "SELECT user_id FROM user_tokens WHERE hash = $1 AND category = $2",
                )
                .bind(presented_hash)
                .bind(kind.as_str())
                .fetch_optional(&mut *tx),
            )
            .await?;

            let Some(owner) = owner else {
                tx.rollback().await?;
                return Ok(None);
            };
            lock_user(&mut *tx, owner).await?;

            // Under the user lock a concurrent rotation of the same secret has
            // either committed (nothing left to delete) or not started.
            let deleted = with_default_timeout(
                sqlx::query(
                    r#"
                    DELETE FROM user_tokens
                    WHERE hash = $1 AND category = $2 AND user_id = $3
                    RETURNING user_id, expiry
                    "#,
                )
                .bind(presented_hash)
                .bind(kind.as_str())
                .bind(owner)
                .fetch_optional(&mut *tx),
            )
            .await?;

            let Some(row) = deleted else {
                tx.rollback().await?;
                return Ok(None);
            };

            let user_id: UserId = row.try_get("user_id")?;
            let expiry: DateTime<Utc> = row.try_get("expiry")?;

            if expiry <= Utc::now() {
                tx.commit().await?;
                return Ok(None);
            }

            delete_tokens_of_kind(&mut *tx, user_id, kind).await?;
            insert_token(
                &mut *tx,
                &NewUserToken {
                    user_id,
                    kind,
                    hash: replacement_hash.to_string(),
                    expiry: replacement_expiry,
                },
            )
            .await?;

            tx.commit().await?;
            Ok::<_, DbError>(Some(user_id))
        })
        .await
    }

    async fn consume_token(&self, kind: TokenKind, hash: &str) -> DbResult<Option<UserId>> {
        with_default_timeout(
            sqlx::query_scalar(
                r#"
                DELETE FROM user_tokens
                WHERE hash = $1 AND category = $2 AND expiry > NOW()
                RETURNING user_id
                "#,
            )
            .bind(hash)
            .bind(kind.as_str())
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn delete_tokens(&self, user_id: UserId, kind: TokenKind) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        delete_tokens_of_kind(&mut *conn, user_id, kind).await
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> DbResult<()> {
        with_transaction_timeout(async {
            let mut tx = self.pool.begin().await?;

            with_default_timeout(
                sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
                    .bind(user_id)
                    .bind(password_hash)
                    .execute(&mut *tx),
            )
            .await?;
            delete_tokens_of_kind(&mut *tx, user_id, TokenKind::Refresh).await?;

            tx.commit().await?;
            Ok::<_, DbError>(())
        })
        .await
    }

    async fn create_user_role(&self, user_id: UserId, role: RoleName) -> DbResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                SELECT $1, id FROM roles WHERE name = $2
                ON CONFLICT (user_id, role_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_user_role(&self, user_id: UserId, role: RoleName) -> DbResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                r#"
                DELETE FROM user_roles
                WHERE user_id = $1
                  AND role_id = (SELECT id FROM roles WHERE name = $2)
                "#,
            )
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn health_check(&self) -> DbResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}
