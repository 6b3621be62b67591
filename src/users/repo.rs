use anyhow::Context;
use axum::async_trait;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use thiserror::Error;
use tracing::{debug, warn};

use crate::users::repo_types::{NewUser, User, UserChanges};

const CREATE_USERS_TABLE: &str = include_str!("../../migrations/0001_create_users.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {0} not found")]
    NotFound(i64),
    #[error("user {0} already exists")]
    AlreadyExists(i64),
    #[error("user id space exhausted")]
    IdsExhausted,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence for user records.
///
/// Every call borrows its own connection or transaction and gives it back
/// before returning, on success and on error alike.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. An explicit id that is already taken is `AlreadyExists`.
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    async fn get(&self, id: i64) -> Result<Option<User>, StoreError>;
    /// All users ordered by id.
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError>;
    async fn set_password(&self, id: i64, hashed: &str) -> Result<User, StoreError>;
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
    /// Drop every user and recreate empty storage.
    async fn reset(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self::from_pool(db))
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tx = self.db.begin().await?;

        let user = match new.id {
            Some(id) => {
                let inserted = sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (id, username, email, fullname)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (id) DO NOTHING
                    RETURNING id, username, email, fullname, password
                    "#,
                )
                .bind(id)
                .bind(&new.username)
                .bind(&new.email)
                .bind(&new.fullname)
                .fetch_optional(&mut *tx)
                .await?;

                let Some(user) = inserted else {
                    warn!(user_id = id, "explicit id already taken");
                    return Err(StoreError::AlreadyExists(id));
                };

                // the sequence only moves forward, past explicitly chosen ids
                sqlx::query(
                    r#"
                    SELECT setval(
                        pg_get_serial_sequence('users', 'id'),
                        GREATEST($1, (SELECT last_value FROM users_id_seq))
                    )
                    "#,
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;
                user
            }
            None => {
                sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (username, email, fullname)
                    VALUES ($1, $2, $3)
                    RETURNING id, username, email, fullname, password
                    "#,
                )
                .bind(&new.username)
                .bind(&new.email)
                .bind(&new.fullname)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(user)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, fullname, password
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, fullname, password
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        let set_fullname = changes.fullname.is_some();
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = COALESCE($2, username),
                   email    = COALESCE($3, email),
                   fullname = CASE WHEN $4 THEN $5 ELSE fullname END
             WHERE id = $1
            RETURNING id, username, email, fullname, password
            "#,
        )
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(set_fullname)
        .bind(changes.fullname.flatten())
        .fetch_optional(&self.db)
        .await?;
        user.ok_or(StoreError::NotFound(id))
    }

    async fn set_password(&self, id: i64, hashed: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET password = $2
             WHERE id = $1
            RETURNING id, username, email, fullname, password
            "#,
        )
        .bind(id)
        .bind(hashed)
        .fetch_optional(&self.db)
        .await?;
        user.ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;
        (&mut *tx).execute("DROP TABLE IF EXISTS users").await?;
        (&mut *tx).execute(CREATE_USERS_TABLE).await?;
        tx.commit().await?;
        debug!("users table recreated");
        Ok(())
    }
}
