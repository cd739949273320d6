use crate::models::user::{NewUser, User};
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("User not found")]
    NotFound,
    #[error("User already exists")]
    AlreadyExists,
    #[error("Nothing was added to the session")]
    NothingAdded,
    #[error("Session transaction is no longer open")]
    SessionClosed,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

const USER_COLUMNS: &str = "id, email, hashed_password, full_name, is_active, role, created_at";

/// A unit of work over one pooled connection.
///
/// Writes made through `add` are only visible to other connections after
/// `commit`. `close` consumes the session; an uncommitted transaction is
/// rolled back when the session is closed or dropped.
#[async_trait]
pub trait UserSession: Send {
    /// Stage a new user inside the open transaction.
    async fn add(&mut self, user: &NewUser) -> RepositoryResult<()>;
    async fn commit(&mut self) -> RepositoryResult<()>;
    /// No-op once the transaction has been committed or rolled back.
    async fn rollback(&mut self) -> RepositoryResult<()>;
    /// Reload the most recently added user, including server-generated columns.
    async fn refresh(&mut self) -> RepositoryResult<User>;
    fn close(self: Box<Self>);
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn open_session(&self) -> RepositoryResult<Box<dyn UserSession>>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn count_users(&self) -> RepositoryResult<i64>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn open_session(&self) -> RepositoryResult<Box<dyn UserSession>> {
        let tx = self.pool.begin().await?;
        debug!("session opened");

        Ok(Box::new(SqliteUserSession {
            pool: self.pool.clone(),
            tx: Some(tx),
            added_id: None,
        }))
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn count_users(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

pub struct SqliteUserSession {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
    added_id: Option<i64>,
}

#[async_trait]
impl UserSession for SqliteUserSession {
    async fn add(&mut self, user: &NewUser) -> RepositoryResult<()> {
        let tx = self.tx.as_mut().ok_or(RepositoryError::SessionClosed)?;

        let result = sqlx::query(
            "INSERT INTO users (email, hashed_password, full_name, is_active, role) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(user.role)
        .execute(&mut **tx)
        .await
        .map_err(map_insert_error)?;

        self.added_id = Some(result.last_insert_rowid());
        Ok(())
    }

    async fn commit(&mut self) -> RepositoryResult<()> {
        let tx = self.tx.take().ok_or(RepositoryError::SessionClosed)?;
        tx.commit().await?;
        debug!("session committed");
        Ok(())
    }

    async fn rollback(&mut self) -> RepositoryResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            debug!("session rolled back");
        }
        self.added_id = None;
        Ok(())
    }

    async fn refresh(&mut self) -> RepositoryResult<User> {
        let id = self.added_id.ok_or(RepositoryError::NothingAdded)?;
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);

        let user = match self.tx.as_mut() {
            Some(tx) => {
                sqlx::query_as::<_, User>(&query)
                    .bind(id)
                    .fetch_optional(&mut **tx)
                    .await?
            }
            None => {
                sqlx::query_as::<_, User>(&query)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        user.ok_or(RepositoryError::NotFound)
    }

    fn close(mut self: Box<Self>) {
        if self.tx.take().is_some() {
            debug!("session closed with an open transaction; rolling back");
        } else {
            debug!("session closed");
        }
    }
}

fn map_insert_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::AlreadyExists;
        }
    }
    RepositoryError::Database(err)
}
