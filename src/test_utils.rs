pub mod test_helpers {
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use tempfile::NamedTempFile;

    use crate::auth::password::hash_password;
    use crate::models::user::UserRole;

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Create a temporary file-based SQLite database for testing
    /// Useful when a second pool has to see what the first one committed
    pub async fn create_test_db_file() -> Result<(SqlitePool, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let database_url = sqlite_url(&temp_file)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok((pool, temp_file))
    }

    pub fn sqlite_url(file: &NamedTempFile) -> Result<String, sqlx::Error> {
        let db_path = file
            .path()
            .to_str()
            .ok_or_else(|| sqlx::Error::Configuration("Invalid database path".into()))?;
        Ok(format!("sqlite://{}", db_path))
    }

    /// Insert a test user with hashed password
    pub async fn insert_test_user(
        pool: &SqlitePool,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<i64, sqlx::Error> {
        let password_hash = hash_password(password).map_err(|e| {
            sqlx::Error::Configuration(format!("Password hashing failed: {}", e).into())
        })?;

        let result = sqlx::query(
            "INSERT INTO users (email, hashed_password, full_name, is_active, role) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind("Test User")
        .bind(true)
        .bind(role)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

/// An in-memory `UserSession` that records every call made on it.
pub mod tracking {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use async_trait::async_trait;

    use crate::models::user::{NewUser, User};
    use crate::repositories::user_repository::{RepositoryError, RepositoryResult, UserSession};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FailAt {
        Add,
        Commit,
        Refresh,
    }

    #[derive(Debug, Default)]
    pub struct SessionLog {
        added: Mutex<Vec<NewUser>>,
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
        closes: AtomicUsize,
        releases: AtomicUsize,
    }

    impl SessionLog {
        pub fn added(&self) -> Vec<NewUser> {
            self.added
                .lock()
                .map(|added| added.clone())
                .unwrap_or_default()
        }

        pub fn commits(&self) -> usize {
            self.commits.load(Ordering::SeqCst)
        }

        pub fn rollbacks(&self) -> usize {
            self.rollbacks.load(Ordering::SeqCst)
        }

        /// Explicit `close` calls.
        pub fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        /// Sessions dropped, whether closed explicitly or not.
        pub fn releases(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }
    }

    pub struct TrackingSession {
        log: Arc<SessionLog>,
        fail_at: Option<FailAt>,
        staged: Option<NewUser>,
    }

    impl TrackingSession {
        pub fn new(log: Arc<SessionLog>) -> Self {
            Self {
                log,
                fail_at: None,
                staged: None,
            }
        }

        pub fn failing_at(log: Arc<SessionLog>, fail_at: FailAt) -> Self {
            Self {
                log,
                fail_at: Some(fail_at),
                staged: None,
            }
        }
    }

    #[async_trait]
    impl UserSession for TrackingSession {
        async fn add(&mut self, user: &NewUser) -> RepositoryResult<()> {
            if self.fail_at == Some(FailAt::Add) {
                return Err(RepositoryError::AlreadyExists);
            }
            if let Ok(mut added) = self.log.added.lock() {
                added.push(user.clone());
            }
            self.staged = Some(user.clone());
            Ok(())
        }

        async fn commit(&mut self) -> RepositoryResult<()> {
            if self.fail_at == Some(FailAt::Commit) {
                return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
            }
            self.log.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(&mut self) -> RepositoryResult<()> {
            self.log.rollbacks.fetch_add(1, Ordering::SeqCst);
            self.staged = None;
            Ok(())
        }

        async fn refresh(&mut self) -> RepositoryResult<User> {
            if self.fail_at == Some(FailAt::Refresh) {
                return Err(RepositoryError::NotFound);
            }
            let staged = self.staged.clone().ok_or(RepositoryError::NothingAdded)?;
            Ok(User {
                id: 1,
                email: staged.email,
                hashed_password: staged.hashed_password,
                full_name: staged.full_name,
                is_active: staged.is_active,
                role: staged.role,
                created_at: Some("2025-01-01 00:00:00".to_string()),
            })
        }

        fn close(self: Box<Self>) {
            self.log.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Drop for TrackingSession {
        fn drop(&mut self) {
            self.log.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}
