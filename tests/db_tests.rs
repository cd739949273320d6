use family_portal::{config::database::DatabaseConfig, db};
use tempfile::{NamedTempFile, TempDir};

#[tokio::test]
async fn test_create_pool_creates_missing_data_directory() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("data").join("portal.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", db_path.display()),
        max_connections: 1,
    };

    let pool = db::create_pool(&config).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool.close().await;

    assert!(db_path.exists());
}

#[tokio::test]
async fn test_create_pool_reports_unusable_data_directory() {
    // A regular file cannot be the parent of the database
    let blocker = NamedTempFile::new().unwrap();
    let db_path = blocker.path().join("data").join("portal.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", db_path.display()),
        max_connections: 1,
    };

    let result = db::create_pool(&config).await;

    assert!(matches!(result, Err(sqlx::Error::Io(_))));
}
