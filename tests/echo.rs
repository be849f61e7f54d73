//! Statement echo is observable through the installed log sink.
//!
//! Kept in its own test binary because it installs the global subscriber.

use dbkit::{ConnectionConfig, Database, LoggingConfig, Schema, init_logging};

#[tokio::test]
async fn echo_toggles_statement_logging() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let guard = init_logging(&LoggingConfig {
        filter: Some("sqlx::query=trace".to_string()),
        directory: Some(dir.path().to_path_buf()),
        file_name: "echo.log".to_string(),
    })?;

    let quiet = Database::new(ConnectionConfig::sqlite_in_memory(), Schema::new()).await?;
    quiet.execute("SELECT 'echo-off-marker'").await?;

    let loud = Database::new(ConnectionConfig::sqlite_in_memory().with_echo(true), Schema::new()).await?;
    loud.execute("SELECT 'echo-on-marker'").await?;

    quiet.close().await;
    loud.close().await;
    drop(guard);

    let log = std::fs::read_to_string(dir.path().join("echo.log"))?;
    assert!(log.contains("echo-on-marker"), "echoed statement missing from log:\n{log}");
    assert!(!log.contains("echo-off-marker"), "statement logged with echo disabled:\n{log}");
    Ok(())
}
