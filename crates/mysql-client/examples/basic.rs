//! Basic connection and query example.
//!
//! # Running
//!
//! ```bash
//! export MYSQL_HOST=localhost
//! export MYSQL_DATABASE=test
//! export MYSQL_USER=root
//! export MYSQL_PASSWORD=secret
//!
//! cargo run --example basic
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mysql_client::{Config, Error, RowSource, Session};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("MYSQL_HOST").unwrap_or_else(|_| "localhost".into());
    let database = std::env::var("MYSQL_DATABASE").unwrap_or_else(|_| "test".into());
    let user = std::env::var("MYSQL_USER").unwrap_or_else(|_| "root".into());
    let password = std::env::var("MYSQL_PASSWORD").unwrap_or_default();

    let conn_str = format!(
        "Server={};Database={};User={};Password={};CharacterEncoding=utf8mb4",
        host, database, user, password
    );
    let config = Config::from_connection_string(&conn_str)?;

    println!("Connecting to MySQL at {}...", host);
    let mut session = Session::open(config).await?;
    println!(
        "Connected to {} (connection {})",
        session.server_info().server_version,
        session.server_info().connection_id
    );

    let mut rows = session
        .query("SELECT table_name, table_rows FROM information_schema.tables LIMIT 10")
        .await?;
    for column in rows.columns() {
        println!("column {}: {}", column.name(), column.type_name());
    }
    while rows.has_next().await? {
        let row = rows.next().await?;
        let name: String = row.get(0)?;
        let count: Option<u64> = row.get(1)?;
        match count {
            Some(count) => println!("{name}: ~{count} rows"),
            None => println!("{name}: (view)"),
        }
    }

    let result = session.execute("SET @greeting = 'hello'").await?;
    println!("SET affected {} rows", result.affected_rows);

    println!("Session valid: {}", session.is_valid().await);
    session.close().await?;
    Ok(())
}
