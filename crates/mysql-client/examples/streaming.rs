//! Streaming a large result set.
//!
//! Rows are read from the connection as they are consumed instead of being
//! buffered.
//!
//! # Running
//!
//! ```bash
//! MYSQL_HOST=localhost MYSQL_USER=root MYSQL_PASSWORD=secret cargo run --example streaming
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use mysql_client::{Config, Credentials, Error, RowSource, Session};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("MYSQL_HOST").unwrap_or_else(|_| "localhost".into());
    let user = std::env::var("MYSQL_USER").unwrap_or_else(|_| "root".into());
    let password = std::env::var("MYSQL_PASSWORD").unwrap_or_default();

    let config = Config::new()
        .host(host)
        .credentials(Credentials::new(user, password))
        .command_timeout(Duration::from_secs(120));
    let mut session = Session::open(config).await?;

    let mut rows = session
        .query_stream(
            "SELECT a.seq * 1000 + b.seq AS n \
             FROM seq_0_to_999 a CROSS JOIN seq_0_to_999 b",
        )
        .await?;

    let mut total: u64 = 0;
    let mut count = 0usize;
    while rows.has_next().await? {
        total += rows.next().await?.get::<u64>(0)?;
        count += 1;
        if count % 100_000 == 0 {
            println!("{count} rows so far");
        }
    }
    println!("{count} rows, sum {total}");
    drop(rows);

    session.close().await
}
