//! Shard routing example.
//!
//! Builds a static directory for two range shards and opens a session to
//! the member holding a key.
//!
//! # Running
//!
//! ```bash
//! SHARD_LOW=db1:3306 SHARD_HIGH=db2:3306 MYSQL_USER=root MYSQL_PASSWORD=secret \
//!     cargo run --example routing -- 4242
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use mysql_client::{Config, Credentials};
use mysql_fabric::{
    AccessMode, DirectoryDump, MappingKind, Server, ServerGroup, ShardDirector, ShardMapping,
    StaticDirectory,
};

fn member(var: &str) -> Server {
    let addr = std::env::var(var).unwrap_or_else(|_| "localhost:3306".into());
    let (host, port) = addr.rsplit_once(':').expect("address must be host:port");
    Server::primary(host, port.parse().expect("invalid port"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let key = std::env::args().nth(1).unwrap_or_else(|| "1".into());
    let user = std::env::var("MYSQL_USER").unwrap_or_else(|_| "root".into());
    let password = std::env::var("MYSQL_PASSWORD").unwrap_or_default();

    let dump = DirectoryDump::new()
        .with_table("shop", "orders", 1)
        .with_mapping(
            ShardMapping::new(1, MappingKind::Range, "global")
                .with_shard("0", "low")?
                .with_shard("10000", "high")?,
        )
        .with_group(ServerGroup::new("global").with_server(member("SHARD_LOW")))
        .with_group(ServerGroup::new("low").with_server(member("SHARD_LOW")))
        .with_group(ServerGroup::new("high").with_server(member("SHARD_HIGH")));

    let base = Config::new()
        .database("shop")
        .credentials(Credentials::new(user, password));
    let director = ShardDirector::new(Arc::new(StaticDirectory::new(dump)), base);

    let (group, server) = director
        .lookup("shop", "orders", &key, AccessMode::ReadWrite)
        .await?;
    println!("key {key} lives in group {group} on {server}");

    let mut session = match director
        .connect("shop", "orders", &key, AccessMode::ReadWrite)
        .await
    {
        Ok(session) => session,
        Err(e) if e.is_communication_error() => {
            // one caller-driven retry with fresh directory data
            director.invalidate();
            director
                .connect("shop", "orders", &key, AccessMode::ReadWrite)
                .await?
        }
        Err(e) => return Err(e.into()),
    };

    let rows = session
        .query(&format!("SELECT COUNT(*) FROM orders WHERE customer_id = {key}"))
        .await?;
    let count: i64 = rows.rows()[0].get(0)?;
    println!("{count} orders");
    session.close().await?;
    Ok(())
}
