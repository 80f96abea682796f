//! Shard director tests against mock servers.
//!
//! Each group member is a separate mock server, so a test can check which
//! member a session actually reached.

use std::sync::Arc;

use mysql_client::Config;
use mysql_fabric::{
    AccessMode, DirectoryDump, MappingKind, Server, ServerGroup, ServerMode, ServerStatus,
    ShardDirector, ShardError, ShardMapping, StaticDirectory,
};
use mysql_testing::{MockMySqlServer, MockResponse};

async fn member(name: &str) -> MockMySqlServer {
    MockMySqlServer::builder()
        .with_response("SELECT @@hostname", MockResponse::scalar("@@hostname", name))
        .build()
        .await
        .expect("mock server should start")
}

fn base_config() -> Config {
    Config::from_connection_string("User=root;Password=;Database=shop").unwrap()
}

fn dump(global: &MockMySqlServer, low: &MockMySqlServer, high: &[&MockMySqlServer]) -> DirectoryDump {
    let high_group = high.iter().fold(ServerGroup::new("high"), |group, server| {
        group.with_server(Server::secondary(server.host(), server.port()))
    });
    DirectoryDump::new()
        .with_table("shop", "orders", 1)
        .with_mapping(
            ShardMapping::new(1, MappingKind::Range, "global")
                .with_shard("0", "low")
                .unwrap()
                .with_shard("1000", "high")
                .unwrap(),
        )
        .with_group(
            ServerGroup::new("global").with_server(Server::primary(global.host(), global.port())),
        )
        .with_group(ServerGroup::new("low").with_server(Server::primary(low.host(), low.port())))
        .with_group(high_group)
}

async fn hostname(session: &mut mysql_client::Session) -> String {
    let rows = session.query("SELECT @@hostname").await.unwrap();
    rows.rows()[0].get::<String>(0).unwrap()
}

#[tokio::test]
async fn test_connect_routes_by_key() {
    let global = member("global").await;
    let low = member("low").await;
    let high_primary = member("high-primary").await;
    let high_replica = member("high-replica").await;

    let routing = dump(&global, &low, &[]).with_group(
        ServerGroup::new("high")
            .with_server(Server::secondary(high_replica.host(), high_replica.port()))
            .with_server(Server::primary(high_primary.host(), high_primary.port())),
    );
    let director = ShardDirector::new(Arc::new(StaticDirectory::new(routing)), base_config());

    let mut session = director
        .connect("shop", "orders", "42", AccessMode::ReadWrite)
        .await
        .unwrap();
    assert_eq!(hostname(&mut session).await, "low");
    assert_eq!(session.database(), Some("shop"));

    let mut session = director
        .connect("shop", "orders", "5000", AccessMode::ReadWrite)
        .await
        .unwrap();
    assert_eq!(hostname(&mut session).await, "high-primary");

    let mut session = director
        .connect("shop", "orders", "5000", AccessMode::ReadOnly)
        .await
        .unwrap();
    assert_eq!(hostname(&mut session).await, "high-replica");

    let mut session = director
        .connect_global("shop", "orders", AccessMode::ReadWrite)
        .await
        .unwrap();
    assert_eq!(hostname(&mut session).await, "global");

    assert_eq!(global.queries().await.len(), 1);
    assert_eq!(low.queries().await.len(), 1);
}

#[tokio::test]
async fn test_group_without_writer_is_reported() {
    let global = member("global").await;
    let low = member("low").await;
    let replica = member("replica").await;

    let director = ShardDirector::new(
        Arc::new(StaticDirectory::new(dump(&global, &low, &[&replica]))),
        base_config(),
    );

    let err = director
        .connect("shop", "orders", "2000", AccessMode::ReadWrite)
        .await
        .unwrap_err();
    assert!(matches!(&err, ShardError::NoReadWriteServer { group } if group == "high"));
    assert!(replica.queries().await.is_empty());
}

#[tokio::test]
async fn test_unreachable_member_then_failover() {
    let global = member("global").await;
    let low = member("low").await;
    let promoted = member("promoted").await;

    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_port = unused.local_addr().unwrap().port();
    drop(unused);

    let failing = dump(&global, &low, &[]).with_group(
        ServerGroup::new("high")
            .with_server(Server::primary("127.0.0.1", dead_port))
            .with_server(Server::secondary(promoted.host(), promoted.port())),
    );
    let directory = Arc::new(StaticDirectory::new(failing));
    let director = ShardDirector::new(directory.clone(), base_config());

    let err = director
        .connect("shop", "orders", "1000", AccessMode::ReadWrite)
        .await
        .unwrap_err();
    assert!(
        matches!(&err, ShardError::Connect { group, port, .. } if group == "high" && *port == dead_port),
        "unexpected error: {err:?}"
    );
    assert!(err.is_communication_error());
    assert!(!err.is_directory_error());

    // The directory demotes the dead primary; the caller invalidates and retries.
    directory.replace(dump(&global, &low, &[]).with_group(
        ServerGroup::new("high")
            .with_server(Server::new(
                "127.0.0.1",
                dead_port,
                ServerMode::ReadWrite,
                ServerStatus::Faulty,
            ))
            .with_server(Server::primary(promoted.host(), promoted.port())),
    ));
    director.invalidate();

    let mut session = director
        .connect("shop", "orders", "1000", AccessMode::ReadWrite)
        .await
        .unwrap();
    assert_eq!(hostname(&mut session).await, "promoted");
}

#[tokio::test]
async fn test_unknown_table() {
    let global = member("global").await;
    let low = member("low").await;
    let director = ShardDirector::new(
        Arc::new(StaticDirectory::new(dump(&global, &low, &[]))),
        base_config(),
    );

    let err = director
        .connect("shop", "customers", "1", AccessMode::ReadWrite)
        .await
        .unwrap_err();
    assert!(matches!(err, ShardError::UnknownTable { .. }));
}
