mod common;

use std::sync::Arc;
use std::time::Duration;

use disco_client::{ClientError, DiscoveryClient, FetchError};
use pretty_assertions::assert_eq;
use tokio::task::JoinSet;

fn ids(services: &[disco_core::ir::ServiceDescriptor]) -> Vec<&str> {
    services.iter().map(|s| s.id.as_str()).collect()
}

#[tokio::test]
async fn preferred_services_are_filtered_and_sorted() {
    let server = common::spawn().await;
    let client = DiscoveryClient::new(&server.config()).unwrap();

    let preferred = client.list_preferred_services().await.unwrap();
    assert_eq!(ids(&preferred), vec!["sheets:v4"]);
    assert_eq!(preferred[0].title, "Google Sheets API");

    let all = client.list_services().await.unwrap();
    assert_eq!(ids(&all), vec!["drive:v3", "sheets:v3", "sheets:v4"]);
    assert_eq!(server.directory_hits(), 1);
}

#[tokio::test]
async fn duplicate_directory_ids_keep_first_entry() {
    let server = common::spawn().await;
    server.duplicate_directory();
    let client = DiscoveryClient::new(&server.config()).unwrap();

    let preferred = client.list_preferred_services().await.unwrap();
    assert_eq!(ids(&preferred), vec!["sheets:v4"]);
    assert_eq!(preferred[0].title, "Google Sheets API");

    let all = client.list_services().await.unwrap();
    assert_eq!(ids(&all), vec!["drive:v3", "sheets:v3", "sheets:v4"]);
    assert_eq!(
        client.discovery_url("sheets:v4").await.unwrap(),
        format!("{}/specs/sheets", server.base_url)
    );
}

#[tokio::test]
async fn concurrent_reads_share_one_fetch() {
    let server = common::spawn().await;
    let client = Arc::new(DiscoveryClient::new(&server.config()).unwrap());

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let client = Arc::clone(&client);
        tasks.spawn(async move { client.list_services().await.map(|s| s.len()) });
    }
    while let Some(joined) = tasks.join_next().await {
        assert_eq!(joined.unwrap().unwrap(), 3);
    }

    assert_eq!(server.directory_hits(), 1);
}

#[tokio::test]
async fn expired_snapshot_is_refetched() {
    let server = common::spawn().await;
    let client = DiscoveryClient::new(&server.config())
        .unwrap()
        .with_ttl(Duration::ZERO);

    client.list_services().await.unwrap();
    client.list_services().await.unwrap();
    assert_eq!(server.directory_hits(), 2);
}

#[tokio::test]
async fn failed_refresh_does_not_serve_stale_snapshot() {
    let server = common::spawn().await;
    let client = DiscoveryClient::new(&server.config())
        .unwrap()
        .with_ttl(Duration::ZERO);

    assert_eq!(client.list_services().await.unwrap().len(), 3);

    server.fail_directory();
    let err = client.list_services().await.unwrap_err();
    assert!(
        matches!(
            err,
            ClientError::CatalogFetch(FetchError::Status { status: 500, .. })
        ),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn unknown_service_is_a_spec_fetch_error() {
    let server = common::spawn().await;
    let client = DiscoveryClient::new(&server.config()).unwrap();

    let err = client.specification("nope:v1").await.unwrap_err();
    match err {
        ClientError::SpecFetch {
            service_id,
            source: FetchError::UnknownService(_),
        } => assert_eq!(service_id, "nope:v1"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.spec_hits(), 0);
}

#[tokio::test]
async fn missing_document_reports_status() {
    let server = common::spawn().await;
    let client = DiscoveryClient::new(&server.config()).unwrap();

    let err = client.specification("sheets:v3").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::SpecFetch {
            source: FetchError::Status { status: 404, .. },
            ..
        }
    ));
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn specification_is_fetched_once_until_cleared() {
    let server = common::spawn().await;
    let client = DiscoveryClient::new(&server.config()).unwrap();

    let first = client.specification("sheets:v4").await.unwrap();
    let second = client.specification("sheets:v4").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.base_url(), format!("{}/", server.base_url));
    assert_eq!(server.spec_hits(), 1);

    client.clear_cache().await;
    let third = client.specification("sheets:v4").await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(server.spec_hits(), 2);
    assert_eq!(server.directory_hits(), 2);
}

#[tokio::test]
async fn methods_are_listed_and_looked_up() {
    let server = common::spawn().await;
    let client = DiscoveryClient::new(&server.config()).unwrap();

    let names: Vec<String> = client
        .methods("sheets:v4")
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.full_name)
        .collect();
    assert_eq!(
        names,
        vec![
            "spreadsheets.get",
            "spreadsheets.values.clear",
            "spreadsheets.values.get",
            "spreadsheets.values.update",
        ]
    );

    let update = client
        .method("sheets:v4", "spreadsheets.values.update")
        .await
        .unwrap();
    assert_eq!(update.id, "sheets.spreadsheets.values.update");

    let err = client
        .method("sheets:v4", "spreadsheets.values.append")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MethodNotFound { .. }));
    assert_eq!(server.spec_hits(), 1);
}
