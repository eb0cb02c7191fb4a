//! Resolver facade tests against mocked registries

mod helper;

use mockito::Server;

use helper::{
    MALFORMED_REPOSITORY, REACT, create_test_resolver, mock_json, mock_lodash, mock_newtonsoft,
};
use purl_meta::{Coordinate, ErrorKind};

fn coordinate(purl: &str) -> Coordinate {
    purl.parse().unwrap()
}

#[tokio::test]
async fn lodash_versions_are_newest_first() {
    let mut server = Server::new_async().await;
    let mock = mock_lodash(&mut server, 1).await;
    let resolver = create_test_resolver(&server);

    let versions = resolver.versions(&coordinate("pkg:npm/lodash")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(versions, vec!["4.17.21", "4.17.15"]);
}

#[tokio::test]
async fn lodash_resolves_requested_version_with_latest() {
    let mut server = Server::new_async().await;
    let _mock = mock_lodash(&mut server, 1).await;
    let resolver = create_test_resolver(&server);

    let metadata = resolver
        .resolve(&coordinate("pkg:npm/lodash@4.17.15"))
        .await
        .unwrap();

    assert_eq!(metadata.version, "4.17.15");
    assert_eq!(metadata.latest_version.as_deref(), Some("4.17.21"));
    let repository = metadata.source_repository.unwrap();
    assert_eq!(repository.coordinate.to_string(), "pkg:github/lodash/lodash");
    assert_eq!(repository.confidence, 1.0);
}

#[tokio::test]
async fn repeated_resolution_fetches_each_document_once() {
    let mut server = Server::new_async().await;
    let mock = mock_lodash(&mut server, 1).await;
    let resolver = create_test_resolver(&server);
    let lodash = coordinate("pkg:npm/lodash@4.17.15");

    let first = resolver.resolve(&lodash).await.unwrap();
    let second = resolver.resolve(&lodash).await.unwrap();

    mock.assert_async().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn disabled_cache_refetches_documents() {
    let mut server = Server::new_async().await;
    let mock = mock_lodash(&mut server, 2).await;
    let resolver = create_test_resolver(&server).with_use_cache(false);
    let lodash = coordinate("pkg:npm/lodash@4.17.15");

    resolver.resolve(&lodash).await.unwrap();
    resolver.resolve(&lodash).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn versionless_resolution_uses_declared_latest() {
    let mut server = Server::new_async().await;
    let mock = mock_json(&mut server, "/react", REACT, 1).await;
    let resolver = create_test_resolver(&server);
    let react = coordinate("pkg:npm/react");

    let versions = resolver.versions(&react).await.unwrap();
    let metadata = resolver.resolve(&react).await.unwrap();

    mock.assert_async().await;
    assert_eq!(versions, vec!["19.0.0-rc.1", "18.3.1"]);
    assert_eq!(metadata.version, "18.3.1");
    assert_eq!(metadata.latest_version.as_deref(), Some("18.3.1"));
}

#[tokio::test]
async fn versionless_resolution_without_declared_latest_uses_first_enumerated_version() {
    let mut server = Server::new_async().await;
    let _mock = mock_json(
        &mut server,
        "/tiny",
        r#"{"versions": {"1.0.0": {}, "1.1.0": {}, "0.9.0": {}}}"#,
        1,
    )
    .await;
    let resolver = create_test_resolver(&server);
    let tiny = coordinate("pkg:npm/tiny");

    let versions = resolver.versions(&tiny).await.unwrap();
    let metadata = resolver.resolve(&tiny).await.unwrap();

    assert_eq!(metadata.version, versions[0]);
    assert_eq!(metadata.version, "1.1.0");
}

#[tokio::test]
async fn nuget_versionless_resolution_reads_latest_entry() {
    let mut server = Server::new_async().await;
    let mocks = mock_newtonsoft(&mut server).await;
    let resolver = create_test_resolver(&server);

    let metadata = resolver
        .resolve(&coordinate("pkg:nuget/Newtonsoft.Json"))
        .await
        .unwrap();

    for mock in mocks {
        mock.assert_async().await;
    }
    assert_eq!(metadata.version, "13.0.3");
    assert_eq!(metadata.latest_version.as_deref(), Some("13.0.3"));
    assert_eq!(
        metadata.description.as_deref(),
        Some("Json.NET is a popular high-performance JSON framework for .NET")
    );
    assert_eq!(
        metadata.source_repository.unwrap().coordinate.to_string(),
        "pkg:github/jamesnk/newtonsoft.json"
    );
}

#[tokio::test]
async fn malformed_repository_resolves_without_candidate() {
    let mut server = Server::new_async().await;
    let _mock = mock_json(&mut server, "/left-pad", MALFORMED_REPOSITORY, 1).await;
    let resolver = create_test_resolver(&server);

    let metadata = resolver
        .resolve(&coordinate("pkg:npm/left-pad"))
        .await
        .unwrap();

    assert_eq!(metadata.version, "1.3.0");
    assert_eq!(metadata.source_repository, None);
}

#[tokio::test]
async fn unknown_package_is_not_found() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/does-not-exist")
        .with_status(404)
        .create_async()
        .await;
    let resolver = create_test_resolver(&server);

    let error = resolver
        .resolve(&coordinate("pkg:npm/does-not-exist"))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert!(!error.is_retryable());
    assert_eq!(error.coordinate(), "pkg:npm/does-not-exist");
}

#[tokio::test]
async fn server_error_is_retryable_transport_failure() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/lodash")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;
    let resolver = create_test_resolver(&server);
    let lodash = coordinate("pkg:npm/lodash@4.17.15");

    let first = resolver.resolve(&lodash).await.unwrap_err();
    let second = resolver.resolve(&lodash).await.unwrap_err();

    mock.assert_async().await;
    assert_eq!(first.kind(), ErrorKind::Transport);
    assert!(second.is_retryable());
}

#[tokio::test]
async fn unsupported_ecosystem_is_reported() {
    let server = Server::new_async().await;
    let resolver = create_test_resolver(&server);

    let error = resolver
        .resolve(&coordinate("pkg:cargo/serde@1.0.0"))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::UnsupportedEcosystem);
}

#[tokio::test]
async fn resolve_all_resolves_across_ecosystems() {
    let mut server = Server::new_async().await;
    let _lodash = mock_lodash(&mut server, 1).await;
    let _newtonsoft = mock_newtonsoft(&mut server).await;
    let resolver = create_test_resolver(&server);

    let results = resolver
        .resolve_all(&[
            coordinate("pkg:npm/lodash@4.17.21"),
            coordinate("pkg:nuget/Newtonsoft.Json@12.0.3"),
        ])
        .await;

    assert_eq!(results[0].as_ref().unwrap().version, "4.17.21");
    assert_eq!(results[1].as_ref().unwrap().version, "12.0.3");
}
