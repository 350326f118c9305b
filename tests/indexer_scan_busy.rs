use std::sync::Arc;

use media_server::error::AppError;
use media_server::indexer::Indexer;
use media_server::protocol_client::ProtocolClientCache;
use media_server::store::sources::NewSource;
use media_server::store::Store;
use media_server::store::models::ProtocolKind;

#[tokio::test]
async fn second_concurrent_scan_is_rejected_as_busy() {
    let store = Store::connect_in_memory().await.unwrap();
    let media_dir = tempfile::tempdir().unwrap();

    // Enough files that the background scan task has a real window to be
    // "in progress" when the second `scan` call races it.
    for i in 0..500 {
        tokio::fs::write(
            media_dir.path().join(format!("Movie.{i}.2020.mp4")),
            b"not-really-a-video",
        )
        .await
        .unwrap();
    }

    let source = store
        .create_source(NewSource {
            display_name: "Movies".to_string(),
            protocol_kind: ProtocolKind::Local,
            host: None,
            port: None,
            username: None,
            encrypted_credential: None,
            base_path: Some(media_dir.path().to_string_lossy().to_string()),
            domain: None,
        })
        .await
        .unwrap();

    let indexer = Arc::new(Indexer::new(
        store.clone(),
        Arc::new(ProtocolClientCache::new()),
        vec!["mp4".to_string()],
        "test-secret".to_string(),
        false,
        None,
    ));

    let (first, second) = tokio::join!(
        indexer.scan(source.clone()),
        indexer.scan(source.clone()),
    );

    let outcomes = [first, second];
    let busy_count = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::ScanBusy)))
        .count();
    let ok_count = outcomes.iter().filter(|r| r.is_ok()).count();

    assert_eq!(busy_count, 1, "exactly one concurrent scan should be rejected");
    assert_eq!(ok_count, 1, "exactly one concurrent scan should be accepted");
}
