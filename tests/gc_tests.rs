mod common;

use common::{Call, FakeEngine};
use distro_build::container::collect_garbage;

#[tokio::test]
async fn test_empty_listings_issue_no_removal() {
    let engine = FakeEngine::new();
    let report = collect_garbage(&engine).await.unwrap();

    assert!(report.containers.is_empty());
    assert!(report.images.is_empty());
    assert!(engine.executed().is_empty());
    assert_eq!(engine.calls().len(), 2);
    assert!(
        engine
            .calls()
            .iter()
            .all(|call| matches!(call, Call::Capture(_)))
    );
}

#[tokio::test]
async fn test_each_non_empty_set_is_removed_in_one_call() {
    let engine = FakeEngine::new()
        .with_capture("ps", "c1\nc2\n\nc3\n")
        .with_capture("images", "i1\n");
    let report = collect_garbage(&engine).await.unwrap();

    assert_eq!(report.containers, vec!["c1", "c2", "c3"]);
    assert_eq!(report.images, vec!["i1"]);
    assert_eq!(
        engine.executed(),
        vec![
            vec!["rm", "c1", "c2", "c3"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>(),
            vec!["rmi".to_string(), "i1".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_listing_queries_use_status_and_dangling_filters() {
    let engine = FakeEngine::new();
    collect_garbage(&engine).await.unwrap();
    let calls = engine.calls();
    assert_eq!(calls[0].args(), ["ps", "-a", "-q", "-f", "status=exited"]);
    assert_eq!(calls[1].args(), ["images", "-q", "-f", "dangling=true"]);
}
