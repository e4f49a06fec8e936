//! Context integration tests
//!
//! Correlation IDs travelling through request contexts and async tasks.

use corrlog::{
    correlation_id_from_context, generate_correlation_id, with_correlation_id, Context, LogLevel,
    CORRELATION_ID_KEY,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use tests::capturing_logger;

#[test]
fn test_round_trip_on_any_base_context() {
    let bases = vec![
        Context::background(),
        Context::background().with_value("tenant", "acme".to_string()),
        Context::background().with_correlation_id("old"),
    ];

    for base in &bases {
        let ctx = with_correlation_id(Some(base), "X");
        assert_eq!(correlation_id_from_context(Some(&ctx)), "X");
    }

    assert_eq!(correlation_id_from_context(Some(&with_correlation_id(None, "Y"))), "Y");
}

#[test]
fn test_absent_ids_are_empty() {
    assert_eq!(correlation_id_from_context(None), "");
    assert_eq!(correlation_id_from_context(Some(&Context::background())), "");

    let wrong_type = Context::background().with_value(CORRELATION_ID_KEY, vec![1_u8, 2, 3]);
    assert_eq!(correlation_id_from_context(Some(&wrong_type)), "");
}

#[test]
fn test_generated_ids_are_uuid_shaped_and_distinct() {
    let ids: HashSet<String> = (0..1000).map(|_| generate_correlation_id()).collect();
    assert_eq!(ids.len(), 1000);

    for id in &ids {
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }
}

#[tokio::test]
async fn test_scoped_context_reaches_spawned_work() {
    let (logger, capture) = capturing_logger("worker", LogLevel::Info);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let logger = logger.clone();
            let ctx = Context::background().with_correlation_id(format!("req-{i}"));
            tokio::spawn(ctx.scope(async move {
                tokio::task::yield_now().await;
                let current = Context::current();
                logger.info_with_context(current.as_ref(), format!("handled {i}"));
            }))
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let records = capture.json_records();
    assert_eq!(records.len(), 4);
    for record in &records {
        let msg = record["msg"].as_str().unwrap();
        let i = msg.trim_start_matches("handled ");
        assert_eq!(record["correlation_id"], format!("req-{i}"));
    }
}
