//! Concurrent emission

use corrlog::{LogLevel, Logger, LoggerFactory, LoggingConfig};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use tests::{capturing_logger, read_json_records};

const TASKS: usize = 16;
const RECORDS_PER_TASK: usize = 200;

#[test]
fn test_threads_share_one_capture_without_corruption() {
    let (logger, capture) = capturing_logger("root", LogLevel::Info);

    let handles: Vec<_> = (0..TASKS)
        .map(|t| {
            let logger = Logger::with_sink(logger.sink().clone(), format!("component-{t}"));
            std::thread::spawn(move || {
                for i in 0..RECORDS_PER_TASK {
                    logger.with_field("seq", i).info("tick");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let records = capture.json_records();
    assert_eq!(records.len(), TASKS * RECORDS_PER_TASK);

    let mut per_component: HashMap<String, usize> = HashMap::new();
    for record in &records {
        *per_component
            .entry(record["component"].as_str().unwrap().to_string())
            .or_default() += 1;
    }
    assert_eq!(per_component.len(), TASKS);
    assert!(per_component.values().all(|&n| n == RECORDS_PER_TASK));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tasks_writing_to_one_rotating_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("concurrent.log");

    let factory = Arc::new(LoggerFactory::new(
        LoggingConfig::default()
            .with_format("json")
            .with_console(false)
            .with_file(path.to_string_lossy(), 10, 3),
    ));

    let handles: Vec<_> = (0..TASKS)
        .map(|t| {
            let factory = factory.clone();
            tokio::spawn(async move {
                let logger = factory.create_logger(&format!("task-{t}"));
                for i in 0..RECORDS_PER_TASK {
                    logger.with_field("seq", i).info("tick");
                    if i % 50 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
                logger.flush();
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let records = read_json_records(&path);
    assert_eq!(records.len(), TASKS * RECORDS_PER_TASK);
}
