//! Process-wide setup integration tests
//!
//! These reconfigure the shared default logger and run serially.

use corrlog::{
    default_logger, generate_correlation_id, log_with_correlation_id, setup_logging, setup_logging_simple,
    Context, Destination, DestinationKind, LogFormat, LogLevel, LoggingConfig,
};
use flate2::read::GzDecoder;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io::Read;
use tests::{read_json_records, CaptureWriter};
use tracing_subscriber::layer::SubscriberExt;

fn reset() {
    setup_logging(&LoggingConfig::default()).unwrap();
}

#[test]
#[serial]
fn test_default_logger_is_one_instance() {
    let first = default_logger();
    let second = default_logger();
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.component(), "app");
}

#[test]
#[serial]
fn test_setup_with_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("logs").join("a.log");

    let config = LoggingConfig {
        level: "debug".to_string(),
        format: "json".to_string(),
        console_enabled: false,
        file_enabled: true,
        file_path: path.to_string_lossy().into_owned(),
        max_file_size: 10,
        backup_count: 3,
        environment: None,
    };
    setup_logging(&config).unwrap();

    let id = generate_correlation_id();
    let ctx = Context::background().with_correlation_id(id.clone());
    log_with_correlation_id(Some(&ctx), LogLevel::Debug, "file scenario");
    default_logger().flush();

    assert!(path.exists());
    let records = read_json_records(&path);
    let record = records.last().unwrap();
    assert_eq!(record["msg"], "file scenario");
    assert_eq!(record["level"], "debug");
    assert_eq!(record["component"], "app");
    assert_eq!(record["correlation_id"], id.as_str());

    reset();
}

#[test]
#[serial]
fn test_invalid_level_falls_back_to_info() {
    setup_logging(&LoggingConfig::console_only("invalid")).unwrap();
    assert_eq!(default_logger().level(), LogLevel::Info);
    reset();
}

#[test]
#[serial]
fn test_both_destinations_disabled_keeps_console() {
    setup_logging(&LoggingConfig::default().with_console(false)).unwrap();

    let kinds: Vec<DestinationKind> = default_logger()
        .sink()
        .destinations()
        .iter()
        .map(|d| d.kind())
        .collect();
    assert_eq!(kinds, vec![DestinationKind::Console]);
    reset();
}

#[test]
#[serial]
fn test_failed_setup_keeps_previous_destinations() {
    setup_logging(&LoggingConfig::console_only("warn")).unwrap();

    let temp_dir = tempfile::tempdir().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();
    let bad = LoggingConfig::console_only("trace").with_file(blocker.join("x.log").to_string_lossy(), 10, 3);

    assert!(setup_logging(&bad).is_err());
    assert_eq!(default_logger().level(), LogLevel::Warn);
    reset();
}

#[test]
#[serial]
fn test_setup_simple() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("simple.log");

    setup_logging_simple(&path.to_string_lossy(), "warn").unwrap();

    let kinds: Vec<DestinationKind> = default_logger()
        .sink()
        .destinations()
        .iter()
        .map(|d| d.kind())
        .collect();
    assert_eq!(kinds, vec![DestinationKind::Console, DestinationKind::File]);
    assert_eq!(default_logger().level(), LogLevel::Warn);

    default_logger().info("filtered");
    default_logger().error("kept");
    default_logger().flush();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(!contents.contains("filtered"));
    assert!(contents.contains("msg=kept"));

    setup_logging_simple("", "debug").unwrap();
    assert_eq!(default_logger().sink().destinations().len(), 1);
    reset();
}

#[test]
#[serial]
fn test_tracing_events_reach_default_destinations() {
    reset();
    let capture = CaptureWriter::new();
    default_logger()
        .sink()
        .set_destinations(vec![Destination::writer(capture.clone(), LogFormat::Json)]);

    let subscriber = tracing_subscriber::registry().with(default_logger().tracing_layer());
    let ctx = Context::background().with_correlation_id("bridged");

    tracing::subscriber::with_default(subscriber, || {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(ctx.scope(async {
            tracing::warn!(target: "billing::invoices", invoice = "inv-7", "invoice overdue");
        }));
    });

    let records = capture.json_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["msg"], "invoice overdue");
    assert_eq!(records[0]["invoice"], "inv-7");
    assert_eq!(records[0]["component"], "app");
    assert_eq!(records[0]["correlation_id"], "bridged");
    reset();
}

#[test]
#[serial]
fn test_rotation_through_default_logger() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("rotating.log");

    setup_logging(
        &LoggingConfig::default()
            .with_format("json")
            .with_console(false)
            .with_file(path.to_string_lossy(), 1, 2),
    )
    .unwrap();

    let padding = "x".repeat(4096);
    for i in 0..600 {
        default_logger().with_field("seq", i).with_field("pad", padding.as_str()).info("bulk");
    }
    default_logger().flush();

    let mut backups: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.to_string_lossy().ends_with(".log.gz"))
        .collect();
    backups.sort();
    assert_eq!(backups.len(), 2);

    let mut decoded = String::new();
    GzDecoder::new(std::fs::File::open(&backups[1]).unwrap())
        .read_to_string(&mut decoded)
        .unwrap();
    let first: serde_json::Value = serde_json::from_str(decoded.lines().next().unwrap()).unwrap();
    assert_eq!(first["msg"], "bulk");

    assert!(std::fs::metadata(&path).unwrap().len() <= 1024 * 1024);
    reset();
}
