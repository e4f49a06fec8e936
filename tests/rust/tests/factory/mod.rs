//! Logger factory integration tests

use corrlog::{
    global_factory, get_logger, DestinationKind, LogFormat, LogLevel, LoggerFactory, LoggingConfig,
};
use pretty_assertions::assert_eq;
use serial_test::serial;
use tests::read_json_records;

#[test]
fn test_factory_loggers_share_one_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("shared.log");

    let factory = LoggerFactory::new(
        LoggingConfig::default()
            .with_level("debug")
            .with_format("json")
            .with_console(false)
            .with_file(path.to_string_lossy(), 10, 3),
    );

    let orders = factory.create_logger("orders");
    let payments = factory.create_logger("payments");
    orders.debug("order created");
    payments.info("payment captured");
    orders.flush();
    payments.flush();

    let records = read_json_records(&path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["component"], "orders");
    assert_eq!(records[0]["level"], "debug");
    assert_eq!(records[1]["component"], "payments");
}

#[test]
fn test_reconfigure_only_affects_new_loggers() {
    let factory = LoggerFactory::new(LoggingConfig::console_only("error"));
    let before = factory.create_logger("before");

    factory.configure(LoggingConfig::console_only("debug"));
    let after = factory.create_logger("after");

    assert_eq!(before.level(), LogLevel::Error);
    assert_eq!(after.level(), LogLevel::Debug);

    factory.configure(None);
    assert_eq!(factory.config().level, "debug");
}

#[test]
fn test_no_destination_means_discard() {
    let factory = LoggerFactory::new(LoggingConfig::default().with_console(false));
    let logger = factory.try_create_logger("quiet").unwrap();

    let kinds: Vec<DestinationKind> = logger.sink().destinations().iter().map(|d| d.kind()).collect();
    assert_eq!(kinds, vec![DestinationKind::Discard]);
    logger.error("goes nowhere");
}

#[test]
fn test_format_selection() {
    let json = LoggerFactory::new(LoggingConfig::default().with_format("JSON"))
        .create_logger("json");
    let text = LoggerFactory::new(LoggingConfig::default().with_format("logfmt"))
        .create_logger("text");

    assert_eq!(json.sink().destinations()[0].format(), LogFormat::Json);
    assert_eq!(text.sink().destinations()[0].format(), LogFormat::Text);
}

#[test]
fn test_unopenable_file_degrades_to_remaining_destinations() {
    let temp_dir = tempfile::tempdir().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    let path = blocker.join("app.log");

    let factory = LoggerFactory::new(LoggingConfig::default().with_file(path.to_string_lossy(), 10, 3));

    assert!(factory.try_create_logger("broken").is_err());

    let logger = factory.create_logger("broken");
    let kinds: Vec<DestinationKind> = logger.sink().destinations().iter().map(|d| d.kind()).collect();
    assert_eq!(kinds, vec![DestinationKind::Console]);
}

#[test]
#[serial]
fn test_get_logger_uses_global_factory() {
    global_factory().configure(LoggingConfig::console_only("warn"));

    let logger = get_logger("orders");
    assert_eq!(logger.component(), "orders");
    assert_eq!(logger.level(), LogLevel::Warn);

    global_factory().configure(LoggingConfig::default());
}
