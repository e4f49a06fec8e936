//! Fatal records end the process, so the emitting side runs in a child
//! copy of this test binary.

use corrlog::{Logger, LoggingConfig, FATAL_EXIT_CODE};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::process::Command;
use tests::read_json_records;

/// Set in the child to the log file it should write
const CHILD_LOG_PATH: &str = "CORRLOG_FATAL_LOG_PATH";

const TEST_NAME: &str = "fatal::test_fatal_flushes_record_and_exits";

fn run_child(path: &Path) -> ! {
    let config = LoggingConfig::default()
        .with_format("json")
        .with_console(false)
        .with_file(path.to_string_lossy(), 10, 3);
    let logger = Logger::from_config("reaper", &config)
        .expect("child logger")
        .with_correlation_id("req-9")
        .with_field("pid", std::process::id());

    logger.info("shutting down");
    logger.fatal("unrecoverable state")
}

#[test]
fn test_fatal_flushes_record_and_exits() {
    if let Some(path) = std::env::var_os(CHILD_LOG_PATH) {
        run_child(Path::new(&path));
    }

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("fatal.log");

    let status = Command::new(std::env::current_exe().unwrap())
        .args([TEST_NAME, "--exact", "--test-threads=1"])
        .env(CHILD_LOG_PATH, &path)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(FATAL_EXIT_CODE));
    assert_eq!(FATAL_EXIT_CODE, 1);

    let records = read_json_records(&path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["level"], "info");

    let fatal = &records[1];
    assert_eq!(fatal["level"], "fatal");
    assert_eq!(fatal["msg"], "unrecoverable state");
    assert_eq!(fatal["component"], "reaper");
    assert_eq!(fatal["correlation_id"], "req-9");
    assert!(fatal["pid"].is_u64());
}
