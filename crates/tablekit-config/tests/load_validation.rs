//! Config loading and validation tests for tablekit-config.
// crates/tablekit-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load and Validation Tests
// Description: Validate file limits, parsing, defaults, and range checks.
// Purpose: Ensure configuration fails closed on malformed or oversized input.
// =============================================================================

#![allow(clippy::use_debug, reason = "Test failure messages include debug output.")]

use std::fs;
use std::path::PathBuf;

use tablekit_config::ConfigError;
use tablekit_config::MAX_CONFIG_FILE_SIZE;
use tablekit_config::TablekitConfig;
use tablekit_core::DEFAULT_MAX_FILTERS;
use tablekit_core::Dialect;
use tablekit_store_sqlite::SqliteStoreMode;
use tablekit_store_sqlite::SqliteTransactionBehavior;
use tempfile::TempDir;

type TestResult = Result<(), String>;

/// Writes `contents` to a config file in `dir` and loads it.
fn load_from(dir: &TempDir, contents: &[u8]) -> Result<TablekitConfig, ConfigError> {
    let path = dir.path().join("tablekit.toml");
    fs::write(&path, contents).map_err(|err| ConfigError::Io(err.to_string()))?;
    TablekitConfig::load(Some(&path))
}

/// Asserts that `result` is an error whose message contains `needle`.
fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn empty_file_applies_defaults() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let config = load_from(&dir, b"").map_err(|err| err.to_string())?;
    if config != TablekitConfig::default() {
        return Err(format!("unexpected defaults: {config:?}"));
    }
    if config.query.max_filters != DEFAULT_MAX_FILTERS || config.query.dialect != Dialect::Positional {
        return Err("query defaults not applied".to_string());
    }
    if config.store.transaction_behavior != SqliteTransactionBehavior::Immediate {
        return Err("store should begin immediate transactions by default".to_string());
    }
    Ok(())
}

#[test]
fn full_file_is_parsed() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let toml = br#"
[store]
path = "data/cluster.db"
busy_timeout_ms = 250
journal_mode = "delete"
statement_cache_capacity = 16
transaction_behavior = "exclusive"

[query]
dialect = "numbered"
max_filters = 32
"#;
    let config = load_from(&dir, toml).map_err(|err| err.to_string())?;
    if config.store.path != PathBuf::from("data/cluster.db")
        || config.store.busy_timeout_ms != 250
        || config.store.journal_mode != SqliteStoreMode::Delete
        || config.store.statement_cache_capacity != 16
        || config.store.transaction_behavior != SqliteTransactionBehavior::Exclusive
    {
        return Err(format!("store section not applied: {:?}", config.store));
    }
    if config.query.dialect != Dialect::Numbered || config.compile_options().max_filters != 32 {
        return Err(format!("query section not applied: {:?}", config.query));
    }
    Ok(())
}

#[test]
fn max_filters_must_be_in_range() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    assert_invalid(load_from(&dir, b"[query]\nmax_filters = 0\n"), "query.max_filters out of range: 0")?;
    assert_invalid(load_from(&dir, b"[query]\nmax_filters = 4097\n"), "query.max_filters out of range: 4097")?;
    load_from(&dir, b"[query]\nmax_filters = 4096\n").map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn store_limits_are_validated() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    assert_invalid(
        load_from(&dir, b"[store]\npath = \"a.db\"\nstatement_cache_capacity = 0\n"),
        "statement_cache_capacity out of range",
    )?;
    assert_invalid(load_from(&dir, b"[store]\npath = \"\"\n"), "invalid config: store:")?;
    Ok(())
}

#[test]
fn unknown_keys_and_values_fail_to_parse() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    assert_invalid(load_from(&dir, b"[query]\nlimit = 4\n"), "config parse error")?;
    assert_invalid(load_from(&dir, b"[query]\ndialect = \"dollar\"\n"), "config parse error")?;
    assert_invalid(load_from(&dir, b"[cache]\nsize = 1\n"), "config parse error")?;
    Ok(())
}

#[test]
fn oversized_file_is_rejected() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let mut contents = b"# padding\n".to_vec();
    contents.resize(MAX_CONFIG_FILE_SIZE + 1, b' ');
    assert_invalid(load_from(&dir, &contents), "config file exceeds size limit")
}

#[test]
fn non_utf8_file_is_rejected() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    assert_invalid(load_from(&dir, &[0x5b, 0xff, 0xfe, 0x5d]), "config file must be utf-8")
}

#[test]
fn missing_file_is_io_error() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let missing = dir.path().join("absent.toml");
    match TablekitConfig::load(Some(&missing)) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {other:?}")),
    }
}
