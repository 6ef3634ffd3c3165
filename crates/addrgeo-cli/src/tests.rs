use std::time::Duration;

use addrgeo_core::{AppConfig, Environment};

use super::*;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        geocode_api_key: Some("key".to_string()),
        geocode_base_url: "https://maps.example.com/geocode/json".to_string(),
        geocode_timeout_secs: 10,
        geocode_max_retries: 3,
        geocode_initial_backoff_ms: 1000,
        geocode_max_backoff_ms: 5000,
        db_max_connections: 4,
        db_min_connections: 1,
        db_acquire_timeout_secs: 10,
        batch_size: 100,
        request_delay_ms: 150,
    }
}

#[test]
fn parses_enrich_with_defaults() {
    let cli = Cli::try_parse_from(["addrgeo", "enrich"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Enrich {
            batch_size: None,
            delay_ms: None,
            dry_run: false
        }
    ));
}

#[test]
fn parses_enrich_overrides() {
    let cli = Cli::try_parse_from([
        "addrgeo",
        "enrich",
        "--batch-size",
        "25",
        "--delay-ms",
        "0",
        "--dry-run",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Enrich {
            batch_size: Some(25),
            delay_ms: Some(0),
            dry_run: true
        }
    ));
}

#[test]
fn rejects_non_numeric_batch_size() {
    let result = Cli::try_parse_from(["addrgeo", "enrich", "--batch-size", "many"]);
    assert!(result.is_err());
}

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["addrgeo", "db", "ping"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Db {
            command: DbCommands::Ping
        }
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["addrgeo", "db", "migrate"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Db {
            command: DbCommands::Migrate
        }
    ));
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["addrgeo"]).is_err());
}

#[test]
fn pipeline_config_uses_environment_values_by_default() {
    let config = enrich::pipeline_config(&app_config(), &enrich::EnrichArgs::default());
    assert_eq!(config.batch_size, 100);
    assert_eq!(config.request_delay, Duration::from_millis(150));
}

#[test]
fn pipeline_config_prefers_cli_flags() {
    let args = enrich::EnrichArgs {
        batch_size: Some(0),
        delay_ms: Some(20),
        dry_run: false,
    };
    let config = enrich::pipeline_config(&app_config(), &args);
    assert_eq!(config.batch_size, 1);
    assert_eq!(config.request_delay, Duration::from_millis(20));
}

#[test]
fn run_counts_copies_every_counter() {
    use addrgeo_enrich::{RecordOutcome, RunCounters};

    let mut counters = RunCounters::default();
    for outcome in [
        RecordOutcome::Inserted,
        RecordOutcome::Inserted,
        RecordOutcome::Skipped,
        RecordOutcome::Unresolved(addrgeo_geocode::Unresolved::NoResults),
    ] {
        counters.record_read();
        counters.tally(&outcome);
    }

    let counts = enrich::run_counts(&counters.summary());
    assert_eq!(
        counts,
        addrgeo_db::EnrichRunCounts {
            read: 4,
            inserted: 2,
            skipped: 1,
            api_failures: 1,
            storage_failures: 0,
        }
    );
}

#[test]
fn db_commands_run_without_geocode_api_key() {
    let config = AppConfig {
        geocode_api_key: None,
        ..app_config()
    };
    for args in [["addrgeo", "db", "ping"], ["addrgeo", "db", "migrate"]] {
        let cli = Cli::try_parse_from(args).expect("expected valid cli args");
        assert!(check_command_config(&cli.command, &config).is_ok());
    }
}

#[test]
fn enrich_requires_geocode_api_key() {
    let config = AppConfig {
        geocode_api_key: None,
        ..app_config()
    };
    let cli = Cli::try_parse_from(["addrgeo", "enrich"]).expect("expected valid cli args");
    let err = check_command_config(&cli.command, &config).unwrap_err();
    assert!(
        matches!(err, addrgeo_core::ConfigError::MissingEnvVar(ref v) if v == "GOOGLE_MAPS_API_KEY"),
        "expected MissingEnvVar(GOOGLE_MAPS_API_KEY), got: {err:?}"
    );
    assert!(check_command_config(&cli.command, &app_config()).is_ok());
}
