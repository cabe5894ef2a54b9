//! CLI argument parsing tests.

use clap::Parser;
use podwarden_daemon::cli::DaemonCli;

#[test]
fn defaults_when_no_args() {
    // Given: No arguments
    let cli = DaemonCli::try_parse_from(["podwarden-daemon"]).expect("parse");

    // Then: Defaults apply
    assert_eq!(
        cli.config.to_str().expect("utf8 path"),
        "/etc/podwarden/podwarden.toml"
    );
    assert!(cli.log_level.is_none());
    assert!(cli.log_format.is_none());
    assert!(cli.port.is_none());
    assert!(!cli.validate);
}

#[test]
fn config_path_short_and_long() {
    let cli = DaemonCli::try_parse_from(["podwarden-daemon", "-c", "/tmp/p.toml"]).expect("parse");
    assert_eq!(cli.config.to_str().expect("utf8 path"), "/tmp/p.toml");

    let cli = DaemonCli::try_parse_from(["podwarden-daemon", "--config", "/tmp/q.toml"])
        .expect("parse");
    assert_eq!(cli.config.to_str().expect("utf8 path"), "/tmp/q.toml");
}

#[test]
fn overrides_parse() {
    let cli = DaemonCli::try_parse_from([
        "podwarden-daemon",
        "--log-level",
        "debug",
        "--log-format",
        "pretty",
        "--port",
        "8080",
    ])
    .expect("parse");

    assert_eq!(cli.log_level.as_deref(), Some("debug"));
    assert_eq!(cli.log_format.as_deref(), Some("pretty"));
    assert_eq!(cli.port, Some(8080));
}

#[test]
fn validate_flag_parses() {
    let cli = DaemonCli::try_parse_from(["podwarden-daemon", "--validate"]).expect("parse");
    assert!(cli.validate);
}

#[test]
fn rejects_invalid_port() {
    let result = DaemonCli::try_parse_from(["podwarden-daemon", "--port", "not-a-port"]);
    assert!(result.is_err());
}

#[test]
fn rejects_unknown_flag() {
    let result = DaemonCli::try_parse_from(["podwarden-daemon", "--unknown-flag"]);
    assert!(result.is_err());
}
