#![cfg(test)]

use super::*;

#[test]
fn parses_gguf_dump_with_output() {
    let config = CliConfig::try_parse_from(["tensor-trace", "gguf-dump", "model.gguf", "--output", "layout.csv"]).expect("valid args");
    assert_eq!(config.command, Command::GgufDump { model: "model.gguf".into(), output: Some("layout.csv".into()) });
    assert_eq!(config.verbose, 0);
}

#[test]
fn parses_decode_with_count_and_verbosity() {
    let config = CliConfig::try_parse_from(["tensor-trace", "decode", "trace.bin", "-n", "10", "-vv"]).expect("valid args");
    assert_eq!(config.command, Command::Decode { trace: "trace.bin".into(), count: Some(10), output: None });
    assert_eq!(config.verbose, 2);
}

#[test]
fn missing_subcommand_is_rejected() {
    assert!(CliConfig::try_parse_from(["tensor-trace"]).is_err());
}

#[test]
fn verbosity_overrides_environment_level() {
    let quiet = CliConfig::try_parse_from(["tensor-trace", "decode", "t.bin"]).expect("valid args");
    assert_eq!(quiet.log_directive(None), "info");
    assert_eq!(quiet.log_directive(Some(Level::WARN)), "warn");

    let loud = CliConfig::try_parse_from(["tensor-trace", "-v", "decode", "t.bin"]).expect("valid args");
    assert_eq!(loud.log_directive(Some(Level::WARN)), "debug");
}
