use std::time::Duration;

use grove::parser::{self, DEFAULT_MAX_VERSIONS};
use grove::{CancellationFlag, ParseError, Parser, ParserConfig};
use pretty_assertions::assert_eq;

use crate::helpers::grammars;

#[test]
fn test_default_config() {
    let config = ParserConfig::default();
    assert_eq!(config.max_versions, DEFAULT_MAX_VERSIONS);
    assert!(config.max_operations.is_none());
    assert!(config.timeout.is_none());
    assert!(config.balance_repetitions);
}

fn statements_parser(config: ParserConfig) -> Parser {
    Parser::new(grammars::statements()).with_config(config)
}

#[test]
fn test_cancelled_before_start() {
    let flag = CancellationFlag::new();
    flag.cancel();
    let parser = statements_parser(ParserConfig::new().with_cancellation(flag));
    assert_eq!(parser.parse("aa;", None).unwrap_err(), ParseError::Cancelled);
}

#[test]
fn test_cancelled_from_another_thread() {
    let text = grammars::statements_text(200_000);
    let flag = CancellationFlag::new();
    let parser = statements_parser(ParserConfig::new().with_cancellation(flag.clone()));

    let result = std::thread::scope(|scope| {
        let handle = scope.spawn(|| parser.parse(&text, None));
        flag.cancel();
        handle.join().unwrap()
    });
    // The parse may finish before the flag is seen; it must not fail otherwise
    if let Err(err) = result {
        assert_eq!(err, ParseError::Cancelled);
    }
}

#[test]
fn test_operation_limit() {
    let parser = statements_parser(ParserConfig::new().with_operation_limit(10));
    let err = parser.parse(&grammars::statements_text(100), None).unwrap_err();
    assert_eq!(err, ParseError::OperationLimit { limit: 10 });
    assert_eq!(err.to_string(), "parse exceeded the limit of 10 operations");
}

#[test]
fn test_generous_limit_succeeds() {
    let config = ParserConfig::new()
        .with_operation_limit(1_000_000)
        .with_timeout(Duration::from_secs(60));
    let parser = statements_parser(config);
    let tree = parser.parse(&grammars::statements_text(100), None).unwrap();
    assert!(!tree.has_error());
}

#[test]
fn test_timeout() {
    let parser = statements_parser(ParserConfig::new().with_timeout(Duration::ZERO));
    assert!(matches!(
        parser.parse("aa;", None),
        Err(ParseError::Timeout { limit }) if limit == Duration::ZERO
    ));
}

#[test]
fn test_single_version_still_recovers() {
    let parser = statements_parser(ParserConfig::new().with_max_versions(1));
    let tree = parser.parse("aa bb; %", None).unwrap();
    assert!(tree.has_error());
    assert_eq!(tree.root_node().end_byte(), 8);
}

#[test]
fn test_parser_accessors() {
    let language = grammars::statements();
    let parser =
        Parser::new(language.clone()).with_config(ParserConfig::new().with_max_versions(3));
    assert!(parser.language().ptr_eq(&language));
    assert_eq!(parser.config().max_versions, 3);
    let tree = parser.parse("aa;", None).unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        parser::parse(&language, "aa;", None).root_node().to_sexp()
    );
}
