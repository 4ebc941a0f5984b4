//! Structured JSON logging to stdout.
//!
//! The level is resolved once per run and fixed when the subscriber is
//! installed. Components log through `tracing` and inherit the fields of the
//! run span they execute in.

use tracing_subscriber::filter::LevelFilter;

use crate::error::StartStopError;

/// Parse a level name. Accepts the usual `tracing` names plus the legacy
/// `warning`, `fatal` and `panic` spellings older event payloads carry.
pub fn parse_level(raw: &str) -> Result<LevelFilter, StartStopError> {
    let normalized = raw.trim().to_ascii_lowercase();
    let name = match normalized.as_str() {
        "warning" => "warn",
        "fatal" | "panic" => "error",
        other => other,
    };
    name.parse::<LevelFilter>()
        .map_err(|_| StartStopError::InvalidLogLevel(raw.to_string()))
}

/// Pick the run's level: `--log-level`, then `--verbose`, then the event's
/// `loglevel`, then `info`. A non-empty event level must parse even when a
/// flag overrides it.
pub fn resolve_level(
    cli_level: Option<&str>,
    verbose: bool,
    event_level: &str,
) -> Result<LevelFilter, StartStopError> {
    let from_event = if event_level.is_empty() {
        None
    } else {
        Some(parse_level(event_level)?)
    };
    match cli_level {
        Some(level) => parse_level(level),
        None if verbose => Ok(LevelFilter::DEBUG),
        None => Ok(from_event.unwrap_or(LevelFilter::INFO)),
    }
}

/// Install the JSON subscriber. A subscriber that is already installed wins.
pub fn init(level: LevelFilter) {
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_writer(std::io::stdout)
        .with_max_level(level)
        .with_current_span(true)
        .with_span_list(false)
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("global tracing subscriber already set, keeping it");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_levels() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level("INFO").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level(" trace ").unwrap(), LevelFilter::TRACE);
    }

    #[test]
    fn parses_legacy_levels() {
        assert_eq!(parse_level("warning").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level("fatal").unwrap(), LevelFilter::ERROR);
        assert_eq!(parse_level("panic").unwrap(), LevelFilter::ERROR);
    }

    #[test]
    fn rejects_unknown_level() {
        let err = parse_level("chatty").unwrap_err();
        assert!(matches!(err, StartStopError::InvalidLogLevel(l) if l == "chatty"));
    }

    #[test]
    fn resolution_order() {
        assert_eq!(
            resolve_level(Some("error"), true, "debug").unwrap(),
            LevelFilter::ERROR
        );
        assert_eq!(resolve_level(None, true, "error").unwrap(), LevelFilter::DEBUG);
        assert_eq!(resolve_level(None, false, "warn").unwrap(), LevelFilter::WARN);
        assert_eq!(resolve_level(None, false, "").unwrap(), LevelFilter::INFO);
        assert!(resolve_level(None, false, "nope").is_err());
    }

    #[test]
    fn invalid_event_level_fails_even_when_overridden() {
        let err = resolve_level(None, true, "chatty").unwrap_err();
        assert!(matches!(err, StartStopError::InvalidLogLevel(l) if l == "chatty"));
        assert!(resolve_level(Some("info"), false, "chatty").is_err());
    }
}
