//! Log output formats understood by the `drpc` telemetry layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Shape of the events the telemetry subscriber writes to stderr.
///
/// Parsed case-insensitively from `--log-format`, `DRPC_LOG_FORMAT` or the
/// `log_format` key of a configuration file.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum LogFormat {
    /// Flattened JSON events, one per line.
    #[default]
    #[strum(serialize = "json")]
    Json,
    /// Terse text events for reading at a terminal.
    #[strum(serialize = "compact")]
    Compact,
}

impl LogFormat {
    /// Name accepted on the command line and in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Compact => "compact",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when text names no [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("COMPACT", LogFormat::Compact)]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: LogFormat) {
        assert_eq!(LogFormat::from_str(input).expect("parse format"), expected);
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(LogFormat::from_str("pretty").is_err());
    }

    #[rstest]
    #[case(LogFormat::Json)]
    #[case(LogFormat::Compact)]
    fn display_matches_the_accepted_name(#[case] format: LogFormat) {
        assert_eq!(format.to_string(), format.as_str());
        assert_eq!(LogFormat::from_str(format.as_str()).expect("parse name"), format);
    }
}
