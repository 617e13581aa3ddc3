//! Configuration loading for the `drpc` binary.
//!
//! Leading arguments that name configuration flags are handed to
//! `ortho-config`; everything from the first other token onwards describes
//! the call.

use std::ffi::{OsStr, OsString};

use drpc_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

/// Configuration flags recognised ahead of the call arguments.
///
/// Kept in step with the fields of [`drpc_config::Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--socket-path",
    "--connect-timeout-ms",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered configuration arguments.
    ///
    /// Configuration flags must come before `MODULE`; any appearing after it
    /// are parsed as call arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }

    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*text, false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments split between the configuration loader and the call parser.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    /// Program name followed by every leading configuration flag and value.
    pub(crate) config_arguments: Vec<OsString>,
    /// Program name followed by the remaining call arguments.
    pub(crate) call_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            call_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = rest.iter();
    let mut call_arguments = vec![program.clone()];

    while let Some(argument) = remaining.next() {
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                if needs_value {
                    config_arguments.extend(remaining.next().cloned());
                }
            }
            FlagAction::Stop => {
                call_arguments.push(argument.clone());
                break;
            }
        }
    }
    call_arguments.extend(remaining.cloned());

    ConfigArgumentSplit {
        config_arguments,
        call_arguments,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case("--socket-path", FlagAction::Include { needs_value: true })]
    #[case("--body", FlagAction::Stop)]
    #[case("7", FlagAction::Stop)]
    fn classifies_arguments(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify(OsStr::new(argument)), expected);
    }

    #[test]
    fn splits_leading_configuration_flags() {
        let split = split_config_arguments(&os(&[
            "drpc",
            "--socket-path",
            "/tmp/a.sock",
            "--log-format=compact",
            "2",
            "7",
            "--body",
            "aGk=",
        ]));
        assert_eq!(
            split.config_arguments,
            os(&["drpc", "--socket-path", "/tmp/a.sock", "--log-format=compact"])
        );
        assert_eq!(split.call_arguments, os(&["drpc", "2", "7", "--body", "aGk="]));
    }

    #[test]
    fn configuration_flags_after_the_call_stay_with_the_call() {
        let split = split_config_arguments(&os(&["drpc", "2", "7", "--log-filter", "debug"]));
        assert_eq!(split.config_arguments, os(&["drpc"]));
        assert_eq!(
            split.call_arguments,
            os(&["drpc", "2", "7", "--log-filter", "debug"])
        );
    }

    #[test]
    fn empty_arguments_split_to_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(split.call_arguments.is_empty());
    }
}
