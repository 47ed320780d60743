use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::commands;
use crate::config::Config;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "zm",
    version,
    about = "ZenMatrix: Eisenhower-matrix task client",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    /// Raise log verbosity (repeatable).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Lower log verbosity (repeatable).
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Override one config key for this invocation.
    #[arg(
        long = "rc",
        value_name = "KEY=VALUE",
        value_parser = parse_override,
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<(String, String)>,

    /// Read configuration from this file instead of ~/.zenmatrixrc.
    #[arg(long = "rc-file", value_name = "PATH")]
    pub rc_file: Option<PathBuf>,

    /// Keep session and view state under this directory.
    #[arg(long = "data", value_name = "DIR")]
    pub data: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

fn parse_override(raw: &str) -> anyhow::Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) => Ok((key.trim().to_string(), value.trim().to_string())),
        None => Err(anyhow!("expected KEY=VALUE, got: {raw}")),
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) => "warn",
        (_, 3..) => "trace",
        (_, 2) => "debug",
        (_, 1) => "info",
        _ => "warn",
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|err| anyhow!("invalid RUST_LOG / log filter: {err}"))?;

    // Logs go to stderr so the task tables own stdout.
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
    {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Raw argv with the positional `rc.key=value` overrides separated out.
#[derive(Debug, Clone)]
pub struct ArgSplit {
    pub clap_args: Vec<OsString>,
    pub overrides: Vec<(String, String)>,
}

/// Pluck positional `rc.key=value` / `rc.key:value` override tokens out of
/// argv before clap parses it. The leading binary name stays put.
#[tracing::instrument(skip_all)]
pub fn split_rc_overrides(raw: &[OsString]) -> ArgSplit {
    let mut clap_args = Vec::with_capacity(raw.len());
    let mut overrides = Vec::new();

    for (index, arg) in raw.iter().enumerate() {
        if index > 0
            && let Some((key, value)) = positional_override(&arg.to_string_lossy())
        {
            debug!(key = %key, value = %value, "captured positional rc override");
            overrides.push((key, value));
        } else {
            clap_args.push(arg.clone());
        }
    }

    ArgSplit {
        clap_args,
        overrides,
    }
}

fn positional_override(arg: &str) -> Option<(String, String)> {
    let body = arg.strip_prefix("rc.")?;
    let split_at = body.find(['=', ':'])?;
    let (key, value) = body.split_at(split_at);
    Some((format!("rc.{key}"), value[1..].to_string()))
}

/// One command-line invocation: view tokens ahead of the command word,
/// the command itself, and its trailing arguments.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub view_tokens: Vec<String>,
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> Self {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        if tokens.is_empty() {
            let command = cfg
                .get("default.command")
                .unwrap_or_else(|| "list".to_string());
            debug!(command = %command, "no arguments, using the default command");
            return Self {
                view_tokens: vec![],
                command,
                command_args: vec![],
            };
        }

        // `zm 7` is shorthand for `zm show 7`.
        if let [only] = tokens.as_slice()
            && only.parse::<u64>().is_ok()
        {
            debug!(token = %only, "single numeric token interpreted as task detail query");
            return Self {
                view_tokens: vec![],
                command: "show".to_string(),
                command_args: tokens,
            };
        }

        let hit = tokens.iter().enumerate().find_map(|(index, token)| {
            commands::expand_command_abbrev(token).map(|name| (index, name))
        });

        let Some((index, command)) = hit else {
            warn!("no command word found, treating every token as view state for 'list'");
            return Self {
                view_tokens: tokens,
                command: "list".to_string(),
                command_args: vec![],
            };
        };

        debug!(
            token = %tokens[index],
            expanded = %command,
            split_index = index,
            "resolved command token"
        );
        Self {
            view_tokens: tokens[..index].to_vec(),
            command: command.to_string(),
            command_args: tokens[index + 1..].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::positional_override;

    #[test]
    fn positional_overrides_accept_both_separators() {
        assert_eq!(
            positional_override("rc.color=off"),
            Some(("rc.color".to_string(), "off".to_string()))
        );
        assert_eq!(
            positional_override("rc.page.limit:10"),
            Some(("rc.page.limit".to_string(), "10".to_string()))
        );
        assert_eq!(positional_override("rc.color"), None);
        assert_eq!(positional_override("color=off"), None);
    }
}
