use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::budget::parse_focus;
use crate::config::Config;
use crate::selection::{SelectionSource, TypeTag};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "actionboard",
    version,
    about = "Urgent and filtered views over a next-actions dashboard payload",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// rc file to read instead of ~/.actionboardrc
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Actions payload, overriding payload.location
    #[arg(long = "payload")]
    pub payload: Option<PathBuf>,

    /// Evaluate views as of this moment instead of now
    #[arg(long = "at")]
    pub at: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Actions due soon whose schedule has arrived
    Urgent(UrgentArgs),
    /// Actions matching contexts, people, time, focus and type
    Filter(FilterArgs),
    /// List the context table
    Contexts,
    /// List the people table
    People,
}

#[derive(Args, Debug, Clone, Default)]
pub struct UrgentArgs {
    /// Days ahead to look; defaults to urgent.proximity
    #[arg(short = 'd', long = "days")]
    pub days: Option<u32>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Available context (repeatable)
    #[arg(short = 'c', long = "context")]
    pub contexts: Vec<String>,

    /// Available person (repeatable)
    #[arg(short = 'p', long = "person")]
    pub people: Vec<String>,

    /// Time budget, e.g. 1hr:30m
    #[arg(short = 't', long = "time")]
    pub time: Option<String>,

    /// Focus ceiling: 0-3, min/low/med/high, or none
    #[arg(short = 'f', long = "focus", allow_hyphen_values = true)]
    pub focus: Option<String>,

    #[arg(
        long = "type",
        default_value = "all",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<TypeTag>())
    )]
    pub kind: TypeTag,
}

impl SelectionSource for FilterArgs {
    fn selected_contexts(&self) -> Vec<String> {
        self.contexts.clone()
    }

    fn selected_people(&self) -> Vec<String> {
        self.people.clone()
    }

    fn time_text(&self) -> Option<String> {
        self.time.clone()
    }

    fn focus_selection(&self) -> anyhow::Result<Option<u8>> {
        match &self.focus {
            Some(raw) => parse_focus(raw),
            None => Ok(None),
        }
    }

    fn type_tag(&self) -> anyhow::Result<TypeTag> {
        Ok(self.kind)
    }
}

impl Command {
    /// The command run when none is given, from `default.command`.
    pub fn from_default(cfg: &Config) -> anyhow::Result<Self> {
        let name = cfg
            .get("default.command")
            .unwrap_or_else(|| "urgent".to_string());
        debug!(command = %name, "no explicit command, using default");

        match name.trim() {
            "urgent" => Ok(Command::Urgent(UrgentArgs::default())),
            "filter" => Ok(Command::Filter(FilterArgs::default())),
            "contexts" => Ok(Command::Contexts),
            "people" => Ok(Command::People),
            other => Err(anyhow!("unknown default.command: {other}")),
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.KEY=VALUE` / `rc.KEY:VALUE` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, GlobalCli, preprocess_args};
    use crate::config::Config;
    use crate::selection::{Criteria, TypeTag};

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&os(&[
            "actionboard",
            "rc.urgent.proximity=5",
            "urgent",
            "rc.color:off",
        ]))
        .expect("preprocess");

        assert_eq!(pre.cleaned_args, os(&["actionboard", "urgent"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.urgent.proximity".to_string(), "5".to_string()),
                ("rc.color".to_string(), "off".to_string()),
            ]
        );
    }

    #[test]
    fn filter_flags_become_criteria() {
        let cli = GlobalCli::parse_from([
            "actionboard",
            "filter",
            "-c",
            "home",
            "--context",
            "computer",
            "-t",
            "1hr:30m",
            "-f",
            "med",
            "--type",
            "tasks",
        ]);
        let Some(Command::Filter(args)) = cli.command else {
            panic!("expected filter command");
        };

        let criteria = Criteria::from_source(&args).expect("criteria");
        assert_eq!(
            criteria.contexts,
            Some(vec!["home".to_string(), "computer".to_string()])
        );
        assert_eq!(criteria.people, None);
        assert_eq!(criteria.max_time.as_deref(), Some("1hr:30m"));
        assert_eq!(criteria.max_focus, Some(2));
        assert_eq!(criteria.kind, TypeTag::Tasks);
    }

    #[test]
    fn negative_focus_means_no_limit() {
        let cli = GlobalCli::parse_from(["actionboard", "filter", "-f", "-1"]);
        let Some(Command::Filter(args)) = cli.command else {
            panic!("expected filter command");
        };
        let criteria = Criteria::from_source(&args).expect("criteria");
        assert_eq!(criteria.max_focus, None);
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(GlobalCli::try_parse_from(["actionboard", "filter", "--type", "projects"]).is_err());
    }

    #[test]
    fn default_command_comes_from_config() {
        let mut cfg = Config::default();
        assert!(matches!(Command::from_default(&cfg), Ok(Command::Urgent(_))));

        cfg.apply_overrides([("default.command".to_string(), "people".to_string())]);
        assert!(matches!(Command::from_default(&cfg), Ok(Command::People)));

        cfg.apply_overrides([("default.command".to_string(), "next".to_string())]);
        assert!(Command::from_default(&cfg).is_err());
    }
}
