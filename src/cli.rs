// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `execplan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "execplan",
    version,
    about = "Plan and run a task graph with ordering, finalizer and location constraints.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Plan.toml")]
    pub config: String,

    /// Requested task groups, in order.
    ///
    /// Each argument is one group; separate several tasks of one group with
    /// commas (`clean build,test`). Defaults to the `[[request]]` entries of
    /// the plan file.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Exclude a task (and whatever only it pulls in) from the plan.
    #[arg(short = 'x', long = "exclude-task", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Keep running independent tasks after a failure.
    #[arg(long = "continue")]
    pub continue_on_failure: bool,

    /// Override `[plan].max_workers`.
    #[arg(long, value_name = "N")]
    pub max_workers: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXECPLAN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build the plan and print the execution queue without running anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Positional arguments split into requested groups.
    pub fn requested_groups(&self) -> Vec<Vec<String>> {
        self.tasks
            .iter()
            .map(|arg| {
                arg.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect()
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_positional_argument_is_one_group() {
        let args = CliArgs::parse_from(["execplan", "clean", "build, test", "-x", "lint"]);
        assert_eq!(
            args.requested_groups(),
            vec![
                vec!["clean".to_string()],
                vec!["build".to_string(), "test".to_string()],
            ]
        );
        assert_eq!(args.exclude, vec!["lint".to_string()]);
        assert_eq!(args.config, "Plan.toml");
    }
}
