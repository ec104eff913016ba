use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "fleet-booker")]
#[command(about = "Books car-service appointments from FleetLink service IDs")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "fleet-booker.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run one booking job from a JSON request file
    Run {
        /// JSON file with the booking request
        #[arg(short, long)]
        job: PathBuf,

        /// Browser profile (firefox, chromium); defaults to the configured profile
        #[arg(short, long)]
        browser: Option<String>,
    },

    /// Start the HTTP intake server
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Resolve FleetLink IDs against the mapping table without opening a browser
    Resolve {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from([
            "fleet-booker",
            "--config",
            "prod.toml",
            "run",
            "--job",
            "job.json",
            "--browser",
            "chromium",
        ]);

        assert_eq!(cli.config, PathBuf::from("prod.toml"));
        match cli.command {
            Command::Run { job, browser } => {
                assert_eq!(job, PathBuf::from("job.json"));
                assert_eq!(browser.as_deref(), Some("chromium"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_resolve_ids() {
        let cli = Cli::parse_from(["fleet-booker", "resolve", "--ids", "26,27", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Resolve { ids } => assert_eq!(ids, vec![26, 27]),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
