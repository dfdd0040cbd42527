//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// calconnect - Google Calendar and Outlook behind one interface
#[derive(Debug, Parser)]
#[command(name = "calconnect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALCONNECT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Provider to use (google, outlook); overrides the config file
    #[arg(long, short, env = "CALCONNECT_PROVIDER")]
    pub provider: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the provider's authorization URL
    Connect,

    /// Exchange an authorization code and store the tokens
    Access {
        /// User the tokens belong to
        #[arg(long)]
        user: String,

        /// Authorization code from the redirect
        #[arg(long)]
        code: String,
    },

    /// List events between two wall-clock times
    Events {
        #[arg(long)]
        user: String,

        /// Window start, e.g. 2024-12-10T09:00:00
        #[arg(long)]
        start: String,

        /// Window end
        #[arg(long)]
        end: String,

        /// IANA timezone the start and end are expressed in
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Calendar to read (defaults to the primary calendar)
        #[arg(long)]
        calendar: Option<String>,
    },

    /// Create an event
    CreateEvent {
        #[arg(long)]
        user: String,

        #[arg(long)]
        summary: String,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        /// IANA timezone of start and end
        #[arg(long)]
        timezone: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Attendee email (can be repeated)
        #[arg(long, action = clap::ArgAction::Append)]
        attendee: Vec<String>,

        #[arg(long)]
        calendar: Option<String>,
    },

    /// Refresh a user's access token if it is close to expiry
    Refresh {
        #[arg(long)]
        user: String,
    },

    /// Run the token refresh job until interrupted
    Run,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_create_event() {
        let cli = Cli::try_parse_from([
            "calconnect",
            "--provider",
            "outlook",
            "create-event",
            "--user",
            "u1",
            "--summary",
            "Sync",
            "--start",
            "2024-12-10T09:00:00",
            "--end",
            "2024-12-10T09:30:00",
            "--timezone",
            "Asia/Karachi",
            "--attendee",
            "a@example.com",
            "--attendee",
            "b@example.com",
        ])
        .unwrap();

        assert_eq!(cli.provider.as_deref(), Some("outlook"));
        match cli.command {
            Command::CreateEvent { attendee, description, calendar, .. } => {
                assert_eq!(attendee, vec!["a@example.com", "b@example.com"]);
                assert_eq!(description, "");
                assert!(calendar.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn events_timezone_defaults_to_utc() {
        let cli = Cli::try_parse_from([
            "calconnect", "events", "--user", "u1", "--start", "2024-12-10", "--end", "2024-12-11",
        ])
        .unwrap();
        match cli.command {
            Command::Events { timezone, .. } => assert_eq!(timezone, "UTC"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
