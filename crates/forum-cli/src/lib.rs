#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;

mod commands;

pub const ENV_USER_EMAIL: &str = "FORUM_USER_EMAIL";
pub const ENV_USER_PASSWORD: &str = "FORUM_USER_PASSWORD";

#[derive(Parser)]
#[command(name = "forum")]
#[command(about = "Forum marketplace client")]
pub struct ForumCli {
    /// API base URL (defaults to $FORUM_BASE_URL, then localhost)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Account email (defaults to $FORUM_USER_EMAIL)
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Account password (defaults to $FORUM_USER_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Verify credentials and show the acting identity
    Login,
    /// Blacklist the refresh token and end the session
    Logout,
    /// List the startup catalog
    Startups,
    /// List the caller's investor and startup cabinets
    Cabinets,
    /// Switch the acting namespace
    SelectNamespace {
        /// Cabinet id to act as
        #[arg(long)]
        id: i64,
        /// Namespace kind: investor or startup
        #[arg(long)]
        kind: forum_client_core::NamespaceKind,
    },
    /// List conversation rooms
    Rooms,
    /// Open a chat room: prints history and live messages, sends stdin lines
    Chat {
        /// Room id to open
        room_id: String,
    },
    /// List notifications; --follow tails the live channel
    Notifications {
        #[arg(long)]
        follow: bool,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = ForumCli::parse();
    commands::run(cli).await
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;

    use super::ForumCli;

    #[test]
    fn cli_requires_subcommand() {
        let err = match ForumCli::try_parse_from(["forum"]) {
            Ok(_) => panic!("expected missing subcommand parse error"),
            Err(err) => err,
        };
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        let err = match ForumCli::try_parse_from(["forum", "unknown-subcommand"]) {
            Ok(_) => panic!("expected invalid subcommand parse error"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn select_namespace_parses_kind() {
        let cli = ForumCli::try_parse_from([
            "forum",
            "select-namespace",
            "--id",
            "3",
            "--kind",
            "investor",
        ])
        .expect("valid invocation");
        match cli.command {
            super::Commands::SelectNamespace { id, kind } => {
                assert_eq!(id, 3);
                assert_eq!(kind, forum_client_core::NamespaceKind::Investor);
            }
            _ => panic!("expected select-namespace"),
        }
    }

    #[test]
    fn select_namespace_rejects_unknown_kind() {
        let result = ForumCli::try_parse_from([
            "forum",
            "select-namespace",
            "--id",
            "3",
            "--kind",
            "admin",
        ]);
        assert!(result.is_err());
    }
}
