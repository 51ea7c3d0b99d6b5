use crate::core::message::Role;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "khichuri")]
#[command(author, version, about = "Manage per-user chat history stored in MongoDB", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the user if it does not exist yet
    Login { user: String },

    /// Start a new conversation seeded with a system prompt
    New {
        #[arg(short, long)]
        user: String,

        /// Conversation title (default from settings)
        #[arg(short, long)]
        title: Option<String>,

        /// System prompt (default from settings)
        #[arg(short, long)]
        system: Option<String>,
    },

    /// List a user's conversations in stored order
    List {
        #[arg(short, long)]
        user: String,
    },

    /// Print a conversation transcript
    Show {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        id: String,

        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename a conversation
    Rename {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        id: String,

        title: String,
    },

    /// Replace the system prompt of a conversation
    Prompt {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        id: String,

        prompt: String,
    },

    /// Append a message to a conversation
    Say {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        id: String,

        #[arg(short, long, value_enum, default_value_t = SpeakerRole::User)]
        role: SpeakerRole,

        content: String,
    },

    /// Delete one conversation
    Delete {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        id: String,
    },

    /// Delete every conversation of a user
    Clear {
        #[arg(short, long)]
        user: String,
    },
}

/// Roles a caller may append; the system message is managed via `prompt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpeakerRole {
    User,
    Assistant,
}

impl From<SpeakerRole> for Role {
    fn from(role: SpeakerRole) -> Self {
        match role {
            SpeakerRole::User => Role::User,
            SpeakerRole::Assistant => Role::Assistant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_say_defaults_to_user() {
        let cli = Cli::try_parse_from(["khichuri", "say", "-u", "alice", "-i", "abc", "Hello!"]).unwrap();
        match cli.command {
            Commands::Say { user, id, role, content } => {
                assert_eq!(user, "alice");
                assert_eq!(id, "abc");
                assert_eq!(role, SpeakerRole::User);
                assert_eq!(content, "Hello!");
            }
            _ => panic!("expected say"),
        }
    }

    #[test]
    fn test_parse_new_with_options() {
        let cli = Cli::try_parse_from([
            "khichuri", "new", "--user", "alice", "--title", "Trip planning", "--system",
            "You are a travel agent",
        ])
        .unwrap();
        match cli.command {
            Commands::New { user, title, system } => {
                assert_eq!(user, "alice");
                assert_eq!(title.as_deref(), Some("Trip planning"));
                assert_eq!(system.as_deref(), Some("You are a travel agent"));
            }
            _ => panic!("expected new"),
        }
    }

    #[test]
    fn test_system_role_is_not_accepted() {
        assert!(Cli::try_parse_from(["khichuri", "say", "-u", "a", "-i", "b", "-r", "system", "x"]).is_err());
        let cli = Cli::try_parse_from(["khichuri", "say", "-u", "a", "-i", "b", "-r", "assistant", "x"]).unwrap();
        assert!(matches!(cli.command, Commands::Say { role: SpeakerRole::Assistant, .. }));
    }
}
