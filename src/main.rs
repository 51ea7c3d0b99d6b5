use anyhow::Result;
use clap::Parser;
use khichuri::cli::{Cli, Commands};
use khichuri::{utils, ChatMessage, ChatSession, ConversationRepository, MongoRepository, Settings};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let repository: Arc<dyn ConversationRepository> =
        Arc::new(MongoRepository::from_settings(&settings).await?);

    if let Err(e) = run(cli.command, repository, &settings).await {
        utils::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    command: Commands,
    repository: Arc<dyn ConversationRepository>,
    settings: &Settings,
) -> Result<()> {
    match command {
        Commands::Login { user } => {
            ChatSession::login(repository, &user).await?;
            utils::print_success(&format!("Logged in as {}", user));
        }
        Commands::New { user, title, system } => {
            let title = title.unwrap_or_else(|| settings.chat.default_title.clone());
            let system = system.unwrap_or_else(|| settings.chat.default_system_prompt.clone());

            let mut session = ChatSession::for_user(repository, user);
            let conversation_id = session.new_conversation(&title, &system).await?;
            utils::print_success(&format!("Created conversation {}", conversation_id));
        }
        Commands::List { user } => {
            let session = ChatSession::for_user(repository, &user);
            let titles = session.titles().await?;

            utils::print_header(&format!("Conversations of {}", user));
            if titles.is_empty() {
                utils::print_info("No conversations yet");
            }
            for chat in titles {
                let title = if chat.title.is_empty() { "Untitled Chat" } else { chat.title.as_str() };
                println!("{}  {}", chat.conversation_id, title);
            }
        }
        Commands::Show { user, id, json } => {
            let mut session = ChatSession::for_user(repository, user);
            session.open(&id).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(session.messages())?);
            } else {
                utils::print_header(&session.title().await?);
                for message in session.messages() {
                    utils::print_message(message);
                }
            }
        }
        Commands::Rename { user, id, title } => {
            let mut session = ChatSession::for_user(repository, user);
            session.open(&id).await?;
            if session.rename(&title).await? {
                utils::print_success("Title updated");
            } else {
                utils::print_info("Title unchanged");
            }
        }
        Commands::Prompt { user, id, prompt } => {
            let mut session = ChatSession::for_user(repository, user);
            session.open(&id).await?;
            if session.set_system_prompt(&prompt).await? {
                utils::print_success("System prompt updated");
            } else {
                utils::print_info("System prompt unchanged");
            }
        }
        Commands::Say { user, id, role, content } => {
            let mut session = ChatSession::for_user(repository, user);
            session.open(&id).await?;
            session.record(ChatMessage::new(role.into(), content)).await?;
            utils::print_success(&format!("Saved ({} messages)", session.messages().len()));
        }
        Commands::Delete { user, id } => {
            let mut session = ChatSession::for_user(repository, user);
            session.open(&id).await?;
            if session.delete().await? {
                utils::print_success("Conversation deleted");
            } else {
                utils::print_info("Conversation was already gone");
            }
        }
        Commands::Clear { user } => {
            let mut session = ChatSession::for_user(repository, user);
            if session.delete_all().await? {
                utils::print_success("All conversations deleted");
            } else {
                utils::print_info("Nothing to delete");
            }
        }
    }

    Ok(())
}
