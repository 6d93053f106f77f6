use std::sync::Arc;

use anyhow::{Context, bail};
use forum_api_client::{ApiClient, ApiClientConfig, ApiError, SelectNamespaceRequest};
use forum_chat::{Conversation, NotificationChannel};
use forum_client_core::resolve_base_url;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::{Commands, ENV_USER_EMAIL, ENV_USER_PASSWORD, ForumCli};

pub async fn run(cli: ForumCli) -> anyhow::Result<()> {
    let (base_url, source) = match &cli.base_url {
        Some(raw) => (forum_client_core::normalize_base_url(raw)?, "--base-url"),
        None => resolve_base_url()?,
    };
    info!(%base_url, source, "using forum backend");

    let client = Arc::new(ApiClient::new(ApiClientConfig::new(&base_url))?);
    authenticate(&client, &cli).await?;

    match cli.command {
        Commands::Login => login(&client),
        Commands::Logout => logout(&client).await,
        Commands::Startups => startups(&client).await,
        Commands::Cabinets => cabinets(&client).await,
        Commands::SelectNamespace { id, kind } => select_namespace(&client, id, kind).await,
        Commands::Rooms => rooms(&client).await,
        Commands::Chat { room_id } => chat(&client, &room_id).await,
        Commands::Notifications { follow } => notifications(&client, follow).await,
    }
}

async fn authenticate(client: &ApiClient, cli: &ForumCli) -> anyhow::Result<()> {
    let email = cli.email.clone().or_else(|| env_non_empty(ENV_USER_EMAIL));
    let password = cli
        .password
        .clone()
        .or_else(|| env_non_empty(ENV_USER_PASSWORD));
    let (Some(email), Some(password)) = (email, password) else {
        bail!(
            "credentials required: pass --email/--password or set \
             {ENV_USER_EMAIL}/{ENV_USER_PASSWORD}"
        );
    };
    let profile = client
        .login(&email, &password)
        .await
        .context("login failed")?;
    info!(email = %profile.email, "authenticated");
    Ok(())
}

fn login(client: &ApiClient) -> anyhow::Result<()> {
    let session = client.session();
    println!("authenticated: {}", session.is_authenticated());
    match session.current_identity() {
        Some(identity) => println!(
            "acting as {} {} (user {})",
            identity.namespace, identity.namespace_id, identity.user_id
        ),
        None => println!("no namespace selected yet - run `forum cabinets`"),
    }
    Ok(())
}

async fn logout(client: &ApiClient) -> anyhow::Result<()> {
    client.logout().await.map_err(explain)?;
    println!("logged out");
    Ok(())
}

async fn startups(client: &ApiClient) -> anyhow::Result<()> {
    let listing = client.startups().await.map_err(explain)?;
    if listing.is_empty() {
        println!("there are no startups yet");
        return Ok(());
    }
    for startup in listing {
        println!("{}\t{}", startup.startup_id, startup.name);
    }
    Ok(())
}

async fn cabinets(client: &ApiClient) -> anyhow::Result<()> {
    let claims = client
        .session()
        .current_claims()
        .context("no decodable session claims")?;
    let investors = client
        .investor_cabinets(claims.user_id)
        .await
        .map_err(explain)?;
    let startups = client
        .startup_cabinets(claims.user_id)
        .await
        .map_err(explain)?;

    println!("investor cabinets:");
    for cabinet in &investors {
        println!("  {}", cabinet.investor_id);
    }
    if investors.is_empty() {
        println!("  (none)");
    }
    println!("startup cabinets:");
    for cabinet in &startups {
        println!("  {}", cabinet.startup_id);
    }
    if startups.is_empty() {
        println!("  (none)");
    }
    Ok(())
}

async fn select_namespace(
    client: &ApiClient,
    id: i64,
    kind: forum_client_core::NamespaceKind,
) -> anyhow::Result<()> {
    let request = SelectNamespaceRequest {
        name_space_id: id,
        name_space_name: kind,
    };
    client.select_namespace(&request).await.map_err(explain)?;
    println!("acting as {kind} {id}");
    Ok(())
}

async fn rooms(client: &ApiClient) -> anyhow::Result<()> {
    let rooms = client.conversations().await.map_err(explain)?;
    if rooms.is_empty() {
        println!("no conversations yet");
        return Ok(());
    }
    for room in rooms {
        println!("{}\t{}", room.id, room.name);
    }
    Ok(())
}

async fn chat(client: &Arc<ApiClient>, room_id: &str) -> anyhow::Result<()> {
    let token = client
        .session()
        .credential()
        .context("no access token after login")?;
    let channel = NotificationChannel::for_session(client.base_url(), &token)?;
    channel.connect().await?;

    let conversation = Conversation::new(Arc::clone(client), room_id);
    conversation.open().await?;

    let mut printed = 0;
    printed = print_new(&conversation, printed);
    println!("-- type a message and press enter; /quit leaves --");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            maybe_event = channel.recv() => {
                let Some(event) = maybe_event else { break };
                if let Err(error) = conversation.handle_notification(&event).await {
                    warn!(%error, "failed to apply notification");
                }
                printed = print_new(&conversation, printed);
            }
            maybe_line = lines.next_line() => {
                match maybe_line {
                    Ok(Some(line)) if line.trim() == "/quit" => break,
                    Ok(Some(line)) if !line.trim().is_empty() => {
                        match conversation.send(line.trim()).await {
                            Ok(_) => printed = print_new(&conversation, printed),
                            Err(error) => eprintln!("send failed: {error}"),
                        }
                    }
                    Ok(Some(_)) => {}
                    Ok(None) | Err(_) => break,
                }
            }
        }
    }

    channel.close().await?;
    conversation.close();
    Ok(())
}

fn print_new(conversation: &Conversation, printed: usize) -> usize {
    let messages = conversation.messages();
    for message in &messages[printed.min(messages.len())..] {
        match &message.author {
            Some(author) => println!(
                "[{} {}] {}",
                author.namespace, author.namespace_id, message.content
            ),
            None => println!("[?] {}", message.content),
        }
    }
    messages.len()
}

async fn notifications(client: &ApiClient, follow: bool) -> anyhow::Result<()> {
    let listing = client.notifications().await.map_err(explain)?;
    for notification in &listing {
        println!(
            "{}\t{}\t{}",
            notification.created_at, notification.id, notification.message
        );
    }
    if listing.is_empty() {
        println!("no notifications");
    }
    if !follow {
        return Ok(());
    }

    let token = client
        .session()
        .credential()
        .context("no access token after login")?;
    let channel = NotificationChannel::for_session(client.base_url(), &token)?;
    channel.connect().await?;
    println!("-- following live notifications; ctrl-c to stop --");
    loop {
        tokio::select! {
            maybe_event = channel.recv() => {
                let Some(event) = maybe_event else { break };
                let text = event.message.as_deref().unwrap_or("<no text>");
                println!("{text}");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    channel.close().await?;
    Ok(())
}

fn explain(error: ApiError) -> anyhow::Error {
    match error {
        ApiError::Unauthenticated => {
            anyhow::anyhow!("session missing or expired - log in again")
        }
        other => anyhow::Error::new(other),
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
