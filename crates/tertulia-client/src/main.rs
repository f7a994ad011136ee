//! # tertulia
//!
//! Line-oriented console over the local backend. Type `help` for commands.

use std::sync::Arc;

use anyhow::{bail, Context};
use tertulia_client::{Client, ClientConfig, FeedSubscription, UserState};
use tertulia_shared::models::ProfilePatch;
use tertulia_shared::{Providers, UserId};
use tertulia_store::{Database, LocalBackend};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const HELP: &str = "\
commands:
  register <email> <password>
  login <email> <password>
  logout
  whoami
  profile <display_name|bio|career> <value|->
  show <user_id>
  say <text>
  history
  dm <user_id> <text>
  thread <user_id>
  quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tertulia_client::init_tracing();

    info!("Starting Tertulia console v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let db = match &config.database_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            Database::open_at(path)
        }
        None => Database::new(),
    }
    .context("opening the local database")?;

    let backend = Arc::new(LocalBackend::new(db).with_min_password_len(config.min_password_len));
    let client = Client::new(Providers::from_backend(backend));

    let _watch = client.auth.subscribe(|user| println!("* {}", describe(&user)));
    // Restore failures are reported, not fatal.
    if let Err(e) = client.start().await {
        warn!(error = %e, "could not restore the previous session");
        println!("error: {e:#}");
    }

    // Live feeds stay open until replaced or until the console exits.
    let _global = client
        .global_chat
        .subscribe(|m| println!("[global] {}: {}", m.email, m.content))
        .await?;
    let mut thread: Option<FeedSubscription> = None;

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        if command == "quit" {
            break;
        }
        if let Err(e) = run_command(&client, &mut thread, command, rest.trim()).await {
            println!("error: {e:#}");
        }
    }

    if let Some(feed) = thread.take() {
        feed.unsubscribe().await;
    }
    Ok(())
}

async fn run_command(
    client: &Client,
    thread: &mut Option<FeedSubscription>,
    command: &str,
    args: &str,
) -> anyhow::Result<()> {
    match command {
        "help" => println!("{HELP}"),
        "register" | "login" => {
            let Some((email, password)) = args.split_once(' ') else {
                bail!("usage: {command} <email> <password>");
            };
            if command == "register" {
                client.auth.register(email, password.trim()).await?;
            } else {
                client.auth.login(email, password.trim()).await?;
            }
        }
        "logout" => {
            if let Some(feed) = thread.take() {
                feed.unsubscribe().await;
            }
            client.auth.logout().await;
        }
        "whoami" => println!("{}", describe(&client.auth.current_user())),
        "profile" => {
            let Some((field, value)) = args.split_once(' ') else {
                bail!("usage: profile <display_name|bio|career> <value|->");
            };
            let value = match value.trim() {
                "-" => None,
                v => Some(v.to_string()),
            };
            let mut patch = ProfilePatch::default();
            match field {
                "display_name" => patch.display_name = Some(value),
                "bio" => patch.bio = Some(value),
                "career" => patch.career = Some(value),
                other => bail!("unknown profile field: {other}"),
            }
            client.auth.update_profile(patch).await?;
        }
        "show" => {
            let profile = client.auth.fetch_profile(&UserId::from(args)).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        "say" => {
            client.send_global_message(args).await?;
        }
        "history" => {
            for m in client.global_chat.fetch_all().await? {
                println!("{} {}: {}", m.created_at.format("%H:%M"), m.email, m.content);
            }
        }
        "dm" => {
            let me = signed_in(client)?;
            let Some((to, text)) = args.split_once(' ') else {
                bail!("usage: dm <user_id> <text>");
            };
            client
                .private_chats
                .send_message(&me, &UserId::from(to), text.trim())
                .await?;
        }
        "thread" => {
            let me = signed_in(client)?;
            let other = UserId::from(args);
            if let Some(feed) = thread.take() {
                feed.unsubscribe().await;
            }

            for m in client.private_chats.fetch_messages(&me, &other).await? {
                println!("{} {}: {}", m.created_at.format("%H:%M"), m.sender_id.short(), m.content);
            }
            let feed = client
                .private_chats
                .subscribe_to_messages(&me, &other, |m| {
                    println!("[dm] {}: {}", m.sender_id.short(), m.content)
                })
                .await?;
            *thread = Some(feed);
        }
        other => bail!("unknown command: {other} (try `help`)"),
    }
    Ok(())
}

fn signed_in(client: &Client) -> anyhow::Result<UserId> {
    client
        .auth
        .current_user()
        .id
        .context("sign in first")
}

fn describe(user: &UserState) -> String {
    match (&user.id, &user.email) {
        (Some(id), Some(email)) => format!(
            "{email} ({id}) name={} career={} bio={}",
            user.display_name.as_deref().unwrap_or("-"),
            user.career.as_deref().unwrap_or("-"),
            user.bio.as_deref().unwrap_or("-"),
        ),
        _ => "signed out".to_string(),
    }
}
