use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use haven_inbox::config::parse_poll_secs;
use haven_inbox::{
    group_conversations_with_report, parse_message_batch, Inbox, InboxConfig, MarkAsReadInput,
    NewUserInput, SendMessageInput, SqliteStore, UserId, ValidateExt,
};
use tracing::{info, warn};

use crate::cli::{Cli, Command, StoreArgs, UserArgs};
use crate::render::{render_skipped, render_summary};

/// Current user from the flag, falling back to the configured one
pub fn resolve_user(args: &UserArgs, config: &InboxConfig) -> Result<UserId> {
    match (&args.user, &config.user) {
        (Some(raw), _) => UserId::parse(raw).context("Invalid --user"),
        (None, Some(user)) => Ok(user.clone()),
        (None, None) => bail!("No current user: pass --user or set HAVEN_INBOX_USER"),
    }
}

pub fn open_store(args: &StoreArgs, config: &InboxConfig) -> Result<SqliteStore> {
    let path = args.db.as_deref().unwrap_or(&config.database_path);
    SqliteStore::open(path).with_context(|| format!("Failed to open store {}", path.display()))
}

fn read_feed(input: &Path) -> Result<haven_inbox::MessageBatch> {
    let json = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let batch = parse_message_batch(&json)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    if batch.rejected > 0 {
        warn!(rejected = batch.rejected, "Some feed entries could not be decoded");
    }
    Ok(batch)
}

/// `group`: feed file in, conversation JSON out
pub fn group(user: &UserId, input: &Path, pretty: bool, out: &mut impl Write) -> Result<()> {
    let batch = read_feed(input)?;
    let (conversations, report) = group_conversations_with_report(&batch.messages, user);
    if let Some(note) = render_skipped(&report) {
        info!("{}", note);
    }

    let json = if pretty {
        serde_json::to_string_pretty(&conversations)?
    } else {
        serde_json::to_string(&conversations)?
    };
    writeln!(out, "{}", json)?;
    Ok(())
}

pub fn import(store: &SqliteStore, input: &Path, out: &mut impl Write) -> Result<()> {
    let batch = read_feed(input)?;
    let report = store.import(&batch.messages)?;
    writeln!(
        out,
        "Imported {} message(s); {} already present, {} malformed, {} undecodable",
        report.inserted, report.existing, report.malformed, batch.rejected
    )?;
    Ok(())
}

pub fn add_user(store: &SqliteStore, input: NewUserInput, out: &mut impl Write) -> Result<()> {
    let user = store.upsert_user(&input)?;
    writeln!(out, "Saved {} {} ({})", user.first_name, user.last_name, user.id)?;
    Ok(())
}

pub async fn send(
    store: SqliteStore,
    user: UserId,
    input: SendMessageInput,
    out: &mut impl Write,
) -> Result<()> {
    let inbox = Inbox::new(store, user);
    let message = inbox.send(input).await?;
    writeln!(out, "Sent {} to {}", message.id, message.recipient_id)?;
    Ok(())
}

pub async fn show_inbox(store: SqliteStore, user: UserId, out: &mut impl Write) -> Result<()> {
    let inbox = Inbox::new(store, user);
    inbox.refresh().await?;
    write!(out, "{}", render_summary(&inbox.conversations().await))?;
    if let Some(note) = render_skipped(&inbox.last_report().await) {
        info!("{}", note);
    }
    Ok(())
}

pub async fn mark_read(
    store: SqliteStore,
    user: UserId,
    input: MarkAsReadInput,
    out: &mut impl Write,
) -> Result<()> {
    input.validate_input()?;
    let counterpart = UserId::parse(&input.counterpart_id)?;

    let inbox = Inbox::new(store, user);
    inbox.refresh().await?;
    let outcome = inbox.mark_conversation_read(&counterpart).await?;
    writeln!(
        out,
        "Marked {} message(s) read ({} failed)",
        outcome.requested - outcome.failed,
        outcome.failed
    )?;
    if outcome.failed > 0 {
        bail!("{} message(s) could not be marked read", outcome.failed);
    }
    Ok(())
}

/// Poll until `shutdown` resolves, printing the inbox on every change
pub async fn watch(
    store: SqliteStore,
    user: UserId,
    period: Duration,
    out: &mut impl Write,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let inbox = Arc::new(Inbox::new(store, user));
    let mut updates = inbox.subscribe();

    // Print the starting state; an unchanged list is never republished
    match inbox.refresh().await {
        Ok(_) => {
            let conversations = updates.borrow_and_update().clone();
            write!(out, "{}", render_summary(&conversations))?;
            out.flush()?;
        }
        Err(e) => warn!(error = %e, "Initial inbox refresh failed"),
    }

    let poller = inbox.spawn_poller(period);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let conversations = updates.borrow_and_update().clone();
                write!(out, "{}", render_summary(&conversations))?;
                out.flush()?;
            }
        }
    }

    poller.shutdown().await;
    Ok(())
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli, config: InboxConfig, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Command::Group { user, input, pretty } => {
            let user = resolve_user(&user, &config)?;
            group(&user, &input, pretty, out)
        }
        Command::Import { store, input } => import(&open_store(&store, &config)?, &input, out),
        Command::AddUser {
            store,
            id,
            first_name,
            last_name,
        } => add_user(
            &open_store(&store, &config)?,
            NewUserInput {
                id,
                first_name,
                last_name,
            },
            out,
        ),
        Command::Send {
            store,
            user,
            to,
            content,
        } => {
            let user = resolve_user(&user, &config)?;
            let store = open_store(&store, &config)?;
            send(
                store,
                user,
                SendMessageInput {
                    recipient_id: to,
                    content,
                },
                out,
            )
            .await
        }
        Command::Inbox { store, user } => {
            let user = resolve_user(&user, &config)?;
            show_inbox(open_store(&store, &config)?, user, out).await
        }
        Command::MarkRead {
            store,
            user,
            counterpart,
        } => {
            let user = resolve_user(&user, &config)?;
            let store = open_store(&store, &config)?;
            mark_read(
                store,
                user,
                MarkAsReadInput {
                    counterpart_id: counterpart,
                },
                out,
            )
            .await
        }
        Command::Watch {
            store,
            user,
            poll_secs,
        } => {
            let user = resolve_user(&user, &config)?;
            let period = match poll_secs {
                Some(raw) => parse_poll_secs(&raw)?,
                None => config.poll_interval,
            };
            let store = open_store(&store, &config)?;
            info!(user = %user, period_secs = period.as_secs(), "Watching inbox, Ctrl-C to stop");
            watch(store, user, period, out, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            })
            .await
        }
    }
}
