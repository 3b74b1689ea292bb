//! Command definitions and handlers

use crate::friends::{Friend, FriendsService};
use crate::shutdown_signal;
use arbor_client::TreeClient;
use arbor_model::{TreeResult, Value};
use clap::Subcommand;
use futures_util::{Stream, StreamExt};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Friend list operations
    Friends {
        #[command(subcommand)]
        subcommand: FriendsSubcommand,
    },
    /// Print the value at a path
    Get { path: String },
    /// Replace the value at a path
    Set {
        path: String,
        /// JSON value
        json: String,
    },
    /// Append a value under a generated key
    Push {
        path: String,
        /// JSON value
        json: String,
    },
    /// Print the value at a path on every change
    Watch {
        path: String,
        /// Stop after this many snapshots
        #[arg(long)]
        count: Option<usize>,
    },
    /// Mark a user online until Ctrl+C
    Presence { user_id: String },
}

#[derive(Subcommand, Debug)]
pub enum FriendsSubcommand {
    /// Add a friend, printing the new id
    Add { name: String, family: String },
    /// List friends
    List,
    /// Replace a friend's record
    Update { id: String, name: String, family: String },
    /// Remove a friend
    Remove { id: String },
    /// Print the friend list on every change
    Watch {
        /// Stop after this many snapshots
        #[arg(long)]
        count: Option<usize>,
    },
}

pub async fn run(client: &TreeClient, command: Command) -> anyhow::Result<()> {
    let db = client.adapter();
    match command {
        Command::Friends { subcommand } => {
            run_friends(FriendsService::new(db.clone()), subcommand).await?
        }
        Command::Get { path } => {
            let snapshot = db.read_snapshot(&path).await?;
            if !snapshot.exists() {
                tracing::info!(key = ?snapshot.key, "Nothing stored at {}", path);
            }
            print_value(&snapshot.value)?
        }
        Command::Set { path, json } => {
            let value = parse_json(&json)?;
            db.write(&path, &value).await?;
        }
        Command::Push { path, json } => {
            let value = parse_json(&json)?;
            println!("{}", db.append(&path, &value).await?);
        }
        Command::Watch { path, count } => {
            let mut sub = db.subscribe_object(&path).await?;
            watch_stream(&mut sub, count, |value| print_value(&value)).await?;
        }
        Command::Presence { user_id } => {
            let monitor = db.monitor_presence(&user_id);
            let mut sub = db.subscribe_object(monitor.path()).await?;
            tracing::info!(user = %user_id, "Presence active. Press Ctrl+C to stop.");
            let result = watch_stream(&mut sub, None, |value| print_value(&value)).await;
            monitor.stop().await;
            result?;
        }
    }
    Ok(())
}

async fn run_friends(
    friends: FriendsService,
    subcommand: FriendsSubcommand,
) -> anyhow::Result<()> {
    match subcommand {
        FriendsSubcommand::Add { name, family } => {
            println!("{}", friends.add_friend(&Friend::new(name, family)).await?);
        }
        FriendsSubcommand::List => print_friends(&friends.list_friends().await?),
        FriendsSubcommand::Watch { count } => {
            let mut watch = Box::pin(friends.watch_friends().await?);
            watch_stream(&mut watch, count, |list| {
                print_friends(&list);
                println!();
                Ok(())
            })
            .await?;
        }
        FriendsSubcommand::Update { id, name, family } => {
            friends.update_friend(&Friend { id, name, family }).await?;
        }
        FriendsSubcommand::Remove { id } => friends.remove_friend(&id).await?,
    }
    Ok(())
}

/// Print stream items until the stream ends, `count` items were shown, or
/// the process is interrupted.
async fn watch_stream<S, T>(
    stream: &mut S,
    count: Option<usize>,
    mut show: impl FnMut(T) -> anyhow::Result<()>,
) -> anyhow::Result<()>
where
    S: Stream<Item = TreeResult<T>> + Unpin,
{
    let mut seen = 0usize;
    loop {
        tokio::select! {
            _ = shutdown_signal() => break,
            next = stream.next() => match next {
                Some(item) => show(item?)?,
                None => break,
            },
        }
        seen += 1;
        if count.is_some_and(|n| seen >= n) {
            break;
        }
    }
    Ok(())
}

fn print_friends(friends: &[Friend]) {
    for friend in friends {
        println!("{}  {} {}", friend.id, friend.name, friend.family);
    }
}

fn parse_json(text: &str) -> anyhow::Result<Value> {
    // Bare words are taken as strings
    Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

fn print_value(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
