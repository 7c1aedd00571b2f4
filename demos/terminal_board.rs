//! # Terminal Board Example
//!
//! A line-oriented dashboard for the Ishy service:
//!
//! 1. Restore the user ID from a local file, or capture one
//! 2. Set a nickname, join the queue, leave, reveal, block
//! 3. Watch the live status and service counters as they are reconciled
//! 4. Shut down cleanly on `quit`, end of input, or Ctrl+C
//!
//! ## Running
//!
//! ```sh
//! # Start an Ishy API server on localhost:8000, then:
//! cargo run --example terminal_board
//!
//! # Override the server, key, or identity file:
//! ISHY_API_URL=http://my-server:8000 ISHY_API_KEY=secret \
//! ISHY_STATE_FILE=/tmp/ishy.json cargo run --example terminal_board
//! ```

use ishy_client::{
    FileStorage, HttpTransport, IshyConfig, IshyController, IshyError, SessionEvent,
    SessionSnapshot,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default identity file when `ISHY_STATE_FILE` is not set.
const DEFAULT_STATE_FILE: &str = "ishy_identity.json";

const HELP: &str = "\
commands:
  id <digits>      set your user ID
  nick <name>      set your nickname (2-32 characters)
  join             find a friend
  leave            leave the queue or the chat
  reveal           reveal your identity to your partner
  block            block your partner
  unblock <id>     unblock a user
  refresh          re-fetch status now
  forget           forget the stored user ID
  show             print the board
  clear            dismiss notices
  quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for request-level output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let config = IshyConfig::from_env();
    let state_file =
        std::env::var("ISHY_STATE_FILE").unwrap_or_else(|_| DEFAULT_STATE_FILE.to_string());
    tracing::info!("Using {} (identity in {state_file})", config.base_url);

    let transport = HttpTransport::new(config.base_url.clone())?;
    let (controller, mut events) =
        IshyController::start(transport, FileStorage::new(state_file), config);

    println!("{HELP}");
    match controller.identity().await {
        Some(id) => println!("welcome back, user {id}"),
        None => println!("enter `id <digits>` to begin"),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match handle_line(&controller, line.trim()).await {
                    Ok(true) => print_board(&controller.snapshot().await),
                    Ok(false) => break,
                    Err(e) => println!("! {e}"),
                }
            }

            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                match event {
                    SessionEvent::StatsUpdated { stats } => {
                        tracing::debug!(
                            "queue={} chats={} blocks={}",
                            stats.queue_count,
                            stats.active_chats,
                            stats.blocks
                        );
                    }
                    SessionEvent::NicknameModalChanged { open: true } => {
                        println!("choose a nickname with `nick <name>`");
                    }
                    other => tracing::trace!("event: {other:?}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    controller.dispose().await;
    println!("bye");
    Ok(())
}

/// Run one command. Returns `Ok(false)` to quit.
async fn handle_line(controller: &IshyController, line: &str) -> Result<bool, IshyError> {
    let (cmd, arg) = match line.split_once(' ') {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };
    match cmd {
        "" | "show" => {}
        "help" => println!("{HELP}"),
        "id" => {
            controller.capture_identity(arg).await?;
        }
        "nick" => {
            controller.open_nickname_modal().await;
            controller.set_nickname_draft(arg).await;
            controller.submit_nickname().await?;
        }
        "join" => {
            controller.join_queue().await?;
        }
        "leave" => {
            controller.leave().await?;
        }
        "reveal" => {
            controller.reveal().await?;
        }
        "block" => {
            controller.block().await?;
        }
        "unblock" => {
            controller.unblock(arg).await?;
        }
        "refresh" => {
            controller.refresh().await;
        }
        "forget" => controller.forget_identity().await?,
        "clear" => controller.clear_notices().await,
        "quit" | "exit" => return Ok(false),
        other => println!("unknown command `{other}`, try `help`"),
    }
    Ok(true)
}

fn print_board(snapshot: &SessionSnapshot) {
    let Some(identity) = &snapshot.identity else {
        println!("[no user ID]");
        print_notices(snapshot);
        return;
    };

    let nickname = snapshot
        .status
        .as_ref()
        .and_then(|s| s.nickname.as_deref())
        .unwrap_or("-");
    println!("user {identity} ({nickname}): {}", snapshot.presence.label());
    if let Some(partner) = snapshot.status.as_ref().and_then(|s| s.partner_id.as_deref()) {
        println!("  partner: {partner}");
    }
    match snapshot.stats {
        Some(stats) => println!(
            "  in queue: {}  active chats: {}  blocks: {}",
            stats.queue_count, stats.active_chats, stats.blocks
        ),
        None => println!("  counters: loading..."),
    }
    print_notices(snapshot);
}

fn print_notices(snapshot: &SessionSnapshot) {
    if let Some(success) = &snapshot.notices.success {
        println!("  + {success}");
    }
    if let Some(error) = &snapshot.notices.error {
        println!("  ! {error}");
    }
}
