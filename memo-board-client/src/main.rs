//! Terminal memo board.
//!
//! Talks to a running memo-board-service by default; `--local` keeps the
//! board in memory for the lifetime of the process.

use clap::Parser;
use memo_board_client::command::{self, Command};
use memo_board_client::{BoardView, MemoBoardClient, ReconcilePolicy};
use memo_board_types::{Locale, MemoStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Parser)]
#[command(name = "memo-board", about = "Post memos and threaded comments")]
struct Args {
    /// Base URL of the memo board service
    #[arg(long, env = "MEMO_BOARD_URL", default_value = memo_board_client::client::DEFAULT_URL)]
    url: String,

    /// Keep the board in memory instead of talking to the service
    #[arg(long)]
    local: bool,

    /// Timestamp locale for local mode (ko-KR, en-US)
    #[arg(long, env = "MEMO_BOARD_LOCALE", default_value = "ko-KR")]
    locale: Locale,

    /// Per-request timeout in seconds
    #[arg(long, env = "MEMO_BOARD_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    let (store, policy): (Arc<dyn MemoStore>, ReconcilePolicy) = if args.local {
        let store: Arc<dyn MemoStore> = Arc::new(MemoryStore::new(args.locale));
        (store, ReconcilePolicy::ApplyLocally)
    } else {
        match MemoBoardClient::new(&args.url, Duration::from_secs(args.timeout_secs)) {
            Ok(client) => {
                let store: Arc<dyn MemoStore> = Arc::new(client);
                (store, ReconcilePolicy::Refresh)
            }
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    };
    log::info!("Memo board using {} store", store.backend());

    let mut view = BoardView::new(store, policy);
    if let Err(e) = view.load().await {
        eprintln!("Could not load memos: {}", e);
    }
    println!("{}", view.render());
    println!("{}", command::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("Failed to read input: {}", e);
                break;
            }
        };

        let cmd = match command::parse(&line) {
            Ok(cmd) => cmd,
            Err(msg) => {
                eprintln!("{}", msg);
                continue;
            }
        };

        if let Err(e) = run_command(&mut view, cmd.clone()).await {
            eprintln!("Error: {}", e);
        }
        match cmd {
            Command::Quit => break,
            Command::Help => println!("{}", command::HELP),
            _ => println!("{}", view.render()),
        }
    }
}

async fn run_command(view: &mut BoardView, cmd: Command) -> Result<(), memo_board_types::MemoError> {
    match cmd {
        Command::Send(text) => match view.replying_to() {
            Some(memo_id) => {
                view.set_comment_draft(memo_id, text);
                view.submit_comment().await?;
            }
            None => {
                view.set_memo_draft(text);
                view.submit_memo().await?;
            }
        },
        Command::Reply(memo_id) => {
            if !view.begin_reply(memo_id) {
                eprintln!("No memo #{}", memo_id);
            }
        }
        Command::Cancel => view.cancel_reply(),
        Command::DeleteMemo(memo_id) => {
            if !view.delete_memo(memo_id).await? {
                eprintln!("Memo #{} was already gone", memo_id);
            }
        }
        Command::DeleteComment { memo_id, comment_id } => {
            if !view.delete_comment(memo_id, comment_id).await? {
                eprintln!("Comment #{} was already gone", comment_id);
            }
        }
        Command::Refresh => view.load().await?,
        Command::Help | Command::Quit => {}
    }
    Ok(())
}
