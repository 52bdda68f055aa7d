//! Line commands for the terminal board.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: a new memo, or a comment while in reply mode.
    Send(String),
    Reply(i64),
    Cancel,
    DeleteMemo(i64),
    DeleteComment { memo_id: i64, comment_id: i64 },
    Refresh,
    Help,
    Quit,
}

pub const HELP: &str = "\
Type text and press Enter to post a memo (or a comment while replying).
  /reply <memoId>                 reply to a memo
  /cancel                         leave reply mode
  /del <memoId>                   delete a memo and its comments
  /delc <memoId> <commentId>      delete a comment
  /refresh                        reload the board
  /help                           show this help
  /quit                           exit";

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Ok(Command::Send(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or("");
    let args: Vec<&str> = parts.collect();

    match (name, args.as_slice()) {
        ("reply" | "r", [id]) => Ok(Command::Reply(parse_id(id)?)),
        ("cancel" | "c", []) => Ok(Command::Cancel),
        ("del" | "d", [id]) => Ok(Command::DeleteMemo(parse_id(id)?)),
        ("delc" | "dc", [memo, comment]) => Ok(Command::DeleteComment {
            memo_id: parse_id(memo)?,
            comment_id: parse_id(comment)?,
        }),
        ("refresh" | "list", []) => Ok(Command::Refresh),
        ("help" | "h" | "?", _) => Ok(Command::Help),
        ("quit" | "q" | "exit", []) => Ok(Command::Quit),
        ("reply" | "r" | "del" | "d" | "delc" | "dc" | "cancel" | "c" | "refresh" | "list" | "quit"
        | "q" | "exit", _) => Err(format!("Wrong arguments for /{} (try /help)", name)),
        _ => Err(format!("Unknown command: /{} (try /help)", name)),
    }
}

fn parse_id(raw: &str) -> Result<i64, String> {
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| format!("Not an id: {}", raw))
}
