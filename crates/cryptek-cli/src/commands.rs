//! Parsing of interactive input lines.

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/create <address> [name...]`
    Create {
        participant: String,
        name: Option<String>,
    },
    /// `/join <chatId>`
    Join(String),
    /// `/select <chatId>`
    Select(String),
    /// `/chats`
    Chats,
    /// `/public <text...>`: unencrypted message to the selected chat.
    Public(String),
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Plain text: encrypted message to the selected chat.
    Message(String),
    /// Blank line.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
commands:
  /create <address> [name]  create a chat with another address
  /join <chatId>            join an existing chat
  /select <chatId>          choose the chat plain lines are sent to
  /chats                    list known chats
  /public <text>            send an unencrypted message
  /quit                     disconnect and exit
  <text>                    send an encrypted message to the selected chat";

impl Command {
    pub fn parse(line: &str) -> Result<Command, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Empty);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Message(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match name {
            "create" => {
                let (participant, chat_name) = match args.split_once(char::is_whitespace) {
                    Some((participant, chat_name)) => (participant, Some(chat_name.trim())),
                    None => (args, None),
                };
                if participant.is_empty() {
                    return Err(CommandError::Usage("/create <address> [name]"));
                }
                Ok(Command::Create {
                    participant: participant.to_string(),
                    name: chat_name.filter(|n| !n.is_empty()).map(str::to_string),
                })
            }
            "join" => single_arg(args, "/join <chatId>").map(Command::Join),
            "select" => single_arg(args, "/select <chatId>").map(Command::Select),
            "public" if !args.is_empty() => Ok(Command::Public(args.to_string())),
            "public" => Err(CommandError::Usage("/public <text>")),
            "chats" => Ok(Command::Chats),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn single_arg(args: &str, usage: &'static str) -> Result<String, CommandError> {
    if args.is_empty() || args.contains(char::is_whitespace) {
        return Err(CommandError::Usage(usage));
    }
    Ok(args.to_string())
}
