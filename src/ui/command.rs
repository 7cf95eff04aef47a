use crate::config::{is_known_model, Settings, KNOWN_MODELS};

/// Slash commands understood by the prompt. Anything else is chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetApiKey(String),
    SetModel(String),
    SetDeveloperMessage(String),
    Clear,
    Health,
    Help,
    Quit,
}

pub const HELP_TEXT: &str = "/key <api-key>  /model <name>  /system <prompt>  /clear  /health  /quit";

/// Parses `input` as a slash command. `None` means it is a chat message;
/// `Some(Err(..))` is a malformed command with a message for the status line.
pub fn parse_command(input: &str) -> Option<Result<Command, String>> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix('/')?;
    let (name, argument) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    let command = match name {
        "key" => require_argument(name, argument).map(Command::SetApiKey),
        "model" => require_argument(name, argument).and_then(|model| {
            if is_known_model(&model) {
                Ok(Command::SetModel(model))
            } else {
                Err(format!(
                    "unknown model '{model}'; choose one of {}",
                    KNOWN_MODELS.join(", ")
                ))
            }
        }),
        "system" => require_argument(name, argument).map(Command::SetDeveloperMessage),
        "clear" => Ok(Command::Clear),
        "health" => Ok(Command::Health),
        "help" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '/{other}'; {HELP_TEXT}")),
    };
    Some(command)
}

impl Command {
    /// Settings produced by a settings command, as a full replacement record.
    pub fn updated_settings(&self, current: &Settings) -> Option<Settings> {
        let mut next = current.clone();
        match self {
            Self::SetApiKey(key) => next.api_key = key.clone(),
            Self::SetModel(model) => next.model = model.clone(),
            Self::SetDeveloperMessage(message) => next.developer_message = message.clone(),
            Self::Clear | Self::Health | Self::Help | Self::Quit => return None,
        }
        Some(next)
    }
}

fn require_argument(name: &str, argument: &str) -> Result<String, String> {
    if argument.is_empty() {
        Err(format!("/{name} needs a value"))
    } else {
        Ok(argument.to_string())
    }
}
