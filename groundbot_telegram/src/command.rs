use teloxide::types::BotCommand;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Reset,
    Help,
}

impl Command {
    #[must_use]
    pub fn bot_commands() -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", "Start talking to the bot"),
            BotCommand::new("reset", "Forget this chat's history"),
            BotCommand::new("help", "Show available commands"),
        ]
    }

    /// Parse a leading command, ignoring any `@botname` suffix and arguments.
    #[must_use]
    pub fn parse_from_text(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.to_lowercase();
        let word = word.split('@').next().unwrap_or_default();

        match word {
            "/start" => Some(Self::Start),
            "/reset" => Some(Self::Reset),
            "/help" => Some(Self::Help),
            _ => None,
        }
    }

    #[must_use]
    pub const fn help_text() -> &'static str {
        r"
groundbot

Commands:
/start - Show the welcome message
/reset - Forget this chat's history
/help  - Show this help

Send any message to ask a question. Answers cite the documents they come from.
"
    }
}
