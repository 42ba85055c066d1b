//! Console channel: the terminal plays the part of the chat client.

use async_trait::async_trait;
use groundbot_config::Config;
use groundbot_core::{Activity, ChannelAccount, Reply, TurnContext};
use std::io::Write;
use tracing::info;
use uuid::Uuid;

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Conversation to resume; a fresh one is started when absent
    pub conversation: Option<String>,
}

/// Prints replies to stdout.
struct ConsoleContext {
    activity: Activity,
}

impl ConsoleContext {
    fn new(conversation_id: &str, text: &str) -> Self {
        Self {
            activity: Activity::message(
                conversation_id,
                ChannelAccount::new("console").with_name("You"),
                ChannelAccount::new("groundbot"),
                text,
            ),
        }
    }
}

#[async_trait]
impl TurnContext for ConsoleContext {
    fn activity(&self) -> &Activity {
        &self.activity
    }

    async fn send_activity(&mut self, reply: Reply) -> anyhow::Result<()> {
        match reply {
            Reply::Text(text) => println!("\n{text}\n"),
            Reply::Card(card) => println!("{}\n", card.render_text()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let bot = super::build_bot(&config).await?;

        let conversation_id = input
            .conversation
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        info!("Starting conversation: {conversation_id}");

        if let Some(msg) = input.message {
            let mut ctx = ConsoleContext::new(&conversation_id, &msg);
            bot.on_turn(&mut ctx).await?;
            return Ok(());
        }

        println!("=== Conversation: {conversation_id} ===");
        println!("Type 'exit' or 'quit' to leave, '/reset' to forget the history.\n");

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim();

            match line {
                "exit" | "quit" | "q" => break,
                "" => continue,
                "/reset" => {
                    bot.reset(&conversation_id).await?;
                    println!("History cleared.\n");
                    continue;
                }
                _ => {}
            }

            let mut ctx = ConsoleContext::new(&conversation_id, line);
            if let Err(e) = bot.on_turn(&mut ctx).await {
                eprintln!("Error: {e}");
            }
        }

        println!("\nConversation ended: {conversation_id}");
        Ok(())
    }
}
