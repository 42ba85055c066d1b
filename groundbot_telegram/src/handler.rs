use crate::context::{TelegramTurnContext, account, conversation_id};
use crate::{Command, Error, Result, TelegramBot};
use groundbot_core::{Activity, ChannelAccount};
use teloxide::{
    requests::Requester,
    types::{ChatAction, Message},
};
use tracing::{error, info, warn};

const FAILURE_TEXT: &str = "Sorry, I couldn't answer that right now. Please try again.";

/// Handle bot commands
pub async fn handle_command(bot: TelegramBot, msg: Message, cmd: Command) -> Result<()> {
    let username = username(&msg);

    match cmd {
        Command::Start => {
            info!("[@{username}] Command: /start");
            bot.bot
                .send_message(msg.chat.id, bot.handler.settings().welcome_message.clone())
                .await?;
        }
        Command::Reset => {
            info!("[@{username}] Command: /reset");
            bot.handler.reset(&conversation_id(msg.chat.id)).await?;
            bot.bot
                .send_message(msg.chat.id, "Conversation history cleared.")
                .await?;
        }
        Command::Help => {
            info!("[@{username}] Command: /help");
            bot.bot
                .send_message(msg.chat.id, Command::help_text())
                .await?;
        }
    }

    Ok(())
}

/// Handle any message (member joins, commands or regular text)
pub async fn handle_message(bot: TelegramBot, me: ChannelAccount, msg: Message) -> Result<()> {
    let chat_id = msg.chat.id;
    if !bot.is_allowed(chat_id.0) {
        warn!("Rejected message from chat {chat_id}");
        return Err(Error::Unauthorized(chat_id.0));
    }

    let from = msg
        .from
        .as_ref()
        .map_or_else(|| ChannelAccount::new(chat_id.0.to_string()), account);

    if let Some(members) = msg.new_chat_members() {
        let activity = Activity::members_added(
            conversation_id(chat_id),
            from,
            me,
            members.iter().map(account).collect(),
        );
        let mut ctx = TelegramTurnContext::new(bot.bot.clone(), chat_id, activity);
        bot.handler.on_turn(&mut ctx).await?;
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    if let Some(cmd) = Command::parse_from_text(text) {
        return handle_command(bot, msg, cmd).await;
    }

    let username = username(&msg);

    bot.bot
        .send_chat_action(chat_id, ChatAction::Typing)
        .await?;

    let activity = Activity::message(conversation_id(chat_id), from, me, text);
    let mut ctx = TelegramTurnContext::new(bot.bot.clone(), chat_id, activity);

    if let Err(e) = bot.handler.on_turn(&mut ctx).await {
        error!("[@{username}] Turn failed: {e}");
        bot.bot.send_message(chat_id, FAILURE_TEXT).await?;
        return Err(e.into());
    }

    Ok(())
}

fn username(msg: &Message) -> &str {
    msg.from
        .as_ref()
        .and_then(|u| u.username.as_deref())
        .unwrap_or("unknown")
}
