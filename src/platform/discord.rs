use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::all::{
    ChannelId as DiscordChannelId, Client, Context, CreateEmbed, CreateEmbedAuthor,
    CreateMessage, EventHandler, GatewayIntents, Http, Message, Ready, Timestamp,
};
use tracing::{debug, info};

use crate::relay::{
    ChatGateway, ForwardedEmbed, InboundMessage, MessageAuthor, Relay, RelayOutcome, UserId,
};
use crate::routing::ChannelId;

/// Gateway intents needed to read message content in guild channels.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Ask the HTTP API who the token belongs to, before any events are received.
pub async fn current_user(token: &str) -> Result<(UserId, String)> {
    let http = Http::new(token);
    let user = http
        .get_current_user()
        .await
        .context("Failed to fetch the bot user for this token")?;
    Ok((user.id.get(), user.name.clone()))
}

/// Run the Discord platform until the gateway connection ends
pub async fn run(token: &str, relay: Relay) -> Result<()> {
    let handler = RelayHandler { relay };

    let mut client = Client::builder(token, intents())
        .event_handler(handler)
        .await
        .context("Failed to create Discord client")?;

    info!("Starting Discord platform...");
    client
        .start()
        .await
        .context("Discord client stopped with an error")?;

    Ok(())
}

struct RelayHandler {
    relay: Relay,
}

#[serenity::async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.name);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let inbound = inbound_message(&msg);
        let gateway = DiscordGateway { ctx };
        if let RelayOutcome::Forwarded { delivered, failed } =
            self.relay.handle_message(&gateway, &inbound).await
        {
            debug!(
                message_id = %msg.id,
                delivered = ?delivered,
                failed = ?failed,
                "message relayed"
            );
        }
    }
}

/// Guild nickname, then global name, then username.
fn display_name(msg: &Message) -> String {
    msg.member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .unwrap_or_else(|| msg.author.display_name().to_string())
}

fn inbound_message(msg: &Message) -> InboundMessage {
    InboundMessage {
        author: MessageAuthor {
            id: msg.author.id.get(),
            display_name: display_name(msg),
            avatar_url: msg.author.avatar_url(),
        },
        channel_id: msg.channel_id.get(),
        content: msg.content.clone(),
        created_at: *msg.timestamp,
        attachments: msg.attachments.iter().map(|a| a.url.clone()).collect(),
    }
}

fn render_embed(embed: &ForwardedEmbed) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new(&embed.author_name);
    if let Some(icon_url) = &embed.author_icon_url {
        author = author.icon_url(icon_url);
    }

    let mut rendered = CreateEmbed::new()
        .description(&embed.description)
        .timestamp(Timestamp::from(embed.timestamp))
        .colour(embed.color)
        .author(author);

    if let Some(field) = &embed.field {
        rendered = rendered.field(&field.name, &field.value, true);
    }

    rendered
}

/// Live serenity context for the duration of one message event.
struct DiscordGateway {
    ctx: Context,
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    type Channel = DiscordChannelId;

    async fn resolve_channel(&self, id: ChannelId) -> Option<DiscordChannelId> {
        match DiscordChannelId::new(id).to_channel(&self.ctx).await {
            Ok(channel) => Some(channel.id()),
            Err(e) => {
                debug!(channel_id = id, error = %e, "channel lookup failed");
                None
            }
        }
    }

    async fn send_embed(&self, channel: &DiscordChannelId, embed: &ForwardedEmbed) -> Result<()> {
        let message = CreateMessage::new().embed(render_embed(embed));
        channel
            .send_message(&self.ctx, message)
            .await
            .with_context(|| format!("Discord rejected message to channel {}", channel))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::EmbedField;
    use chrono::{DateTime, TimeZone, Utc};

    fn embed(field: Option<EmbedField>, icon: Option<&str>) -> ForwardedEmbed {
        ForwardedEmbed {
            description: "Check out this link: https://example.com".to_string(),
            timestamp: Utc.with_ymd_and_hms(2023, 4, 10, 12, 0, 0).unwrap(),
            color: 0x3498db,
            author_name: "Test User".to_string(),
            author_icon_url: icon.map(str::to_string),
            field,
        }
    }

    #[test]
    fn test_intents_include_message_content() {
        assert!(intents().contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(intents().contains(GatewayIntents::GUILD_MESSAGES));
    }

    #[test]
    fn test_timestamp_conversion_keeps_milliseconds() {
        let discord = Timestamp::parse("2023-04-10T12:00:00.789Z").unwrap();
        let created_at: DateTime<Utc> = *discord;
        assert_eq!(created_at.timestamp_subsec_millis(), 789);
        assert_eq!(*Timestamp::from(created_at), created_at);
    }

    #[test]
    fn test_render_embed_keeps_sub_second_timestamp() {
        let mut forwarded = embed(None, None);
        forwarded.timestamp = Utc.timestamp_millis_opt(1_681_128_000_789).unwrap();
        let json = serde_json::to_value(render_embed(&forwarded)).unwrap();

        let rendered = DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).unwrap();
        assert_eq!(rendered.with_timezone(&Utc), forwarded.timestamp);
    }

    #[test]
    fn test_render_embed_with_author_icon_and_attachments() {
        let rendered = render_embed(&embed(
            Some(EmbedField {
                name: "Attachments".to_string(),
                value: "https://example.com/a.pdf\nhttps://example.com/b.png".to_string(),
            }),
            Some("https://example.com/avatar.png"),
        ));
        let json = serde_json::to_value(&rendered).unwrap();

        assert_eq!(json["description"], "Check out this link: https://example.com");
        assert_eq!(json["author"]["name"], "Test User");
        assert_eq!(json["author"]["icon_url"], "https://example.com/avatar.png");
        assert_eq!(json["fields"][0]["name"], "Attachments");
        assert_eq!(
            json["fields"][0]["value"],
            "https://example.com/a.pdf\nhttps://example.com/b.png"
        );
        assert_eq!(json["fields"][0]["inline"], true);
    }

    #[test]
    fn test_render_embed_without_optional_parts() {
        let json = serde_json::to_value(render_embed(&embed(None, None))).unwrap();
        assert_eq!(json["author"]["name"], "Test User");
        assert!(json["author"].get("icon_url").map_or(true, |v| v.is_null()));
        assert!(json
            .get("fields")
            .and_then(|f| f.as_array())
            .map_or(true, |f| f.is_empty()));
    }
}
