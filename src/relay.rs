use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, error, info};

use crate::routing::{ChannelId, RoutingTable};

/// Platform user snowflake.
pub type UserId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAuthor {
    pub id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// A chat message as seen by the relay, decoupled from the client library's types.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub author: MessageAuthor,
    pub channel_id: ChannelId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Attachment URLs in upload order
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// Embed payload posted to every target channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedEmbed {
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub color: u32,
    pub author_name: String,
    pub author_icon_url: Option<String>,
    pub field: Option<EmbedField>,
}

impl ForwardedEmbed {
    pub fn from_message(message: &InboundMessage, color: u32) -> Self {
        let field = if message.attachments.is_empty() {
            None
        } else {
            Some(EmbedField {
                name: "Attachments".to_string(),
                value: message.attachments.join("\n"),
            })
        };

        Self {
            description: message.content.clone(),
            timestamp: message.created_at,
            color,
            author_name: message.author.display_name.clone(),
            author_icon_url: message.author.avatar_url.clone(),
            field,
        }
    }
}

/// The chat platform operations the relay needs.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    type Channel: Send + Sync;

    /// Look up a channel by id; `None` if it is deleted or not visible to the bot.
    async fn resolve_channel(&self, id: ChannelId) -> Option<Self::Channel>;

    async fn send_embed(&self, channel: &Self::Channel, embed: &ForwardedEmbed) -> Result<()>;
}

/// Whether `content` contains an http(s) URL anywhere.
pub fn contains_link(content: &str) -> bool {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"https?://\S+").expect("link pattern is valid"))
        .is_match(content)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnMessage,
    UnmappedChannel,
    NoLink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Ignored(IgnoreReason),
    /// Per-target results, each list in attempt order.
    Forwarded {
        delivered: Vec<ChannelId>,
        failed: Vec<ChannelId>,
    },
}

/// Filters inbound messages and fans link messages out to their target channels.
pub struct Relay {
    routes: RoutingTable,
    bot_user_id: UserId,
    embed_color: u32,
}

impl Relay {
    pub fn new(routes: RoutingTable, bot_user_id: UserId, embed_color: u32) -> Self {
        Self {
            routes,
            bot_user_id,
            embed_color,
        }
    }

    pub async fn handle_message<G: ChatGateway>(
        &self,
        gateway: &G,
        message: &InboundMessage,
    ) -> RelayOutcome {
        // Must run first, before anything else about the message is inspected.
        if message.author.id == self.bot_user_id {
            return RelayOutcome::Ignored(IgnoreReason::OwnMessage);
        }

        let targets = match self.routes.targets(message.channel_id) {
            Some(targets) => targets,
            None => return RelayOutcome::Ignored(IgnoreReason::UnmappedChannel),
        };

        if !contains_link(&message.content) {
            return RelayOutcome::Ignored(IgnoreReason::NoLink);
        }

        let preview: String = message.content.chars().take(50).collect();
        info!(
            "Link message detected in source channel {}: {}...",
            message.channel_id, preview
        );

        let embed = ForwardedEmbed::from_message(message, self.embed_color);
        let mut delivered = Vec::new();
        let mut failed = Vec::new();

        for &target in targets {
            let Some(channel) = gateway.resolve_channel(target).await else {
                error!("Target channel {} not found", target);
                failed.push(target);
                continue;
            };

            match gateway.send_embed(&channel, &embed).await {
                Ok(()) => {
                    info!("Message forwarded to target channel {}", target);
                    delivered.push(target);
                }
                Err(e) => {
                    error!("Failed to forward message to target channel {}: {:#}", target, e);
                    failed.push(target);
                }
            }
        }

        debug!(
            delivered = delivered.len(),
            failed = failed.len(),
            "fan-out finished"
        );

        RelayOutcome::Forwarded { delivered, failed }
    }
}
