//! # Bot Module
//!
//! Discord-facing layer of Aurora Music.
//!
//! This module routes every inbound event to the playback engine:
//! - Button presses and select menus on the control panel and the playlist
//!   browser ([`handlers`], [`playlists`])
//! - Modal submissions (playlist creation, bulk add)
//! - Plain text messages in the configured control channel (play queries)
//!   plus a small allow-list of global commands
//!
//! Custom ids travel as a closed enum ([`custom_id`]) so dispatch is an
//! exhaustive match instead of string-prefix branching.
//!
//! The shared state ([`MusicPlayer`], the Lavalink client) is inserted into
//! serenity's TypeMap after the client is built and fetched here per event.

use serenity::{
    all::{Context, EventHandler, Interaction, Message, Ready},
    async_trait,
    prelude::TypeMapKey,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod custom_id;
pub mod handlers;
pub mod playlists;

use crate::{audio::player::MusicPlayer, config::Config};
use lavalink_rs::client::LavalinkClient;

/// Clave del TypeMap para el orquestador de reproducción
pub struct PlayerKey;

impl TypeMapKey for PlayerKey {
    type Value = Arc<MusicPlayer>;
}

/// Clave del TypeMap para el cliente del nodo Lavalink
pub struct LavalinkKey;

impl TypeMapKey for LavalinkKey {
    type Value = LavalinkClient;
}

/// Handler principal de eventos de Discord
pub struct AuroraBot {
    config: Arc<Config>,
}

impl AuroraBot {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    async fn shared(&self, ctx: &Context) -> Option<(Arc<MusicPlayer>, LavalinkClient)> {
        let data = ctx.data.read().await;
        let player = data.get::<PlayerKey>()?.clone();
        let lava = data.get::<LavalinkKey>()?.clone();
        Some((player, lava))
    }
}

#[async_trait]
impl EventHandler for AuroraBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
        info!("🎛️ Canal de control: {}", self.config.control_channel_id);
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some((player, lava)) = self.shared(&ctx).await else {
            warn!("⚠️ Estado compartido sin inicializar, interacción descartada");
            return;
        };

        match interaction {
            Interaction::Component(component) => {
                if let Err(e) =
                    handlers::handle_component(&ctx, &component, &player, &lava).await
                {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            Interaction::Modal(modal) => {
                if let Err(e) = playlists::handle_modal(&ctx, &modal, &player, &lava).await {
                    error!("Error manejando modal: {:?}", e);
                }
            }
            _ => {}
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let content = msg.content.trim().to_string();
        if content.is_empty() {
            return;
        }

        let Some((player, lava)) = self.shared(&ctx).await else {
            return;
        };

        if let Err(e) =
            handlers::handle_message(&ctx, &msg, &player, &lava, guild_id, &content).await
        {
            error!("Error manejando mensaje: {:?}", e);
        }
    }
}
