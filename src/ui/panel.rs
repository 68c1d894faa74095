use anyhow::Result;
use lavalink_rs::client::LavalinkClient;
use serenity::builder::{CreateMessage, EditMessage};
use serenity::model::id::{ChannelId, GuildId, MessageId};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    audio::{node, player::MusicPlayer},
    ui::{buttons, embeds},
};

/// Período de re-render del panel
pub const PANEL_UPDATE_INTERVAL: Duration = Duration::from_secs(15);

/// Garantiza que exista exactamente un panel por servidor y lo deja al día.
///
/// Si el mensaje registrado sigue vivo se edita en el lugar; si no, se envía
/// uno nuevo, se intenta fijarlo (fallar al fijar no es fatal) y se persiste
/// su id. También arranca, una sola vez por sesión, la tarea periódica de
/// refresco.
pub async fn ensure_panel(
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
    guild_id: GuildId,
) -> Result<()> {
    let mut settings = player.storage.ensure_guild(guild_id.get()).await?;
    let channel = ChannelId::new(settings.control_channel_id);

    let view = player.panel_view(lava, guild_id).await;
    let embed = embeds::panel_embed(&view, &settings);
    let rows = buttons::control_rows(&settings);

    let mut existing = None;
    if let Some(message_id) = settings.panel_message_id {
        existing = channel
            .message(&player.http, MessageId::new(message_id))
            .await
            .ok();
    }

    match existing {
        Some(mut message) => {
            if let Err(e) = message
                .edit(
                    &player.http,
                    EditMessage::new().embed(embed).components(rows),
                )
                .await
            {
                debug!("No se pudo editar el panel de {}: {}", guild_id, e);
            }
        }
        None => {
            let sent = channel
                .send_message(
                    &player.http,
                    CreateMessage::new().embed(embed).components(rows),
                )
                .await?;

            if let Err(e) = sent.pin(&player.http).await {
                debug!("No se pudo fijar el panel de {}: {}", guild_id, e);
            }

            settings.panel_message_id = Some(sent.id.get());
            player.storage.save_guild(&settings).await?;
        }
    }

    spawn_refresh_task(player, lava, guild_id, settings.control_channel_id).await;

    Ok(())
}

/// Arranca la tarea de refresco si la sesión todavía no tiene una.
///
/// El token queda guardado en la sesión: detener el player la cancela en
/// lugar de dejar un interval huérfano corriendo para siempre.
async fn spawn_refresh_task(
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
    guild_id: GuildId,
    channel_at_start: u64,
) {
    let session = player.session(guild_id);
    let mut s = session.lock().await;
    if s.panel.is_some() {
        return;
    }

    let token = CancellationToken::new();
    s.panel = Some(token.clone());
    drop(s);

    let player = player.clone();
    let lava = lava.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PANEL_UPDATE_INTERVAL);
        // El primer tick de un interval es inmediato y el panel recién se pintó
        interval.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("🧹 Refresco del panel cancelado para guild {}", guild_id);
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = refresh_tick(&player, &lava, guild_id, channel_at_start).await {
                        debug!("Tick del panel falló en guild {}: {}", guild_id, e);
                    }
                }
            }
        }
    });
}

async fn refresh_tick(
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
    guild_id: GuildId,
    channel_at_start: u64,
) -> Result<()> {
    // Sin player en el nodo no hay nada que pintar
    if lava.get_player_context(node::lava_guild(guild_id)).is_none() {
        return Ok(());
    }

    let settings = player.storage.ensure_guild(guild_id.get()).await?;

    // El canal de control cambió: este panel quedó huérfano, no lo tocamos
    if settings.control_channel_id != channel_at_start {
        return Ok(());
    }

    let Some(message_id) = settings.panel_message_id else {
        return Ok(());
    };

    let channel = ChannelId::new(settings.control_channel_id);
    let Ok(mut message) = channel
        .message(&player.http, MessageId::new(message_id))
        .await
    else {
        return Ok(());
    };

    let view = player.panel_view(lava, guild_id).await;
    let embed = embeds::panel_embed(&view, &settings);
    let rows = buttons::control_rows(&settings);

    if let Err(e) = message
        .edit(
            &player.http,
            EditMessage::new().embed(embed).components(rows),
        )
        .await
    {
        debug!("No se pudo editar el panel de {}: {}", guild_id, e);
    }

    Ok(())
}
