use anyhow::Result;
use lavalink_rs::client::LavalinkClient;
use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage},
    model::{
        application::ComponentInteraction,
        channel::Message,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    audio::{
        node::{self, NodeLoader},
        player::MusicPlayer,
        queue::LoopMode,
        resolver,
    },
    bot::{custom_id::PanelAction, playlists},
    ui::{buttons, panel},
};

/// Maneja botones y menús de selección
pub async fn handle_component(
    ctx: &Context,
    component: &ComponentInteraction,
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
) -> Result<()> {
    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };

    info!(
        "🔘 Componente {} usado por {} en guild {}",
        component.data.custom_id, component.user.name, guild_id
    );

    if let Some(action) = PanelAction::parse(&component.data.custom_id) {
        return handle_panel_action(ctx, component, player, lava, guild_id, action).await;
    }

    if let Some(id) = crate::bot::custom_id::PlaylistId::parse(&component.data.custom_id) {
        return playlists::handle_playlist_component(ctx, component, player, lava, guild_id, id)
            .await;
    }

    Ok(())
}

async fn handle_panel_action(
    ctx: &Context,
    component: &ComponentInteraction,
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
    guild_id: GuildId,
    action: PanelAction,
) -> Result<()> {
    // Los botones del panel operan sobre una conexión de voz ya activa
    if lava
        .get_player_context(node::lava_guild(guild_id))
        .is_none()
    {
        respond_ephemeral(ctx, component, "No hay una conexión de voz activa.").await;
        return Ok(());
    }

    let settings = player.storage.ensure_guild(guild_id.get()).await?;

    match action {
        PanelAction::VolumeUp => {
            player
                .apply_volume(lava, guild_id, settings.volume + 5)
                .await?;
            acknowledge(ctx, component).await;
            repaint(player, lava, guild_id).await;
        }
        PanelAction::VolumeDown => {
            player
                .apply_volume(lava, guild_id, settings.volume - 5)
                .await?;
            acknowledge(ctx, component).await;
            repaint(player, lava, guild_id).await;
        }
        PanelAction::PauseResume => {
            player.toggle_pause(lava, guild_id).await?;
            acknowledge(ctx, component).await;
            repaint(player, lava, guild_id).await;
        }
        PanelAction::Stop => {
            player.stop(lava, guild_id).await?;
            if let Some(manager) = songbird::get(ctx).await {
                if let Err(e) = manager.remove(guild_id).await {
                    debug!("No se pudo salir del canal de voz: {}", e);
                }
            }
            acknowledge(ctx, component).await;
        }
        PanelAction::Skip | PanelAction::Next => {
            let skipped = player.skip(lava, guild_id).await?;
            if !skipped {
                debug!("Salto sin efecto en guild {} (cola vacía, loop off)", guild_id);
            }
            acknowledge(ctx, component).await;
        }
        PanelAction::Previous => {
            player.previous(lava, guild_id).await?;
            acknowledge(ctx, component).await;
        }
        PanelAction::Shuffle => {
            player.toggle_shuffle(guild_id).await?;
            acknowledge(ctx, component).await;
            repaint(player, lava, guild_id).await;
        }
        PanelAction::LoopTrack => {
            player.toggle_loop(guild_id, LoopMode::Track).await?;
            acknowledge(ctx, component).await;
            repaint(player, lava, guild_id).await;
        }
        PanelAction::LoopQueue => {
            player.toggle_loop(guild_id, LoopMode::Queue).await?;
            acknowledge(ctx, component).await;
            repaint(player, lava, guild_id).await;
        }
        PanelAction::OpenPlaylists => {
            let rows = playlists::browse_rows(player, guild_id, component.user.id).await?;
            let response = CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(format!("Playlists de <@{}>:", component.user.id.get()))
                    .components(rows),
            );
            if let Err(e) = component.create_response(&ctx.http, response).await {
                debug!("No se pudo abrir el navegador de playlists: {}", e);
            }
        }
        PanelAction::SaveCurrent => {
            let lists = player
                .storage
                .list_playlists(guild_id.get(), component.user.id.get())
                .await?;

            if lists.is_empty() {
                respond_ephemeral(
                    ctx,
                    component,
                    "No tenés playlists. Creá una desde el botón Playlists.",
                )
                .await;
                return Ok(());
            }

            let names: Vec<String> = lists.into_iter().map(|p| p.name).collect();
            let row = buttons::save_into_row(component.user.id, &names);
            let response = CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content("Elegí una playlist para guardar la canción actual:")
                    .components(vec![row]),
            );
            if let Err(e) = component.create_response(&ctx.http, response).await {
                debug!("No se pudo mostrar el selector de guardado: {}", e);
            }
        }
    }

    Ok(())
}

/// Maneja los mensajes de texto plano
pub async fn handle_message(
    ctx: &Context,
    msg: &Message,
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
    guild_id: GuildId,
    content: &str,
) -> Result<()> {
    // Comandos globales: valen desde cualquier canal
    match content {
        "playlist" => {
            let rows = playlists::browse_rows(player, guild_id, msg.author.id).await?;
            let message = CreateMessage::new()
                .content(format!("Playlists de <@{}>:", msg.author.id.get()))
                .components(rows);
            if let Err(e) = msg.channel_id.send_message(&ctx.http, message).await {
                debug!("No se pudo enviar la lista de playlists: {}", e);
            }
            return Ok(());
        }
        "!8d" | "!reset" => {
            return handle_filter_command(ctx, msg, player, lava, guild_id, content).await;
        }
        _ => {}
    }

    // Reproducción por texto: solo en el canal de control del servidor
    let settings = player.storage.ensure_guild(guild_id.get()).await?;
    if msg.channel_id.get() != settings.control_channel_id {
        return Ok(());
    }

    if let Some(notice) = connect_for_user(ctx, lava, player, guild_id, msg.author.id).await? {
        let _ = msg.reply(&ctx.http, notice).await;
        return Ok(());
    }

    let loader = NodeLoader::new(lava, guild_id);
    let Some(resolved) = resolver::resolve(&loader, content).await else {
        let _ = msg.channel_id.say(&ctx.http, "No encontré resultados.").await;
        return Ok(());
    };

    let mut tracks = resolved.into_enqueue_set();
    node::stamp_requester(&mut tracks, msg.author.id);

    if player.enqueue_and_play(lava, guild_id, tracks).await? {
        let _ = msg
            .channel_id
            .say(&ctx.http, "Pedido agregado, arranca en un momento.")
            .await;
    }

    if let Err(e) = panel::ensure_panel(player, lava, guild_id).await {
        debug!("No se pudo refrescar el panel: {}", e);
    }

    Ok(())
}

async fn handle_filter_command(
    ctx: &Context,
    msg: &Message,
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
    guild_id: GuildId,
    content: &str,
) -> Result<()> {
    if let Some(notice) = connect_for_user(ctx, lava, player, guild_id, msg.author.id).await? {
        let _ = msg.reply(&ctx.http, notice).await;
        return Ok(());
    }

    let Some(player_ctx) = lava.get_player_context(node::lava_guild(guild_id)) else {
        return Ok(());
    };

    let reply = if content == "!8d" {
        if node::apply_8d(&player_ctx).await {
            "Filtro 8D activado."
        } else {
            "No se pudo activar el filtro 8D."
        }
    } else if node::reset_filters(&player_ctx).await {
        "Filtros restablecidos."
    } else {
        "No se pudieron restablecer los filtros."
    };

    let _ = msg.reply(&ctx.http, reply).await;
    Ok(())
}

// Funciones auxiliares

/// Canal de voz donde está el usuario, según la caché del gateway
pub fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}

/// Verifica las precondiciones de voz y conecta el player si hace falta.
///
/// Devuelve `Some(aviso)` cuando la acción debe rechazarse: el usuario no
/// está en un canal de voz, o está en uno distinto al del player ya
/// conectado. Al conectar se aplica el volumen persistido del servidor.
pub async fn connect_for_user(
    ctx: &Context,
    lava: &LavalinkClient,
    player: &Arc<MusicPlayer>,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<Option<&'static str>> {
    let Some(voice_channel) = user_voice_channel(ctx, guild_id, user_id) else {
        return Ok(Some("Debes estar en un canal de voz."));
    };

    let session = player.session(guild_id);
    let mut s = session.lock().await;

    if lava
        .get_player_context(node::lava_guild(guild_id))
        .is_some()
    {
        if let Some(connected) = s.voice_channel {
            if connected != voice_channel {
                return Ok(Some("Debes estar en el mismo canal de voz que el bot."));
            }
        }
        return Ok(None);
    }

    let Some(manager) = songbird::get(ctx).await else {
        anyhow::bail!("Songbird no inicializado");
    };

    let player_ctx = node::connect(lava, &manager, guild_id, voice_channel).await?;
    s.voice_channel = Some(voice_channel);

    let settings = player.storage.ensure_guild(guild_id.get()).await?;
    if let Err(e) = player_ctx.set_volume(settings.volume as u16).await {
        debug!("No se pudo aplicar el volumen inicial: {}", e);
    }

    Ok(None)
}

pub async fn respond_ephemeral(ctx: &Context, component: &ComponentInteraction, content: &str) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    if let Err(e) = component.create_response(&ctx.http, response).await {
        debug!("No se pudo responder la interacción: {}", e);
    }
}

pub async fn acknowledge(ctx: &Context, component: &ComponentInteraction) {
    if let Err(e) = component
        .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
        .await
    {
        debug!("No se pudo confirmar la interacción: {}", e);
    }
}

async fn repaint(player: &Arc<MusicPlayer>, lava: &LavalinkClient, guild_id: GuildId) {
    if let Err(e) = panel::ensure_panel(player, lava, guild_id).await {
        debug!("No se pudo refrescar el panel: {}", e);
    }
}
