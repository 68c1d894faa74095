use anyhow::{Context as _, Result};
use async_trait::async_trait;
use lavalink_rs::{
    client::LavalinkClient,
    hook,
    model::{
        events,
        player::{ConnectionInfo, Filters, Rotation},
        track::{TrackData, TrackLoadData},
    },
    node::NodeBuilder,
    player_context::PlayerContext,
    prelude::NodeDistributionStrategy,
};
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    audio::{
        player::MusicPlayer,
        resolver::{ResolvedTracks, TrackLoader},
    },
    config::Config,
};

/// Convierte un id de guild de serenity al modelo del nodo
pub fn lava_guild(guild_id: GuildId) -> lavalink_rs::model::GuildId {
    lavalink_rs::model::GuildId(guild_id.get())
}

/// Construye el cliente Lavalink con los hooks de eventos del bot.
///
/// El [`MusicPlayer`] viaja como dato del cliente para que los hooks (que
/// solo reciben el cliente) alcancen el estado por servidor.
pub async fn build_client(
    config: &Config,
    user_id: UserId,
    player: Arc<MusicPlayer>,
) -> LavalinkClient {
    let events = events::Events {
        ready: Some(ready_event),
        track_start: Some(track_start_event),
        track_end: Some(track_end_event),
        ..Default::default()
    };

    let node = NodeBuilder {
        hostname: format!("{}:{}", config.lavalink_host, config.lavalink_port),
        is_ssl: config.lavalink_ssl,
        events: events::Events::default(),
        password: config.lavalink_password.clone(),
        user_id: lavalink_rs::model::UserId(user_id.get()),
        session_id: None,
    };

    info!(
        "🎼 Conectando a Lavalink en {}:{}",
        config.lavalink_host, config.lavalink_port
    );

    LavalinkClient::new_with_data(
        events,
        vec![node],
        NodeDistributionStrategy::round_robin(),
        player,
    )
    .await
}

#[hook]
async fn ready_event(_client: LavalinkClient, session_id: String, _event: &events::Ready) {
    info!("✅ Nodo Lavalink listo (sesión {})", session_id);
}

#[hook]
async fn track_start_event(client: LavalinkClient, _session_id: String, event: &events::TrackStart) {
    let Ok(player) = client.data::<MusicPlayer>() else {
        return;
    };
    player.on_track_start(&client, event).await;
}

#[hook]
async fn track_end_event(client: LavalinkClient, _session_id: String, event: &events::TrackEnd) {
    let Ok(player) = client.data::<MusicPlayer>() else {
        return;
    };
    player.on_track_end(&client, event).await;
}

/// Conecta el player de un servidor a un canal de voz.
///
/// Songbird negocia el gateway de voz con Discord y el resultado se entrega
/// al nodo, que es quien transmite el audio.
pub async fn connect(
    lava: &LavalinkClient,
    songbird: &songbird::Songbird,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<PlayerContext> {
    let (connection_info, _call) = songbird
        .join_gateway(guild_id, channel_id)
        .await
        .context("No se pudo unir al canal de voz")?;

    let player = lava
        .create_player_context(
            lava_guild(guild_id),
            ConnectionInfo {
                endpoint: connection_info.endpoint,
                token: connection_info.token,
                session_id: connection_info.session_id,
            },
        )
        .await
        .context("No se pudo crear el player en el nodo")?;

    info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
    Ok(player)
}

/// Posición actual del track en milisegundos; `0` si el nodo no responde
pub async fn position_ms(ctx: &PlayerContext) -> u64 {
    match ctx.get_player().await {
        Ok(player) => player.state.position,
        Err(e) => {
            debug!("No se pudo leer la posición del player: {}", e);
            0
        }
    }
}

/// Activa el filtro 8D (rotación lenta). Best-effort.
pub async fn apply_8d(ctx: &PlayerContext) -> bool {
    let filters = Filters {
        rotation: Some(Rotation {
            rotation_hz: Some(0.2),
        }),
        ..Default::default()
    };

    match ctx.set_filters(filters).await {
        Ok(_) => true,
        Err(e) => {
            warn!("No se pudo aplicar el filtro 8D: {}", e);
            false
        }
    }
}

/// Remueve todos los filtros del player. Best-effort.
pub async fn reset_filters(ctx: &PlayerContext) -> bool {
    match ctx.set_filters(Filters::default()).await {
        Ok(_) => true,
        Err(e) => {
            warn!("No se pudieron limpiar los filtros: {}", e);
            false
        }
    }
}

/// Marca quién pidió cada track (atribución en el panel y las playlists)
pub fn stamp_requester(tracks: &mut [TrackData], user_id: UserId) {
    for track in tracks {
        track.user_data = Some(serde_json::json!({ "requester": user_id.get() }));
    }
}

/// [`TrackLoader`] real: delega cada consulta en el endpoint de carga del nodo
pub struct NodeLoader {
    lava: LavalinkClient,
    guild_id: u64,
}

impl NodeLoader {
    pub fn new(lava: &LavalinkClient, guild_id: GuildId) -> Self {
        Self {
            lava: lava.clone(),
            guild_id: guild_id.get(),
        }
    }
}

#[async_trait]
impl TrackLoader for NodeLoader {
    async fn load(&self, query: &str) -> Result<Option<ResolvedTracks>> {
        let loaded = self
            .lava
            .load_tracks(lavalink_rs::model::GuildId(self.guild_id), query)
            .await
            .context("Fallo la carga de tracks en el nodo")?;

        match loaded.data {
            Some(TrackLoadData::Track(track)) => Ok(Some(ResolvedTracks {
                tracks: vec![track],
                is_playlist: false,
            })),
            Some(TrackLoadData::Search(tracks)) if !tracks.is_empty() => Ok(Some(ResolvedTracks {
                tracks,
                is_playlist: false,
            })),
            Some(TrackLoadData::Playlist(playlist)) if !playlist.tracks.is_empty() => {
                Ok(Some(ResolvedTracks {
                    tracks: playlist.tracks,
                    is_playlist: true,
                }))
            }
            Some(TrackLoadData::Error(e)) => Err(anyhow::anyhow!(
                "El nodo reportó un error de carga: {:?}",
                e
            )),
            _ => Ok(None),
        }
    }
}
