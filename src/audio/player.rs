use anyhow::Result;
use dashmap::DashMap;
use lavalink_rs::{
    client::LavalinkClient,
    model::{events, track::TrackData},
};
use serenity::http::Http;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    audio::{
        node,
        queue::{LoopMode, PlaybackQueue, PreviousOutcome},
    },
    storage::MusicStore,
    ui::embeds::PanelView,
};

/// Un flag de borrado olvidado expira solo, para que no cambie el sentido de
/// un click posterior sin relación
const DELETE_MODE_TTL: Duration = Duration::from_secs(60);

/// Limita el volumen al rango que acepta el nodo
pub fn clamp_volume(volume: i64) -> i64 {
    volume.clamp(1, 200)
}

/// Estado de reproducción en vivo de un servidor.
///
/// Vive solo mientras el proceso corre; se reconstruye de cero tras un
/// reinicio. El mutex que lo envuelve serializa las mutaciones del mismo
/// servidor aunque lleguen dos clicks casi simultáneos.
pub struct GuildSession {
    pub queue: PlaybackQueue,
    pub voice_channel: Option<ChannelId>,
    pub panel: Option<CancellationToken>,
}

impl GuildSession {
    fn new() -> Self {
        Self {
            queue: PlaybackQueue::new(),
            voice_channel: None,
            panel: None,
        }
    }
}

/// Orquestador de reproducción: una sesión por servidor, más los flags de
/// modo borrado por usuario.
pub struct MusicPlayer {
    pub storage: Arc<MusicStore>,
    pub http: Arc<Http>,
    sessions: DashMap<GuildId, Arc<Mutex<GuildSession>>>,
    delete_mode: DashMap<UserId, Instant>,
}

impl MusicPlayer {
    pub fn new(storage: Arc<MusicStore>, http: Arc<Http>) -> Self {
        Self {
            storage,
            http,
            sessions: DashMap::new(),
            delete_mode: DashMap::new(),
        }
    }

    /// Sesión del servidor, creada en la primera referencia
    pub fn session(&self, guild_id: GuildId) -> Arc<Mutex<GuildSession>> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(GuildSession::new())))
            .clone()
    }

    pub fn try_session(&self, guild_id: GuildId) -> Option<Arc<Mutex<GuildSession>>> {
        self.sessions.get(&guild_id).map(|s| s.clone())
    }

    /// Encola tracks y arranca la reproducción si el player está ocioso.
    ///
    /// Devuelve `false` (no-op) si no había nada que encolar.
    pub async fn enqueue_and_play(
        &self,
        lava: &LavalinkClient,
        guild_id: GuildId,
        tracks: Vec<TrackData>,
    ) -> Result<bool> {
        let session = self.session(guild_id);
        let mut s = session.lock().await;

        if !s.queue.enqueue(tracks) {
            return Ok(false);
        }

        let Some(ctx) = lava.get_player_context(node::lava_guild(guild_id)) else {
            return Ok(true);
        };

        let idle = match ctx.get_player().await {
            Ok(player) => player.track.is_none() && !player.paused,
            Err(_) => true,
        };

        if idle {
            if let Some(next) = s.queue.pop_next() {
                if let Err(e) = ctx.play(&next).await {
                    warn!("No se pudo iniciar la reproducción: {}", e);
                }
            }
        }

        Ok(true)
    }

    /// Salta al siguiente track. No-op (devuelve `false`) con la cola vacía
    /// y el loop apagado.
    pub async fn skip(&self, lava: &LavalinkClient, guild_id: GuildId) -> Result<bool> {
        let settings = self.storage.ensure_guild(guild_id.get()).await?;
        let Some(ctx) = lava.get_player_context(node::lava_guild(guild_id)) else {
            return Ok(false);
        };

        let session = self.session(guild_id);
        let mut s = session.lock().await;

        if let Some(next) = s.queue.pop_next() {
            if let Err(e) = ctx.play(&next).await {
                warn!("El nodo rechazó el salto: {}", e);
            }
            return Ok(true);
        }

        // Sin pendientes: el loop puede rellenar la cola
        let next = match settings.loop_mode {
            LoopMode::Track => s.queue.current().cloned(),
            LoopMode::Queue => s.queue.refill_from_history(),
            LoopMode::Off => None,
        };

        match next {
            Some(track) => {
                if let Err(e) = ctx.play(&track).await {
                    warn!("El nodo rechazó el salto: {}", e);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Vuelve al track anterior según [`PlaybackQueue::decide_previous`],
    /// usando la posición que reporta el nodo.
    pub async fn previous(&self, lava: &LavalinkClient, guild_id: GuildId) -> Result<()> {
        let Some(ctx) = lava.get_player_context(node::lava_guild(guild_id)) else {
            return Ok(());
        };

        let session = self.session(guild_id);
        let mut s = session.lock().await;

        let position = node::position_ms(&ctx).await;
        match s.queue.decide_previous(position) {
            PreviousOutcome::RestartCurrent => {
                if let Err(e) = ctx.set_position(Duration::ZERO).await {
                    warn!("No se pudo reiniciar el track: {}", e);
                }
            }
            PreviousOutcome::PlayPrevious(prev) => {
                if let Err(e) = ctx.play(&prev).await {
                    warn!("No se pudo reproducir el track anterior: {}", e);
                }
            }
            PreviousOutcome::Nothing => {}
        }

        Ok(())
    }

    /// Invierte el flag de shuffle. Al encenderlo se baraja la cola una sola
    /// vez; lo que se encole después va al final sin re-barajar.
    pub async fn toggle_shuffle(&self, guild_id: GuildId) -> Result<bool> {
        let mut settings = self.storage.ensure_guild(guild_id.get()).await?;
        settings.shuffle = !settings.shuffle;
        self.storage.save_guild(&settings).await?;

        if settings.shuffle {
            let session = self.session(guild_id);
            session.lock().await.queue.shuffle_pending();
        }

        Ok(settings.shuffle)
    }

    /// Alterna el modo de loop: pedir el modo activo lo apaga
    pub async fn toggle_loop(&self, guild_id: GuildId, requested: LoopMode) -> Result<LoopMode> {
        let mut settings = self.storage.ensure_guild(guild_id.get()).await?;
        settings.loop_mode = settings.loop_mode.toggled(requested);
        self.storage.save_guild(&settings).await?;
        Ok(settings.loop_mode)
    }

    /// Fija el volumen (persistido y aplicado al nodo best-effort)
    pub async fn apply_volume(
        &self,
        lava: &LavalinkClient,
        guild_id: GuildId,
        volume: i64,
    ) -> Result<i64> {
        let clamped = clamp_volume(volume);

        let mut settings = self.storage.ensure_guild(guild_id.get()).await?;
        settings.volume = clamped;
        self.storage.save_guild(&settings).await?;

        if let Some(ctx) = lava.get_player_context(node::lava_guild(guild_id)) {
            if let Err(e) = ctx.set_volume(clamped as u16).await {
                warn!("El nodo rechazó el cambio de volumen: {}", e);
            }
        }

        Ok(clamped)
    }

    /// Pausa o reanuda. Devuelve el nuevo estado de pausa.
    pub async fn toggle_pause(&self, lava: &LavalinkClient, guild_id: GuildId) -> Result<bool> {
        let Some(ctx) = lava.get_player_context(node::lava_guild(guild_id)) else {
            return Ok(false);
        };

        let paused = ctx
            .get_player()
            .await
            .map(|player| player.paused)
            .unwrap_or(false);

        if let Err(e) = ctx.set_pause(!paused).await {
            warn!("No se pudo cambiar la pausa: {}", e);
        }

        Ok(!paused)
    }

    /// Detiene todo: apaga loop y shuffle persistidos, limpia la cola,
    /// cancela el refresco del panel y cierra el player del nodo.
    pub async fn stop(&self, lava: &LavalinkClient, guild_id: GuildId) -> Result<()> {
        let mut settings = self.storage.ensure_guild(guild_id.get()).await?;
        settings.loop_mode = LoopMode::Off;
        settings.shuffle = false;
        self.storage.save_guild(&settings).await?;

        if let Some((_, session)) = self.sessions.remove(&guild_id) {
            let mut s = session.lock().await;
            if let Some(token) = s.panel.take() {
                token.cancel();
            }
            s.queue.clear();
        }

        if let Some(ctx) = lava.get_player_context(node::lava_guild(guild_id)) {
            let _ = ctx.stop_now().await;
            let _ = ctx.close();
        }

        info!("⏹️ Reproducción detenida en guild {}", guild_id);
        Ok(())
    }

    /// Track sonando ahora mismo, si hay sesión
    pub async fn current_track(&self, guild_id: GuildId) -> Option<TrackData> {
        let session = self.try_session(guild_id)?;
        let s = session.lock().await;
        s.queue.current().cloned()
    }

    /// Proyección del estado para el panel
    pub async fn panel_view(&self, lava: &LavalinkClient, guild_id: GuildId) -> PanelView {
        let (current, next) = match self.try_session(guild_id) {
            Some(session) => {
                let s = session.lock().await;
                (s.queue.current().cloned(), s.queue.next_up().cloned())
            }
            None => (None, None),
        };

        let position_ms = match lava.get_player_context(node::lava_guild(guild_id)) {
            Some(ctx) => node::position_ms(&ctx).await,
            None => 0,
        };

        PanelView {
            current,
            next,
            position_ms,
        }
    }

    // ===== Eventos del nodo =====

    /// El nodo empezó a reproducir un track: transición de historial y
    /// refresco inmediato del panel.
    pub async fn on_track_start(
        self: &Arc<Self>,
        lava: &LavalinkClient,
        event: &events::TrackStart,
    ) {
        let guild_id = GuildId::new(event.guild_id.0);
        info!(
            "▶️ Reproduciendo '{}' en guild {}",
            event.track.info.title, guild_id
        );

        {
            let session = self.session(guild_id);
            let mut s = session.lock().await;
            s.queue.note_track_started(event.track.clone());
        }

        if let Err(e) = crate::ui::panel::ensure_panel(self, lava, guild_id).await {
            warn!("No se pudo refrescar el panel: {}", e);
        }
    }

    /// Un track terminó: avanzar la cola según el modo de loop
    pub async fn on_track_end(
        self: &Arc<Self>,
        lava: &LavalinkClient,
        event: &events::TrackEnd,
    ) {
        use events::TrackEndReason;

        // Stopped/Replaced/Cleanup: lo decidió otra operación, no avanzamos
        if !matches!(
            event.reason,
            TrackEndReason::Finished | TrackEndReason::LoadFailed
        ) {
            return;
        }

        let guild_id = GuildId::new(event.guild_id.0);
        let settings = match self.storage.ensure_guild(guild_id.get()).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("No se pudo leer la configuración de {}: {}", guild_id, e);
                return;
            }
        };

        let Some(ctx) = lava.get_player_context(node::lava_guild(guild_id)) else {
            return;
        };

        let session = self.session(guild_id);
        let mut s = session.lock().await;

        if settings.loop_mode == LoopMode::Track {
            if let Some(current) = s.queue.current().cloned() {
                if let Err(e) = ctx.play(&current).await {
                    warn!("No se pudo repetir el track: {}", e);
                }
                return;
            }
        }

        if let Some(next) = s.queue.pop_next() {
            if let Err(e) = ctx.play(&next).await {
                warn!("No se pudo avanzar la cola: {}", e);
            }
            return;
        }

        if settings.loop_mode == LoopMode::Queue {
            if let Some(next) = s.queue.refill_from_history() {
                if let Err(e) = ctx.play(&next).await {
                    warn!("No se pudo reiniciar el ciclo de la cola: {}", e);
                }
                return;
            }
        }

        s.queue.take_current();
        info!("📭 Cola agotada en guild {}", guild_id);
    }

    // ===== Modo borrado =====

    /// Alterna el modo borrado del usuario. Devuelve el nuevo estado.
    pub fn toggle_delete_mode(&self, user_id: UserId) -> bool {
        if self.delete_mode_active(user_id) {
            self.delete_mode.remove(&user_id);
            false
        } else {
            self.delete_mode.insert(user_id, Instant::now());
            true
        }
    }

    /// `true` si el usuario tiene el modo borrado activo y sin expirar
    pub fn delete_mode_active(&self, user_id: UserId) -> bool {
        let expired = match self.delete_mode.get(&user_id) {
            Some(entry) => entry.elapsed() >= DELETE_MODE_TTL,
            None => return false,
        };

        if expired {
            self.delete_mode.remove(&user_id);
            false
        } else {
            true
        }
    }

    pub fn clear_delete_mode(&self, user_id: UserId) {
        self.delete_mode.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(250), 200);
        assert_eq!(clamp_volume(-10), 1);
        assert_eq!(clamp_volume(0), 1);
        assert_eq!(clamp_volume(50), 50);
        assert_eq!(clamp_volume(200), 200);
    }

    async fn player() -> (tempfile::TempDir, MusicPlayer) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            MusicStore::new(dir.path().to_path_buf(), 1, 50)
                .await
                .unwrap(),
        );
        let http = Arc::new(Http::new(""));
        (dir, MusicPlayer::new(storage, http))
    }

    #[tokio::test]
    async fn test_delete_mode_toggle() {
        let (_dir, player) = player().await;
        let user = UserId::new(7);

        assert!(!player.delete_mode_active(user));
        assert!(player.toggle_delete_mode(user));
        assert!(player.delete_mode_active(user));
        assert!(!player.toggle_delete_mode(user));
        assert!(!player.delete_mode_active(user));
    }

    #[tokio::test]
    async fn test_delete_mode_expires() {
        let (_dir, player) = player().await;
        let user = UserId::new(7);

        player
            .delete_mode
            .insert(user, Instant::now() - DELETE_MODE_TTL);
        assert!(!player.delete_mode_active(user));
        // La entrada expirada se purga
        assert!(player.delete_mode.get(&user).is_none());
    }

    #[tokio::test]
    async fn test_toggle_loop_same_mode_turns_off() {
        let (_dir, player) = player().await;
        let guild = GuildId::new(99);

        assert_eq!(
            player.toggle_loop(guild, LoopMode::Track).await.unwrap(),
            LoopMode::Track
        );
        assert_eq!(
            player.toggle_loop(guild, LoopMode::Track).await.unwrap(),
            LoopMode::Off
        );
        assert_eq!(
            player.toggle_loop(guild, LoopMode::Queue).await.unwrap(),
            LoopMode::Queue
        );
        assert_eq!(
            player.toggle_loop(guild, LoopMode::Track).await.unwrap(),
            LoopMode::Track
        );
    }

    #[tokio::test]
    async fn test_toggle_shuffle_persists_flag() {
        let (_dir, player) = player().await;
        let guild = GuildId::new(99);

        assert!(player.toggle_shuffle(guild).await.unwrap());
        let settings = player.storage.ensure_guild(guild.get()).await.unwrap();
        assert!(settings.shuffle);

        assert!(!player.toggle_shuffle(guild).await.unwrap());
        let settings = player.storage.ensure_guild(guild.get()).await.unwrap();
        assert!(!settings.shuffle);
    }
}
