use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

use crate::audio::queue::LoopMode;

/// Longitud máxima de un nombre de playlist (coincide con el modal de creación)
pub const MAX_PLAYLIST_NAME_LEN: usize = 32;

/// Configuración persistida de un servidor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildSettings {
    pub guild_id: u64,
    pub control_channel_id: u64,
    pub panel_message_id: Option<u64>,
    pub volume: i64,
    pub loop_mode: LoopMode,
    pub shuffle: bool,
}

/// Una entrada almacenada dentro de una playlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub title: String,
    pub uri: String,
    pub source: String,
    pub duration_ms: u64,
    pub artwork_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Playlist guardada, única por (guild, usuario, nombre)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub guild_id: u64,
    pub user_id: u64,
    pub name: String,
    pub items: Vec<PlaylistItem>,
}

/// Normaliza un nombre de playlist ingresado por el usuario.
///
/// Devuelve `None` si queda vacío tras recortar espacios o si excede
/// [`MAX_PLAYLIST_NAME_LEN`].
pub fn normalize_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_PLAYLIST_NAME_LEN {
        return None;
    }
    Some(name.to_string())
}

/// Almacenamiento de documentos basado en archivos JSON.
///
/// Dos colecciones: configuraciones de servidor (clave: guild) y playlists
/// (clave: guild + usuario + nombre). Las configuraciones se cachean en
/// memoria; las playlists se leen siempre de disco.
pub struct MusicStore {
    data_dir: PathBuf,
    settings_cache: DashMap<u64, GuildSettings>,
    default_control_channel: u64,
    default_volume: i64,
}

impl MusicStore {
    pub async fn new(
        data_dir: PathBuf,
        default_control_channel: u64,
        default_volume: i64,
    ) -> Result<Self> {
        fs::create_dir_all(data_dir.join("guilds")).await?;
        fs::create_dir_all(data_dir.join("playlists")).await?;

        info!("📁 Storage inicializado en: {}", data_dir.display());

        Ok(Self {
            data_dir,
            settings_cache: DashMap::new(),
            default_control_channel,
            default_volume,
        })
    }

    // ===== Configuración de servidores =====

    /// Obtiene la configuración de un servidor, creándola si no existe
    pub async fn ensure_guild(&self, guild_id: u64) -> Result<GuildSettings> {
        if let Some(settings) = self.settings_cache.get(&guild_id) {
            return Ok(settings.clone());
        }

        match self.load_guild(guild_id).await {
            Ok(settings) => {
                self.settings_cache.insert(guild_id, settings.clone());
                Ok(settings)
            }
            Err(_) => {
                let settings = GuildSettings {
                    guild_id,
                    control_channel_id: self.default_control_channel,
                    panel_message_id: None,
                    volume: self.default_volume,
                    loop_mode: LoopMode::Off,
                    shuffle: false,
                };

                self.save_guild(&settings).await?;
                info!("📝 Configuración por defecto creada para guild {}", guild_id);
                Ok(settings)
            }
        }
    }

    /// Persiste la configuración de un servidor
    pub async fn save_guild(&self, settings: &GuildSettings) -> Result<()> {
        self.settings_cache
            .insert(settings.guild_id, settings.clone());

        let path = self.guild_path(settings.guild_id);
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&path, content).await?;
        Ok(())
    }

    // ===== Playlists =====

    /// Lista las playlists de un usuario en un servidor, ordenadas por nombre
    pub async fn list_playlists(&self, guild_id: u64, user_id: u64) -> Result<Vec<Playlist>> {
        let dir = self.user_playlist_dir(guild_id, user_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut playlists = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                match fs::read_to_string(&path).await {
                    Ok(content) => match serde_json::from_str::<Playlist>(&content) {
                        Ok(playlist) => playlists.push(playlist),
                        Err(e) => warn!("Playlist corrupta en {}: {}", path.display(), e),
                    },
                    Err(e) => warn!("Error leyendo {}: {}", path.display(), e),
                }
            }
        }

        playlists.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(playlists)
    }

    /// Obtiene una playlist concreta
    pub async fn get_playlist(
        &self,
        guild_id: u64,
        user_id: u64,
        name: &str,
    ) -> Result<Option<Playlist>> {
        let path = self.playlist_path(guild_id, user_id, name);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Crea una playlist vacía si no existe. Devuelve `false` si ya existía.
    pub async fn create_playlist(&self, guild_id: u64, user_id: u64, name: &str) -> Result<bool> {
        if self.get_playlist(guild_id, user_id, name).await?.is_some() {
            return Ok(false);
        }

        let playlist = Playlist {
            guild_id,
            user_id,
            name: name.to_string(),
            items: Vec::new(),
        };
        self.save_playlist(&playlist).await?;

        info!("📝 Playlist '{}' creada para usuario {}", name, user_id);
        Ok(true)
    }

    /// Persiste una playlist completa
    pub async fn save_playlist(&self, playlist: &Playlist) -> Result<()> {
        let dir = self.user_playlist_dir(playlist.guild_id, playlist.user_id);
        fs::create_dir_all(&dir).await?;

        let path = self.playlist_path(playlist.guild_id, playlist.user_id, &playlist.name);
        let content = serde_json::to_string_pretty(playlist)?;
        fs::write(&path, content).await?;
        Ok(())
    }

    /// Agrega una entrada a una playlist, creándola si no existe
    pub async fn append_item(
        &self,
        guild_id: u64,
        user_id: u64,
        name: &str,
        item: PlaylistItem,
    ) -> Result<()> {
        let mut playlist = self
            .get_playlist(guild_id, user_id, name)
            .await?
            .unwrap_or_else(|| Playlist {
                guild_id,
                user_id,
                name: name.to_string(),
                items: Vec::new(),
            });

        playlist.items.push(item);
        self.save_playlist(&playlist).await
    }

    /// Elimina entradas por índice. Devuelve cuántas se eliminaron, o `None`
    /// si la playlist no existe.
    ///
    /// Los índices se aplican de mayor a menor para que un borrado en lote no
    /// desplace a los que faltan por procesar.
    pub async fn delete_items(
        &self,
        guild_id: u64,
        user_id: u64,
        name: &str,
        indices: &[usize],
    ) -> Result<Option<usize>> {
        let Some(mut playlist) = self.get_playlist(guild_id, user_id, name).await? else {
            return Ok(None);
        };

        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        let mut removed = 0;
        for idx in sorted {
            if idx < playlist.items.len() {
                playlist.items.remove(idx);
                removed += 1;
            }
        }

        self.save_playlist(&playlist).await?;
        Ok(Some(removed))
    }

    /// Elimina una playlist completa. Devuelve `false` si no existía.
    pub async fn delete_playlist(&self, guild_id: u64, user_id: u64, name: &str) -> Result<bool> {
        let path = self.playlist_path(guild_id, user_id, name);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path).await?;
        info!("🗑️ Playlist '{}' eliminada para usuario {}", name, user_id);
        Ok(true)
    }

    // Métodos privados

    async fn load_guild(&self, guild_id: u64) -> Result<GuildSettings> {
        let path = self.guild_path(guild_id);
        let content = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    fn guild_path(&self, guild_id: u64) -> PathBuf {
        self.data_dir
            .join("guilds")
            .join(format!("{}.json", guild_id))
    }

    fn user_playlist_dir(&self, guild_id: u64, user_id: u64) -> PathBuf {
        self.data_dir
            .join("playlists")
            .join(guild_id.to_string())
            .join(user_id.to_string())
    }

    fn playlist_path(&self, guild_id: u64, user_id: u64, name: &str) -> PathBuf {
        // El nombre viene del usuario: se codifica para sobrevivir al filesystem
        self.user_playlist_dir(guild_id, user_id)
            .join(format!("{}.json", urlencoding::encode(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GUILD: u64 = 1;
    const USER: u64 = 2;

    async fn store() -> (tempfile::TempDir, MusicStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MusicStore::new(dir.path().to_path_buf(), 42, 50)
            .await
            .unwrap();
        (dir, store)
    }

    fn item(title: &str) -> PlaylistItem {
        PlaylistItem {
            title: title.to_string(),
            uri: format!("https://example.com/{}", title),
            source: "youtube".to_string(),
            duration_ms: 180_000,
            artwork_url: None,
            added_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_ensure_guild_creates_defaults_once() {
        let (_dir, store) = store().await;

        let settings = store.ensure_guild(GUILD).await.unwrap();
        assert_eq!(settings.control_channel_id, 42);
        assert_eq!(settings.volume, 50);
        assert_eq!(settings.loop_mode, LoopMode::Off);
        assert!(!settings.shuffle);

        let mut updated = settings.clone();
        updated.volume = 120;
        store.save_guild(&updated).await.unwrap();

        let reloaded = store.ensure_guild(GUILD).await.unwrap();
        assert_eq!(reloaded.volume, 120);
    }

    #[tokio::test]
    async fn test_create_playlist_is_idempotent() {
        let (_dir, store) = store().await;

        assert!(store.create_playlist(GUILD, USER, "mix").await.unwrap());
        store
            .append_item(GUILD, USER, "mix", item("uno"))
            .await
            .unwrap();

        // La segunda creación no debe vaciar la playlist
        assert!(!store.create_playlist(GUILD, USER, "mix").await.unwrap());
        let playlist = store.get_playlist(GUILD, USER, "mix").await.unwrap().unwrap();
        assert_eq!(playlist.items.len(), 1);
    }

    #[tokio::test]
    async fn test_append_item_creates_missing_playlist() {
        let (_dir, store) = store().await;

        store
            .append_item(GUILD, USER, "nueva", item("uno"))
            .await
            .unwrap();

        let playlist = store
            .get_playlist(GUILD, USER, "nueva")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(playlist.items.len(), 1);
        assert_eq!(playlist.items[0].title, "uno");
    }

    #[tokio::test]
    async fn test_delete_items_applies_indices_high_to_low() {
        let (_dir, store) = store().await;

        for title in ["a", "b", "c"] {
            store
                .append_item(GUILD, USER, "mix", item(title))
                .await
                .unwrap();
        }

        // El orden pedido no importa: debe quedar solo el elemento central
        let removed = store
            .delete_items(GUILD, USER, "mix", &[0, 2])
            .await
            .unwrap();
        assert_eq!(removed, Some(2));

        let playlist = store.get_playlist(GUILD, USER, "mix").await.unwrap().unwrap();
        assert_eq!(playlist.items.len(), 1);
        assert_eq!(playlist.items[0].title, "b");
    }

    #[tokio::test]
    async fn test_list_playlists_sorted_by_name() {
        let (_dir, store) = store().await;

        for name in ["zeta", "alfa", "medio"] {
            store.create_playlist(GUILD, USER, name).await.unwrap();
        }

        let names: Vec<String> = store
            .list_playlists(GUILD, USER)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["alfa", "medio", "zeta"]);
    }

    #[tokio::test]
    async fn test_delete_playlist_removes_document() {
        let (_dir, store) = store().await;

        store.create_playlist(GUILD, USER, "mix").await.unwrap();
        assert!(store.delete_playlist(GUILD, USER, "mix").await.unwrap());
        assert!(!store.delete_playlist(GUILD, USER, "mix").await.unwrap());
        assert!(store.get_playlist(GUILD, USER, "mix").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_playlist_names_survive_special_characters() {
        let (_dir, store) = store().await;

        let name = "mezcla de viaje / #1";
        store.create_playlist(GUILD, USER, name).await.unwrap();
        let playlist = store.get_playlist(GUILD, USER, name).await.unwrap().unwrap();
        assert_eq!(playlist.name, name);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  mix  "), Some("mix".to_string()));
        assert_eq!(normalize_name("   "), None);
        assert_eq!(normalize_name(&"x".repeat(33)), None);
    }
}
