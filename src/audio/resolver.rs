use anyhow::Result;
use async_trait::async_trait;
use lavalink_rs::model::track::TrackData;
use tracing::debug;

/// Fuentes de búsqueda del nodo, en orden fijo de prioridad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    YouTube,
    YouTubeMusic,
    SoundCloud,
    Spotify,
    YandexMusic,
    AppleMusic,
}

impl SearchSource {
    /// Orden de fallback: se prueba cada fuente hasta la primera con resultados
    pub const FALLBACK_ORDER: [SearchSource; 6] = [
        SearchSource::YouTube,
        SearchSource::YouTubeMusic,
        SearchSource::SoundCloud,
        SearchSource::Spotify,
        SearchSource::YandexMusic,
        SearchSource::AppleMusic,
    ];

    /// Prefijo que el nodo Lavalink entiende para esta fuente
    pub fn prefix(&self) -> &'static str {
        match self {
            SearchSource::YouTube => "ytsearch",
            SearchSource::YouTubeMusic => "ytmsearch",
            SearchSource::SoundCloud => "scsearch",
            SearchSource::Spotify => "spsearch",
            SearchSource::YandexMusic => "ymsearch",
            SearchSource::AppleMusic => "amsearch",
        }
    }
}

/// Resultado no vacío de una búsqueda en el nodo
#[derive(Debug, Clone)]
pub struct ResolvedTracks {
    pub tracks: Vec<TrackData>,
    /// `true` si el proveedor devolvió una playlist completa (no una lista
    /// de coincidencias de búsqueda)
    pub is_playlist: bool,
}

impl ResolvedTracks {
    /// Primer candidato, para contextos que guardan una sola entrada
    pub fn into_first(mut self) -> Option<TrackData> {
        if self.tracks.is_empty() {
            None
        } else {
            Some(self.tracks.remove(0))
        }
    }

    /// Tracks a encolar: una playlist del proveedor entra completa, una
    /// búsqueda de texto aporta solo su primera coincidencia
    pub fn into_enqueue_set(mut self) -> Vec<TrackData> {
        if self.is_playlist {
            self.tracks
        } else {
            self.tracks.truncate(1);
            self.tracks
        }
    }
}

/// Frontera mínima hacia la carga de tracks del nodo de audio.
///
/// `Ok(None)` significa "sin resultados"; `Err` significa que la llamada al
/// proveedor falló (timeout, respuesta malformada). Ninguno de los dos corta
/// la secuencia de fallback.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackLoader: Send + Sync {
    async fn load(&self, query: &str) -> Result<Option<ResolvedTracks>>;
}

/// `true` solo para URLs absolutas http/https (un prefijo `ytsearch:` también
/// parsea como URL, de ahí el chequeo de scheme)
pub fn is_absolute_url(query: &str) -> bool {
    match url::Url::parse(query) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Resuelve una consulta libre o URL a un conjunto de tracks.
///
/// Un enlace directo se intenta primero sin fuente, para que un proveedor de
/// texto no lo reinterprete. Después se recorre [`SearchSource::FALLBACK_ORDER`]
/// y gana la primera fuente con resultados; no se mezclan resultados de
/// varias fuentes.
pub async fn resolve(loader: &dyn TrackLoader, query: &str) -> Option<ResolvedTracks> {
    if is_absolute_url(query) {
        match loader.load(query).await {
            Ok(Some(resolved)) => return Some(resolved),
            Ok(None) => {}
            Err(e) => debug!("Carga directa falló para '{}': {}", query, e),
        }
    }

    for source in SearchSource::FALLBACK_ORDER {
        let scoped = format!("{}:{}", source.prefix(), query);
        match loader.load(&scoped).await {
            Ok(Some(resolved)) => {
                debug!("🔎 '{}' resuelto vía {}", query, source.prefix());
                return Some(resolved);
            }
            Ok(None) => {}
            Err(e) => debug!("Fuente {} falló: {}", source.prefix(), e),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::queue::test_support::track;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    fn found(ids: &[&str], is_playlist: bool) -> Option<ResolvedTracks> {
        Some(ResolvedTracks {
            tracks: ids.iter().map(|id| track(id)).collect(),
            is_playlist,
        })
    }

    #[tokio::test]
    async fn test_stops_at_first_provider_with_results() {
        let mut loader = MockTrackLoader::new();
        let mut seq = Sequence::new();

        loader
            .expect_load()
            .withf(|q| q == "ytsearch:luces de neón")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        loader
            .expect_load()
            .withf(|q| q == "ytmsearch:luces de neón")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(found(&["hit"], false)));
        // Sin expectativas para scsearch y posteriores: una llamada extra
        // haría fallar el mock

        let resolved = resolve(&loader, "luces de neón").await.unwrap();
        assert_eq!(resolved.tracks.len(), 1);
        assert_eq!(resolved.tracks[0].info.identifier, "hit");
    }

    #[tokio::test]
    async fn test_direct_url_short_circuits_search() {
        let mut loader = MockTrackLoader::new();

        loader
            .expect_load()
            .withf(|q| q == "https://example.com/watch?v=abc")
            .times(1)
            .returning(|_| Ok(found(&["directo"], false)));

        let resolved = resolve(&loader, "https://example.com/watch?v=abc")
            .await
            .unwrap();
        assert_eq!(resolved.tracks[0].info.identifier, "directo");
    }

    #[tokio::test]
    async fn test_empty_direct_lookup_falls_back_to_sources() {
        let mut loader = MockTrackLoader::new();
        let mut seq = Sequence::new();

        loader
            .expect_load()
            .withf(|q| q == "https://example.com/muerto")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        loader
            .expect_load()
            .withf(|q| q == "ytsearch:https://example.com/muerto")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(found(&["rescate"], false)));

        let resolved = resolve(&loader, "https://example.com/muerto").await.unwrap();
        assert_eq!(resolved.tracks[0].info.identifier, "rescate");
    }

    #[tokio::test]
    async fn test_provider_error_does_not_abort_fallback() {
        let mut loader = MockTrackLoader::new();
        let mut seq = Sequence::new();

        loader
            .expect_load()
            .withf(|q| q.starts_with("ytsearch:"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(anyhow::anyhow!("timeout")));
        loader
            .expect_load()
            .withf(|q| q.starts_with("ytmsearch:"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(found(&["sobrevive"], false)));

        let resolved = resolve(&loader, "algo").await.unwrap();
        assert_eq!(resolved.tracks[0].info.identifier, "sobrevive");
    }

    #[tokio::test]
    async fn test_exhausted_fallback_returns_none() {
        let mut loader = MockTrackLoader::new();

        loader
            .expect_load()
            .times(SearchSource::FALLBACK_ORDER.len())
            .returning(|_| Ok(None));

        assert!(resolve(&loader, "nada de nada").await.is_none());
    }

    #[test]
    fn test_enqueue_set_policy() {
        // Una playlist del proveedor entra completa
        let playlist = found(&["a", "b", "c"], true).unwrap();
        assert_eq!(playlist.into_enqueue_set().len(), 3);

        // Una búsqueda de texto aporta solo la primera coincidencia
        let search = found(&["a", "b", "c"], false).unwrap();
        let set = search.into_enqueue_set();
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].info.identifier, "a");
    }

    #[test]
    fn test_first_candidate_policy_truncates_playlists() {
        // El mismo resultado multi-track: guardar en playlist toma solo el
        // primero, aunque el proveedor haya devuelto una playlist entera
        let multi = found(&["a", "b", "c"], true).unwrap();
        assert_eq!(multi.into_first().unwrap().info.identifier, "a");

        let empty = ResolvedTracks {
            tracks: vec![],
            is_playlist: false,
        };
        assert!(empty.into_first().is_none());
    }

    #[test]
    fn test_url_detection() {
        assert!(is_absolute_url("https://youtu.be/abc"));
        assert!(is_absolute_url("http://example.com"));
        assert!(!is_absolute_url("ytsearch:algo"));
        assert!(!is_absolute_url("luces de neón"));
    }
}
