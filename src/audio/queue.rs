use lavalink_rs::model::track::TrackData;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Máximo de tracks retenidos en el historial de un servidor
pub const MAX_HISTORY: usize = 50;

/// Umbral de "scrub": si la posición supera esto, `anterior` reinicia el
/// track actual en lugar de retroceder en el historial
pub const PREVIOUS_THRESHOLD_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    Off,
    Track,
    Queue,
}

impl LoopMode {
    /// Semántica de toggle: pedir el modo ya activo lo apaga
    pub fn toggled(self, requested: LoopMode) -> LoopMode {
        if self == requested {
            LoopMode::Off
        } else {
            requested
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoopMode::Off => "off",
            LoopMode::Track => "track",
            LoopMode::Queue => "queue",
        }
    }
}

/// Resultado de pedir el track anterior
#[derive(Debug, Clone)]
pub enum PreviousOutcome {
    /// Reiniciar el track actual desde cero
    RestartCurrent,
    /// Reproducir esta entrada del historial desde cero
    PlayPrevious(TrackData),
    /// Nada sonando y sin historial
    Nothing,
}

/// Cola de reproducción de un servidor: track actual, pendientes e historial.
///
/// Estructura pura en memoria; quien la muta decide qué mandarle al nodo de
/// audio. El historial se alimenta en la transición de track (evento de
/// inicio), no al encolar.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    current: Option<TrackData>,
    pending: VecDeque<TrackData>,
    history: Vec<TrackData>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega tracks al final de la cola. Devuelve `false` si no había nada
    /// que agregar.
    pub fn enqueue(&mut self, tracks: Vec<TrackData>) -> bool {
        if tracks.is_empty() {
            return false;
        }

        info!("➕ {} track(s) agregados a la cola", tracks.len());
        self.pending.extend(tracks);
        true
    }

    /// Saca el siguiente track pendiente
    pub fn pop_next(&mut self) -> Option<TrackData> {
        self.pending.pop_front()
    }

    /// Devuelve un track al frente de la cola (usado por `anterior`)
    pub fn push_front(&mut self, track: TrackData) {
        self.pending.push_front(track);
    }

    pub fn current(&self) -> Option<&TrackData> {
        self.current.as_ref()
    }

    /// El próximo track sin sacarlo de la cola
    pub fn next_up(&self) -> Option<&TrackData> {
        self.pending.front()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Registra que el nodo comenzó a reproducir `track`.
    ///
    /// El track que estaba sonando pasa al historial; el historial se
    /// recorta a [`MAX_HISTORY`] descartando lo más viejo.
    pub fn note_track_started(&mut self, track: TrackData) {
        if let Some(previous) = self.current.replace(track) {
            self.push_history(previous);
        }
    }

    /// Retira el track actual sin tocar el historial.
    ///
    /// Usado por `anterior`: el actual vuelve al frente de la cola, así que
    /// no debe duplicarse en el historial cuando arranque el reemplazo.
    pub fn take_current(&mut self) -> Option<TrackData> {
        self.current.take()
    }

    /// Saca la entrada más reciente del historial
    pub fn pop_history(&mut self) -> Option<TrackData> {
        self.history.pop()
    }

    /// Decide qué hacer ante un "anterior" con el track en `position_ms`.
    ///
    /// Pasado el umbral de scrub se reinicia el actual (gesto de "volver al
    /// inicio", no un retroceso real). Si no, sale la entrada más reciente
    /// del historial y el actual vuelve al frente de la cola; sin historial,
    /// también se reinicia el actual.
    pub fn decide_previous(&mut self, position_ms: u64) -> PreviousOutcome {
        if position_ms > PREVIOUS_THRESHOLD_MS && self.current.is_some() {
            return PreviousOutcome::RestartCurrent;
        }

        if let Some(prev) = self.pop_history() {
            if let Some(current) = self.take_current() {
                self.push_front(current);
            }
            return PreviousOutcome::PlayPrevious(prev);
        }

        if self.current.is_some() {
            PreviousOutcome::RestartCurrent
        } else {
            PreviousOutcome::Nothing
        }
    }

    /// Reencola el historial completo (lo más viejo primero) y devuelve el
    /// primer track a reproducir. Usado cuando termina la cola con loop de
    /// cola activo; el track que acaba de terminar cierra el ciclo.
    pub fn refill_from_history(&mut self) -> Option<TrackData> {
        if let Some(ended) = self.current.take() {
            self.push_history(ended);
        }

        if self.history.is_empty() {
            return None;
        }

        info!("🔁 Reencolando {} track(s) del historial", self.history.len());
        self.pending.extend(self.history.drain(..));
        self.pop_next()
    }

    fn push_history(&mut self, track: TrackData) {
        self.history.push(track);
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
    }

    /// Permuta los pendientes en el momento del toggle (Fisher–Yates).
    ///
    /// Es un evento puntual: los tracks agregados después van al final sin
    /// re-barajar.
    pub fn shuffle_pending(&mut self) {
        if self.pending.len() > 1 {
            let mut rng = rand::thread_rng();
            self.pending.make_contiguous().shuffle(&mut rng);
            debug!("🔀 Cola barajada ({} pendientes)", self.pending.len());
        }
    }

    /// Descarta todo el estado de reproducción
    pub fn clear(&mut self) {
        self.current = None;
        self.pending.clear();
        self.history.clear();
        info!("🗑️ Cola limpiada");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use lavalink_rs::model::track::{TrackData, TrackInfo};

    /// Construye un TrackData mínimo para pruebas
    pub fn track(id: &str) -> TrackData {
        TrackData {
            encoded: id.to_string(),
            info: TrackInfo {
                identifier: id.to_string(),
                is_seekable: true,
                author: "artista".to_string(),
                length: 240_000,
                is_stream: false,
                position: 0,
                title: format!("Track {}", id),
                uri: Some(format!("https://example.com/{}", id)),
                artwork_url: None,
                isrc: None,
                source_name: "youtube".to_string(),
            },
            plugin_info: None,
            user_data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::track;
    use super::*;
    use pretty_assertions::assert_eq;

    fn pending_ids(queue: &PlaybackQueue) -> Vec<String> {
        queue
            .pending
            .iter()
            .map(|t| t.info.identifier.clone())
            .collect()
    }

    #[test]
    fn test_enqueue_empty_is_noop() {
        let mut queue = PlaybackQueue::new();
        assert!(!queue.enqueue(vec![]));
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_enqueue_preserves_order() {
        let mut queue = PlaybackQueue::new();
        assert!(queue.enqueue(vec![track("t1"), track("t2")]));

        assert_eq!(queue.pop_next().unwrap().info.identifier, "t1");
        assert_eq!(queue.next_up().unwrap().info.identifier, "t2");
    }

    #[test]
    fn test_history_grows_on_transition_not_on_enqueue() {
        let mut queue = PlaybackQueue::new();
        queue.enqueue(vec![track("a"), track("b")]);
        assert_eq!(queue.history_len(), 0);

        queue.note_track_started(track("a"));
        // Primer track: no había nada sonando, el historial sigue vacío
        assert_eq!(queue.history_len(), 0);

        queue.note_track_started(track("b"));
        assert_eq!(queue.history_len(), 1);
        assert_eq!(queue.current().unwrap().info.identifier, "b");
    }

    #[test]
    fn test_history_is_capped() {
        let mut queue = PlaybackQueue::new();
        for i in 0..=MAX_HISTORY + 5 {
            queue.note_track_started(track(&format!("t{}", i)));
        }

        assert_eq!(queue.history_len(), MAX_HISTORY);
        // Lo más viejo se descartó
        assert_eq!(queue.history[0].info.identifier, "t5");
        assert_eq!(
            queue.pop_history().unwrap().info.identifier,
            format!("t{}", MAX_HISTORY + 4)
        );
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut queue = PlaybackQueue::new();
        queue.enqueue(vec![
            track("1"),
            track("2"),
            track("3"),
            track("4"),
            track("5"),
        ]);

        queue.shuffle_pending();

        let mut after = pending_ids(&queue);
        after.sort();
        assert_eq!(after, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(queue.pending_len(), 5);
    }

    #[test]
    fn test_refill_from_history_plays_oldest_first() {
        let mut queue = PlaybackQueue::new();
        // Historial [A, B, C] con cola vacía y nada sonando
        for id in ["a", "b", "c", "x"] {
            queue.note_track_started(track(id));
        }
        queue.take_current();
        assert_eq!(queue.history_len(), 3);
        assert!(!queue.has_pending());

        let next = queue.refill_from_history().unwrap();
        assert_eq!(next.info.identifier, "a");
        assert_eq!(pending_ids(&queue), vec!["b", "c"]);
        assert_eq!(queue.history_len(), 0);
    }

    #[test]
    fn test_refill_includes_the_track_that_just_ended() {
        let mut queue = PlaybackQueue::new();
        for id in ["a", "b", "c"] {
            queue.note_track_started(track(id));
        }
        // "c" sigue como actual: acaba de terminar, cierra el ciclo
        let next = queue.refill_from_history().unwrap();
        assert_eq!(next.info.identifier, "a");
        assert_eq!(pending_ids(&queue), vec!["b", "c"]);
    }

    #[test]
    fn test_refill_from_history_empty_returns_none() {
        let mut queue = PlaybackQueue::new();
        assert!(queue.refill_from_history().is_none());
    }

    #[test]
    fn test_push_front_goes_before_pending() {
        let mut queue = PlaybackQueue::new();
        queue.enqueue(vec![track("b")]);
        queue.push_front(track("a"));

        assert_eq!(pending_ids(&queue), vec!["a", "b"]);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut queue = PlaybackQueue::new();
        queue.enqueue(vec![track("a"), track("b")]);
        queue.note_track_started(track("x"));
        queue.note_track_started(track("y"));

        queue.clear();
        assert!(queue.current().is_none());
        assert!(!queue.has_pending());
        assert_eq!(queue.history_len(), 0);
    }

    #[test]
    fn test_previous_past_threshold_restarts_current() {
        let mut queue = PlaybackQueue::new();
        // Historial no vacío y un track de 4 minutos sonando
        for id in ["a", "b", "actual"] {
            queue.note_track_started(track(id));
        }

        // A los 5 segundos, "anterior" vuelve al inicio del actual
        assert!(matches!(
            queue.decide_previous(5_000),
            PreviousOutcome::RestartCurrent
        ));
        assert_eq!(queue.history_len(), 2);
        assert_eq!(queue.current().unwrap().info.identifier, "actual");
    }

    #[test]
    fn test_previous_under_threshold_pops_history() {
        let mut queue = PlaybackQueue::new();
        for id in ["a", "b", "actual"] {
            queue.note_track_started(track(id));
        }

        // A 1 segundo sale "b" del historial y "actual" vuelve al frente
        match queue.decide_previous(1_000) {
            PreviousOutcome::PlayPrevious(prev) => {
                assert_eq!(prev.info.identifier, "b")
            }
            other => panic!("resultado inesperado: {:?}", other),
        }
        assert_eq!(queue.next_up().unwrap().info.identifier, "actual");
        assert_eq!(queue.history_len(), 1);
        assert!(queue.current().is_none());
    }

    #[test]
    fn test_previous_with_empty_history_restarts_current() {
        let mut queue = PlaybackQueue::new();
        queue.note_track_started(track("actual"));

        assert!(matches!(
            queue.decide_previous(1_000),
            PreviousOutcome::RestartCurrent
        ));
    }

    #[test]
    fn test_previous_with_nothing_is_noop() {
        let mut queue = PlaybackQueue::new();
        assert!(matches!(
            queue.decide_previous(0),
            PreviousOutcome::Nothing
        ));
    }

    #[test]
    fn test_loop_mode_toggle_semantics() {
        assert_eq!(LoopMode::Off.toggled(LoopMode::Track), LoopMode::Track);
        assert_eq!(LoopMode::Track.toggled(LoopMode::Track), LoopMode::Off);
        assert_eq!(LoopMode::Track.toggled(LoopMode::Queue), LoopMode::Queue);
        assert_eq!(LoopMode::Queue.toggled(LoopMode::Queue), LoopMode::Off);
    }
}
