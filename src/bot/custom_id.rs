//! Wire format de los custom ids de la interfaz.
//!
//! Dos espacios de nombres: `ctl:` para los botones del panel (sin dueño) y
//! `pl|` para la interfaz de playlists, que lleva el dueño y argumentos
//! separados por `|`. Los nombres de playlist pueden contener cualquier
//! caracter, así que viajan percent-encoded para sobrevivir al delimitador.

use serenity::model::id::UserId;

/// Botones del panel de control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    VolumeUp,
    VolumeDown,
    PauseResume,
    Stop,
    Skip,
    Shuffle,
    LoopTrack,
    LoopQueue,
    Next,
    Previous,
    OpenPlaylists,
    SaveCurrent,
}

impl PanelAction {
    pub fn custom_id(&self) -> &'static str {
        match self {
            PanelAction::VolumeUp => "ctl:volUp",
            PanelAction::VolumeDown => "ctl:volDown",
            PanelAction::PauseResume => "ctl:pause",
            PanelAction::Stop => "ctl:stop",
            PanelAction::Skip => "ctl:skip",
            PanelAction::Shuffle => "ctl:shuffle",
            PanelAction::LoopTrack => "ctl:loopTrack",
            PanelAction::LoopQueue => "ctl:loopQueue",
            PanelAction::Next => "ctl:next",
            PanelAction::Previous => "ctl:prev",
            PanelAction::OpenPlaylists => "ctl:playlist",
            PanelAction::SaveCurrent => "ctl:save",
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        match custom_id {
            "ctl:volUp" => Some(PanelAction::VolumeUp),
            "ctl:volDown" => Some(PanelAction::VolumeDown),
            "ctl:pause" => Some(PanelAction::PauseResume),
            "ctl:stop" => Some(PanelAction::Stop),
            "ctl:skip" => Some(PanelAction::Skip),
            "ctl:shuffle" => Some(PanelAction::Shuffle),
            "ctl:loopTrack" => Some(PanelAction::LoopTrack),
            "ctl:loopQueue" => Some(PanelAction::LoopQueue),
            "ctl:next" => Some(PanelAction::Next),
            "ctl:prev" => Some(PanelAction::Previous),
            "ctl:playlist" => Some(PanelAction::OpenPlaylists),
            "ctl:save" => Some(PanelAction::SaveCurrent),
            _ => None,
        }
    }
}

/// Acciones de la interfaz de playlists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistAction {
    /// Volver a la lista de playlists del dueño
    Browse,
    /// Abrir el modal de creación
    Create,
    ToggleDelete,
    /// Abrir una playlist (o borrarla, con el modo borrado activo)
    Open { name: String },
    /// Abrir el modal de agregado
    Add { name: String },
    /// Mostrar los menús de borrado de entradas
    DeleteItems { name: String },
    Play { name: String },
    SaveInto { name: String },
    /// Página de un menú de borrado (25 opciones por página)
    DeleteMenu { name: String, page: usize },
    /// Envío del modal de creación
    ModalCreate,
    /// Envío del modal de agregado
    ModalAdd { name: String },
}

/// Custom id completo de la interfaz de playlists: acción + dueño
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistId {
    pub owner: UserId,
    pub action: PlaylistAction,
}

impl PlaylistId {
    pub fn new(owner: UserId, action: PlaylistAction) -> Self {
        Self { owner, action }
    }

    pub fn encode(&self) -> String {
        let owner = self.owner.get();
        let enc = |name: &str| urlencoding::encode(name).into_owned();

        match &self.action {
            PlaylistAction::Browse => format!("pl|back|{}", owner),
            PlaylistAction::Create => format!("pl|create|{}", owner),
            PlaylistAction::ToggleDelete => format!("pl|toggleDelete|{}", owner),
            PlaylistAction::Open { name } => format!("pl|open|{}|{}", owner, enc(name)),
            PlaylistAction::Add { name } => format!("pl|add|{}|{}", owner, enc(name)),
            PlaylistAction::DeleteItems { name } => format!("pl|del|{}|{}", owner, enc(name)),
            PlaylistAction::Play { name } => format!("pl|play|{}|{}", owner, enc(name)),
            PlaylistAction::SaveInto { name } => format!("pl|saveInto|{}|{}", owner, enc(name)),
            PlaylistAction::DeleteMenu { name, page } => {
                format!("pl|delMenu|{}|{}|{}", owner, enc(name), page)
            }
            PlaylistAction::ModalCreate => format!("pl|modalCreate|{}", owner),
            PlaylistAction::ModalAdd { name } => format!("pl|modalAdd|{}|{}", owner, enc(name)),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let parts: Vec<&str> = custom_id.split('|').collect();
        if parts.len() < 3 || parts[0] != "pl" {
            return None;
        }

        let owner_raw: u64 = parts[2].parse().ok()?;
        if owner_raw == 0 {
            return None;
        }
        let owner = UserId::new(owner_raw);

        let name_at = |idx: usize| -> Option<String> {
            parts
                .get(idx)
                .and_then(|raw| urlencoding::decode(raw).ok())
                .map(|cow| cow.into_owned())
        };

        let action = match parts[1] {
            "back" => PlaylistAction::Browse,
            "create" => PlaylistAction::Create,
            "toggleDelete" => PlaylistAction::ToggleDelete,
            "open" => PlaylistAction::Open { name: name_at(3)? },
            "add" => PlaylistAction::Add { name: name_at(3)? },
            "del" => PlaylistAction::DeleteItems { name: name_at(3)? },
            "play" => PlaylistAction::Play { name: name_at(3)? },
            "saveInto" => PlaylistAction::SaveInto { name: name_at(3)? },
            "delMenu" => PlaylistAction::DeleteMenu {
                name: name_at(3)?,
                page: parts.get(4)?.parse().ok()?,
            },
            "modalCreate" => PlaylistAction::ModalCreate,
            "modalAdd" => PlaylistAction::ModalAdd { name: name_at(3)? },
            _ => return None,
        };

        Some(Self { owner, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn owner() -> UserId {
        UserId::new(123456789)
    }

    #[test]
    fn test_panel_actions_roundtrip() {
        let actions = [
            PanelAction::VolumeUp,
            PanelAction::VolumeDown,
            PanelAction::PauseResume,
            PanelAction::Stop,
            PanelAction::Skip,
            PanelAction::Shuffle,
            PanelAction::LoopTrack,
            PanelAction::LoopQueue,
            PanelAction::Next,
            PanelAction::Previous,
            PanelAction::OpenPlaylists,
            PanelAction::SaveCurrent,
        ];

        for action in actions {
            assert_eq!(PanelAction::parse(action.custom_id()), Some(action));
        }
        assert_eq!(PanelAction::parse("ctl:desconocido"), None);
        assert_eq!(PanelAction::parse("pl|open|1|x"), None);
    }

    #[test]
    fn test_playlist_ids_roundtrip() {
        let cases = [
            PlaylistAction::Browse,
            PlaylistAction::Create,
            PlaylistAction::ToggleDelete,
            PlaylistAction::Open {
                name: "mi mix".to_string(),
            },
            PlaylistAction::Add {
                name: "mi mix".to_string(),
            },
            PlaylistAction::DeleteItems {
                name: "mi mix".to_string(),
            },
            PlaylistAction::Play {
                name: "mi mix".to_string(),
            },
            PlaylistAction::SaveInto {
                name: "mi mix".to_string(),
            },
            PlaylistAction::DeleteMenu {
                name: "mi mix".to_string(),
                page: 3,
            },
            PlaylistAction::ModalCreate,
            PlaylistAction::ModalAdd {
                name: "mi mix".to_string(),
            },
        ];

        for action in cases {
            let id = PlaylistId::new(owner(), action.clone());
            assert_eq!(PlaylistId::parse(&id.encode()), Some(id));
        }
    }

    #[test]
    fn test_names_with_delimiters_survive() {
        let action = PlaylistAction::Open {
            name: "rock | viaje / ñandú #1".to_string(),
        };
        let id = PlaylistId::new(owner(), action);

        let encoded = id.encode();
        // El delimitador del nombre no debe partir el id
        assert_eq!(encoded.matches('|').count(), 3);
        assert_eq!(PlaylistId::parse(&encoded), Some(id));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(PlaylistId::parse("ctl:volUp"), None);
        assert_eq!(PlaylistId::parse("pl|open"), None);
        assert_eq!(PlaylistId::parse("pl|inventado|123"), None);
        assert_eq!(PlaylistId::parse("pl|open|abc|nombre"), None);
        assert_eq!(PlaylistId::parse("pl|open|0|nombre"), None);
        assert_eq!(PlaylistId::parse("pl|delMenu|123|nombre|no-num"), None);
    }
}
