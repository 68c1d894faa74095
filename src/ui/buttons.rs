use serenity::{
    all::{ButtonStyle, InputTextStyle},
    builder::{
        CreateActionRow, CreateButton, CreateInputText, CreateModal, CreateSelectMenu,
        CreateSelectMenuKind, CreateSelectMenuOption,
    },
};
use serenity::model::id::UserId;

use crate::{
    audio::queue::LoopMode,
    bot::custom_id::{PanelAction, PlaylistAction, PlaylistId},
    storage::{GuildSettings, Playlist},
};

/// Grilla de playlists: 3 filas de 5 botones más la fila de modo borrado
pub const MAX_PLAYLIST_ROWS: usize = 3;
pub const MAX_PLAYLIST_SLOTS_PER_ROW: usize = 5;

/// Máximo de opciones que Discord acepta por menú de selección
pub const MAX_MENU_OPTIONS: usize = 25;

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

fn toggle_style(active: bool) -> ButtonStyle {
    if active {
        ButtonStyle::Success
    } else {
        ButtonStyle::Secondary
    }
}

/// Filas de botones del panel de control.
///
/// El estilo de shuffle/loop refleja exactamente la configuración vigente,
/// así el panel puede re-renderizarse idempotente.
pub fn control_rows(settings: &GuildSettings) -> Vec<CreateActionRow> {
    let row1 = CreateActionRow::Buttons(vec![
        CreateButton::new(PanelAction::VolumeUp.custom_id())
            .label("Subir volumen")
            .style(ButtonStyle::Primary),
        CreateButton::new(PanelAction::VolumeDown.custom_id())
            .label("Bajar volumen")
            .style(ButtonStyle::Primary),
        CreateButton::new(PanelAction::PauseResume.custom_id())
            .label("Pausa/Reanudar")
            .style(ButtonStyle::Secondary),
        CreateButton::new(PanelAction::Stop.custom_id())
            .label("Detener")
            .style(ButtonStyle::Danger),
    ]);

    let shuffle_on = settings.shuffle;
    let loop_track = settings.loop_mode == LoopMode::Track;
    let loop_queue = settings.loop_mode == LoopMode::Queue;

    let row2 = CreateActionRow::Buttons(vec![
        CreateButton::new(PanelAction::Skip.custom_id())
            .label("Saltar")
            .style(ButtonStyle::Primary),
        CreateButton::new(PanelAction::Shuffle.custom_id())
            .label(format!("Shuffle: {}", if shuffle_on { "on" } else { "off" }))
            .style(toggle_style(shuffle_on)),
        CreateButton::new(PanelAction::LoopTrack.custom_id())
            .label(format!(
                "Loop canción: {}",
                if loop_track { "on" } else { "off" }
            ))
            .style(toggle_style(loop_track)),
        CreateButton::new(PanelAction::LoopQueue.custom_id())
            .label(format!("Loop cola: {}", if loop_queue { "on" } else { "off" }))
            .style(toggle_style(loop_queue)),
    ]);

    let row3 = CreateActionRow::Buttons(vec![
        CreateButton::new(PanelAction::OpenPlaylists.custom_id())
            .label("Playlists")
            .style(ButtonStyle::Primary),
        CreateButton::new(PanelAction::SaveCurrent.custom_id())
            .label("Guardar actual")
            .style(ButtonStyle::Secondary),
        CreateButton::new(PanelAction::Next.custom_id())
            .label("Siguiente")
            .style(ButtonStyle::Primary),
        CreateButton::new(PanelAction::Previous.custom_id())
            .label("Anterior")
            .style(ButtonStyle::Primary),
    ]);

    vec![row1, row2, row3]
}

/// Grilla de playlists de un usuario: los slots vacíos crean una nueva
pub fn playlist_grid_rows(owner: UserId, names: &[String]) -> Vec<CreateActionRow> {
    let total_slots = MAX_PLAYLIST_ROWS * MAX_PLAYLIST_SLOTS_PER_ROW;
    let filled = names.len().min(total_slots);

    let mut rows = Vec::with_capacity(MAX_PLAYLIST_ROWS + 1);
    let mut idx = 0;

    for _ in 0..MAX_PLAYLIST_ROWS {
        let mut buttons = Vec::with_capacity(MAX_PLAYLIST_SLOTS_PER_ROW);
        for _ in 0..MAX_PLAYLIST_SLOTS_PER_ROW {
            let button = if idx < filled {
                let name = &names[idx];
                CreateButton::new(
                    PlaylistId::new(owner, PlaylistAction::Open { name: name.clone() }).encode(),
                )
                .label(truncate(name, 80))
                .style(ButtonStyle::Primary)
            } else {
                // Discord exige ids únicos dentro del mensaje
                CreateButton::new(format!(
                    "{}|{}",
                    PlaylistId::new(owner, PlaylistAction::Create).encode(),
                    idx
                ))
                .label("Crear")
                .style(ButtonStyle::Secondary)
            };
            buttons.push(button);
            idx += 1;
        }
        rows.push(CreateActionRow::Buttons(buttons));
    }

    rows.push(CreateActionRow::Buttons(vec![CreateButton::new(
        PlaylistId::new(owner, PlaylistAction::ToggleDelete).encode(),
    )
    .label("Modo borrado")
    .style(ButtonStyle::Danger)]));

    rows
}

/// Fila de acciones de una playlist abierta
pub fn playlist_view_row(owner: UserId, name: &str) -> CreateActionRow {
    let name = name.to_string();
    CreateActionRow::Buttons(vec![
        CreateButton::new(PlaylistId::new(owner, PlaylistAction::Browse).encode())
            .label("Volver")
            .style(ButtonStyle::Secondary),
        CreateButton::new(
            PlaylistId::new(owner, PlaylistAction::Add { name: name.clone() }).encode(),
        )
        .label("Agregar")
        .style(ButtonStyle::Primary),
        CreateButton::new(
            PlaylistId::new(
                owner,
                PlaylistAction::DeleteItems { name: name.clone() },
            )
            .encode(),
        )
        .label("Borrar entradas")
        .style(ButtonStyle::Danger),
        CreateButton::new(PlaylistId::new(owner, PlaylistAction::Play { name }).encode())
            .label("Reproducir")
            .style(ButtonStyle::Success),
    ])
}

/// Fila para elegir en qué playlist guardar la canción actual (máximo 5)
pub fn save_into_row(owner: UserId, names: &[String]) -> CreateActionRow {
    let buttons = names
        .iter()
        .take(MAX_PLAYLIST_SLOTS_PER_ROW)
        .map(|name| {
            CreateButton::new(
                PlaylistId::new(owner, PlaylistAction::SaveInto { name: name.clone() }).encode(),
            )
            .label(truncate(name, 80))
            .style(ButtonStyle::Primary)
        })
        .collect();

    CreateActionRow::Buttons(buttons)
}

/// Menús de selección para borrar entradas, paginados de a 25 opciones.
///
/// El valor de cada opción es el índice absoluto dentro de la playlist.
pub fn delete_menu_rows(owner: UserId, playlist: &Playlist) -> Vec<CreateActionRow> {
    playlist
        .items
        .chunks(MAX_MENU_OPTIONS)
        .enumerate()
        .map(|(page, chunk)| {
            let options = chunk
                .iter()
                .enumerate()
                .map(|(offset, item)| {
                    CreateSelectMenuOption::new(
                        truncate(&item.title, 100),
                        (page * MAX_MENU_OPTIONS + offset).to_string(),
                    )
                })
                .collect();

            let menu = CreateSelectMenu::new(
                PlaylistId::new(
                    owner,
                    PlaylistAction::DeleteMenu {
                        name: playlist.name.clone(),
                        page,
                    },
                )
                .encode(),
                CreateSelectMenuKind::String { options },
            )
            .placeholder("Elegí las entradas a borrar")
            .min_values(1)
            .max_values(chunk.len() as u8);

            CreateActionRow::SelectMenu(menu)
        })
        .collect()
}

/// Modal de creación de playlist
pub fn create_modal(owner: UserId) -> CreateModal {
    let input = CreateInputText::new(InputTextStyle::Short, "Nombre de la playlist", "pl-name")
        .required(true)
        .max_length(32);

    CreateModal::new(
        PlaylistId::new(owner, PlaylistAction::ModalCreate).encode(),
        "Crear playlist",
    )
    .components(vec![CreateActionRow::InputText(input)])
}

/// Modal para agregar hasta 5 canciones a una playlist
pub fn add_modal(owner: UserId, name: &str) -> CreateModal {
    let inputs = (1..=5)
        .map(|i| {
            CreateActionRow::InputText(
                CreateInputText::new(
                    InputTextStyle::Short,
                    format!("Canción o enlace {}", i),
                    format!("song{}", i),
                )
                .required(false)
                .max_length(256),
            )
        })
        .collect();

    CreateModal::new(
        PlaylistId::new(
            owner,
            PlaylistAction::ModalAdd {
                name: name.to_string(),
            },
        )
        .encode(),
        format!("Agregar a: {}", truncate(name, 30)),
    )
    .components(inputs)
}
