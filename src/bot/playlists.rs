use anyhow::Result;
use chrono::Utc;
use lavalink_rs::{client::LavalinkClient, model::track::TrackData};
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::{
            ActionRowComponent, ComponentInteraction, ComponentInteractionDataKind,
            ModalInteraction,
        },
        id::{GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    audio::{
        node::{self, NodeLoader},
        player::MusicPlayer,
        resolver,
    },
    bot::{
        custom_id::{PlaylistAction, PlaylistId},
        handlers,
    },
    storage::{normalize_name, PlaylistItem},
    ui::{buttons, embeds, panel},
};

/// Filas del navegador de playlists de un usuario
pub async fn browse_rows(
    player: &Arc<MusicPlayer>,
    guild_id: GuildId,
    owner: UserId,
) -> Result<Vec<serenity::builder::CreateActionRow>> {
    let names: Vec<String> = player
        .storage
        .list_playlists(guild_id.get(), owner.get())
        .await?
        .into_iter()
        .map(|playlist| playlist.name)
        .collect();

    Ok(buttons::playlist_grid_rows(owner, &names))
}

/// Maneja los componentes del espacio `pl|`
pub async fn handle_playlist_component(
    ctx: &Context,
    component: &ComponentInteraction,
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
    guild_id: GuildId,
    id: PlaylistId,
) -> Result<()> {
    // Solo el dueño de la interfaz puede operarla
    if component.user.id != id.owner {
        handlers::respond_ephemeral(ctx, component, "Esta interfaz no es tuya.").await;
        return Ok(());
    }

    let owner = id.owner;

    match id.action {
        PlaylistAction::Browse => {
            let rows = browse_rows(player, guild_id, owner).await?;
            respond_public(
                ctx,
                component,
                CreateInteractionResponseMessage::new()
                    .content(format!("Playlists de <@{}>:", owner.get()))
                    .components(rows),
            )
            .await;
        }

        PlaylistAction::Create => {
            let modal = CreateInteractionResponse::Modal(buttons::create_modal(owner));
            if let Err(e) = component.create_response(&ctx.http, modal).await {
                debug!("No se pudo abrir el modal de creación: {}", e);
            }
        }

        PlaylistAction::ToggleDelete => {
            let active = player.toggle_delete_mode(owner);
            handlers::respond_ephemeral(
                ctx,
                component,
                if active {
                    "Modo borrado: activado. El próximo click sobre una playlist la elimina."
                } else {
                    "Modo borrado: desactivado."
                },
            )
            .await;
        }

        PlaylistAction::Open { name } => {
            if player.delete_mode_active(owner) {
                let deleted = player
                    .storage
                    .delete_playlist(guild_id.get(), owner.get(), &name)
                    .await?;
                player.clear_delete_mode(owner);

                if deleted {
                    respond_public(
                        ctx,
                        component,
                        CreateInteractionResponseMessage::new()
                            .content(format!("Playlist eliminada: {}.", name)),
                    )
                    .await;
                } else {
                    handlers::respond_ephemeral(ctx, component, "La playlist no existe.").await;
                }
                return Ok(());
            }

            let Some(playlist) = player
                .storage
                .get_playlist(guild_id.get(), owner.get(), &name)
                .await?
            else {
                handlers::respond_ephemeral(ctx, component, "La playlist no existe.").await;
                return Ok(());
            };

            respond_public(
                ctx,
                component,
                CreateInteractionResponseMessage::new()
                    .embed(embeds::playlist_embed(&playlist))
                    .components(vec![buttons::playlist_view_row(owner, &playlist.name)]),
            )
            .await;
        }

        PlaylistAction::Add { name } => {
            let modal = CreateInteractionResponse::Modal(buttons::add_modal(owner, &name));
            if let Err(e) = component.create_response(&ctx.http, modal).await {
                debug!("No se pudo abrir el modal de agregado: {}", e);
            }
        }

        PlaylistAction::DeleteItems { name } => {
            let Some(playlist) = player
                .storage
                .get_playlist(guild_id.get(), owner.get(), &name)
                .await?
            else {
                handlers::respond_ephemeral(ctx, component, "La playlist no existe.").await;
                return Ok(());
            };

            if playlist.items.is_empty() {
                handlers::respond_ephemeral(ctx, component, "La playlist está vacía.").await;
                return Ok(());
            }

            let rows = buttons::delete_menu_rows(owner, &playlist);
            respond_public(
                ctx,
                component,
                CreateInteractionResponseMessage::new()
                    .content(format!("Elegí las entradas a borrar de {}:", name))
                    .components(rows),
            )
            .await;
        }

        PlaylistAction::DeleteMenu { name, .. } => {
            let values = match &component.data.kind {
                ComponentInteractionDataKind::StringSelect { values } => values.clone(),
                _ => Vec::new(),
            };
            let indices: Vec<usize> = values.iter().filter_map(|v| v.parse().ok()).collect();

            match player
                .storage
                .delete_items(guild_id.get(), owner.get(), &name, &indices)
                .await?
            {
                Some(removed) => {
                    respond_public(
                        ctx,
                        component,
                        CreateInteractionResponseMessage::new()
                            .content(format!("{} entrada(s) borradas de {}.", removed, name)),
                    )
                    .await;
                }
                None => {
                    handlers::respond_ephemeral(ctx, component, "La playlist no existe.").await;
                }
            }
        }

        PlaylistAction::Play { name } => {
            play_into_queue(ctx, component, player, lava, guild_id, owner, &name).await?;
        }

        PlaylistAction::SaveInto { name } => {
            let Some(current) = player.current_track(guild_id).await else {
                handlers::respond_ephemeral(ctx, component, "No hay ninguna canción sonando.")
                    .await;
                return Ok(());
            };

            player
                .storage
                .append_item(guild_id.get(), owner.get(), &name, item_from_track(&current))
                .await?;

            respond_public(
                ctx,
                component,
                CreateInteractionResponseMessage::new()
                    .content(format!("Canción guardada en {}.", name)),
            )
            .await;
        }

        // Los envíos de modal llegan por otro evento
        PlaylistAction::ModalCreate | PlaylistAction::ModalAdd { .. } => {}
    }

    Ok(())
}

/// Vuelca una playlist guardada a la cola de reproducción.
///
/// Cada entrada pasa por el resolver con fallback completo; acá una playlist
/// del proveedor entra entera (a diferencia del agregado, que recorta al
/// primer candidato).
async fn play_into_queue(
    ctx: &Context,
    component: &ComponentInteraction,
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
    guild_id: GuildId,
    owner: UserId,
    name: &str,
) -> Result<()> {
    let Some(playlist) = player
        .storage
        .get_playlist(guild_id.get(), owner.get(), name)
        .await?
    else {
        handlers::respond_ephemeral(ctx, component, "La playlist no existe.").await;
        return Ok(());
    };

    if playlist.items.is_empty() {
        handlers::respond_ephemeral(ctx, component, "La playlist está vacía.").await;
        return Ok(());
    }

    if let Some(notice) =
        handlers::connect_for_user(ctx, lava, player, guild_id, owner).await?
    {
        handlers::respond_ephemeral(ctx, component, notice).await;
        return Ok(());
    }

    // Resolver N entradas tarda más que la ventana de respuesta
    let defer = CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new());
    if let Err(e) = component.create_response(&ctx.http, defer).await {
        debug!("No se pudo diferir la interacción: {}", e);
    }

    let loader = NodeLoader::new(lava, guild_id);
    let mut added = 0usize;

    for item in &playlist.items {
        let query = if item.uri.is_empty() {
            item.title.clone()
        } else {
            item.uri.clone()
        };

        if let Some(resolved) = resolver::resolve(&loader, &query).await {
            let mut tracks = resolved.into_enqueue_set();
            node::stamp_requester(&mut tracks, owner);
            added += tracks.len();
            player.enqueue_and_play(lava, guild_id, tracks).await?;
        } else {
            debug!("Sin resultados para la entrada '{}'", item.title);
        }
    }

    info!(
        "📋 Playlist '{}' volcada a la cola de {} ({} tracks)",
        name, guild_id, added
    );

    let edit = EditInteractionResponse::new().content(format!(
        "Playlist {} agregada a la cola ({} tracks).",
        name, added
    ));
    if let Err(e) = component.edit_response(&ctx.http, edit).await {
        debug!("No se pudo editar la respuesta diferida: {}", e);
    }

    if let Err(e) = panel::ensure_panel(player, lava, guild_id).await {
        debug!("No se pudo refrescar el panel: {}", e);
    }

    Ok(())
}

/// Maneja los envíos de modal del espacio `pl|`
pub async fn handle_modal(
    ctx: &Context,
    modal: &ModalInteraction,
    player: &Arc<MusicPlayer>,
    lava: &LavalinkClient,
) -> Result<()> {
    let Some(guild_id) = modal.guild_id else {
        return Ok(());
    };

    let Some(id) = PlaylistId::parse(&modal.data.custom_id) else {
        return Ok(());
    };

    if modal.user.id != id.owner {
        modal_ephemeral(ctx, modal, "Esta interfaz no es tuya.").await;
        return Ok(());
    }

    let owner = id.owner;

    match id.action {
        PlaylistAction::ModalCreate => {
            let raw = input_value(modal, "pl-name").unwrap_or_default();
            let Some(name) = normalize_name(&raw) else {
                modal_ephemeral(ctx, modal, "Nombre inválido.").await;
                return Ok(());
            };

            let created = player
                .storage
                .create_playlist(guild_id.get(), owner.get(), &name)
                .await?;

            let content = if created {
                format!("Playlist creada: {}.", name)
            } else {
                format!("La playlist {} ya existía.", name)
            };
            modal_public(ctx, modal, &content).await;
        }

        PlaylistAction::ModalAdd { name } => {
            let queries: Vec<String> = (1..=5)
                .filter_map(|i| input_value(modal, &format!("song{}", i)))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect();

            if queries.is_empty() {
                modal_ephemeral(ctx, modal, "No ingresaste canciones.").await;
                return Ok(());
            }

            if player
                .storage
                .get_playlist(guild_id.get(), owner.get(), &name)
                .await?
                .is_none()
            {
                modal_ephemeral(ctx, modal, "La playlist no existe.").await;
                return Ok(());
            }

            let defer = CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new());
            if let Err(e) = modal.create_response(&ctx.http, defer).await {
                debug!("No se pudo diferir el modal: {}", e);
            }

            // Agregar guarda solo el primer candidato de cada consulta; las
            // consultas sin resultados se saltean en silencio
            let loader = NodeLoader::new(lava, guild_id);
            let mut added = 0usize;

            for query in &queries {
                let Some(resolved) = resolver::resolve(&loader, query).await else {
                    debug!("Sin resultados para '{}'", query);
                    continue;
                };

                if let Some(track) = resolved.into_first() {
                    player
                        .storage
                        .append_item(guild_id.get(), owner.get(), &name, item_from_track(&track))
                        .await?;
                    added += 1;
                }
            }

            let edit = EditInteractionResponse::new()
                .content(format!("{} canción(es) agregadas a {}.", added, name));
            if let Err(e) = modal.edit_response(&ctx.http, edit).await {
                debug!("No se pudo editar la respuesta diferida: {}", e);
            }
        }

        _ => {}
    }

    Ok(())
}

// Funciones auxiliares

fn item_from_track(track: &TrackData) -> PlaylistItem {
    PlaylistItem {
        title: track.info.title.clone(),
        uri: track.info.uri.clone().unwrap_or_default(),
        source: track.info.source_name.clone(),
        duration_ms: track.info.length,
        artwork_url: track.info.artwork_url.clone(),
        added_at: Utc::now(),
    }
}

/// Valor de un input de texto dentro del modal, si fue completado
fn input_value(modal: &ModalInteraction, custom_id: &str) -> Option<String> {
    for row in &modal.data.components {
        for component in &row.components {
            if let ActionRowComponent::InputText(input) = component {
                if input.custom_id == custom_id {
                    return input.value.clone();
                }
            }
        }
    }
    None
}

async fn respond_public(
    ctx: &Context,
    component: &ComponentInteraction,
    message: CreateInteractionResponseMessage,
) {
    let response = CreateInteractionResponse::Message(message);
    if let Err(e) = component.create_response(&ctx.http, response).await {
        debug!("No se pudo responder la interacción: {}", e);
    }
}

async fn modal_ephemeral(ctx: &Context, modal: &ModalInteraction, content: &str) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    );
    if let Err(e) = modal.create_response(&ctx.http, response).await {
        debug!("No se pudo responder el modal: {}", e);
    }
}

async fn modal_public(ctx: &Context, modal: &ModalInteraction, content: &str) {
    let response = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new().content(content),
    );
    if let Err(e) = modal.create_response(&ctx.http, response).await {
        debug!("No se pudo responder el modal: {}", e);
    }
}
