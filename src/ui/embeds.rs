use lavalink_rs::model::track::TrackData;
use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::storage::{GuildSettings, Playlist};

/// Paleta de colores del bot
pub mod colors {
    use serenity::all::Colour;

    pub const PANEL_CYAN: Colour = Colour::from_rgb(0x00, 0xbc, 0xd4);
    pub const PLAYLIST_GREEN: Colour = Colour::from_rgb(0x8b, 0xc3, 0x4a);
}

const STANDARD_FOOTER: &str = "🎵 Aurora Music";

/// Proyección del estado de reproducción que consume el panel
#[derive(Debug, Clone)]
pub struct PanelView {
    pub current: Option<TrackData>,
    pub next: Option<TrackData>,
    pub position_ms: u64,
}

/// Formatea milisegundos como `h:mm:ss` a partir de una hora, `mm:ss` debajo
pub fn fmt_time(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Mención del usuario que pidió el track, si quedó registrada
fn requester_mention(track: &TrackData) -> Option<String> {
    track
        .user_data
        .as_ref()
        .and_then(|data| data.get("requester"))
        .and_then(|id| id.as_u64())
        .map(|id| format!("<@{}>", id))
}

fn track_line(track: &TrackData) -> String {
    match &track.info.uri {
        Some(uri) => format!("**{}**\n{}", track.info.title, uri),
        None => format!("**{}**", track.info.title),
    }
}

/// Embed del panel de control: pura proyección del estado.
///
/// Mismo estado, mismo embed; el renderizador lo edita en el lugar cada
/// ciclo sin acumular nada.
pub fn panel_embed(view: &PanelView, settings: &GuildSettings) -> CreateEmbed {
    let length = view
        .current
        .as_ref()
        .map(|track| track.info.length)
        .unwrap_or(0);
    let remaining = length.saturating_sub(view.position_ms);

    let description = match &view.current {
        Some(current) => {
            let mut line = format!("Sonando ahora: {}", track_line(current));
            if let Some(mention) = requester_mention(current) {
                line.push_str(&format!("\nPedida por {}", mention));
            }
            line
        }
        None => "No hay nada reproduciéndose".to_string(),
    };

    let mut embed = CreateEmbed::new()
        .colour(colors::PANEL_CYAN)
        .title("Panel de Música")
        .description(description)
        .field(
            "Tiempo",
            format!(
                "{} / {} (restante: {})",
                fmt_time(view.position_ms),
                fmt_time(length),
                fmt_time(remaining)
            ),
            true,
        )
        .field(
            "Siguiente",
            view.next
                .as_ref()
                .map(track_line)
                .unwrap_or_else(|| "—".to_string()),
            true,
        )
        .field(
            "Estado",
            format!(
                "Volumen: {}% | Shuffle: {} | Loop: {}",
                settings.volume,
                if settings.shuffle { "on" } else { "off" },
                settings.loop_mode.label()
            ),
            false,
        )
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now());

    if let Some(artwork) = view
        .current
        .as_ref()
        .and_then(|track| track.info.artwork_url.clone())
    {
        embed = embed.thumbnail(artwork);
    }

    embed
}

/// Embed de una playlist abierta
pub fn playlist_embed(playlist: &Playlist) -> CreateEmbed {
    let description = if playlist.items.is_empty() {
        "Vacía".to_string()
    } else {
        format!("{} canción(es)", playlist.items.len())
    };

    CreateEmbed::new()
        .colour(colors::PLAYLIST_GREEN)
        .title(format!("Playlist: {}", playlist.name))
        .description(description)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fmt_time_under_an_hour() {
        assert_eq!(fmt_time(0), "00:00");
        assert_eq!(fmt_time(5_000), "00:05");
        assert_eq!(fmt_time(65_000), "01:05");
        assert_eq!(fmt_time(59 * 60_000 + 59_000), "59:59");
    }

    #[test]
    fn test_fmt_time_with_hours() {
        assert_eq!(fmt_time(3_600_000), "1:00:00");
        assert_eq!(fmt_time(3_723_000), "1:02:03");
        assert_eq!(fmt_time(10 * 3_600_000), "10:00:00");
    }
}
