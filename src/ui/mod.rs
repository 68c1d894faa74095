//! Superficie visual del bot: embeds, botones y el panel de control.

pub mod buttons;
pub mod embeds;
pub mod panel;
