use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info, warn};

mod audio;
mod bot;
mod config;
mod health;
mod storage;
mod ui;

use crate::audio::{node, player::MusicPlayer};
use crate::bot::{AuroraBot, LavalinkKey, PlayerKey};
use crate::config::Config;
use crate::storage::MusicStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aurora_music=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?)
                .add_directive("lavalink_rs=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Aurora Music v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("{}", config.summary());

    // Almacenamiento de documentos: si no arranca, no arranca el bot
    let storage = Arc::new(
        MusicStore::new(
            config.data_dir.clone(),
            config.control_channel_id,
            config.default_volume,
        )
        .await?,
    );

    // Keepalive HTTP en segundo plano
    let health_port = config.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::serve(health_port).await {
            warn!("Servidor keepalive caído: {:?}", e);
        }
    });

    // Intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = AuroraBot::new(config.clone());

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird()
        .await?;

    // El nodo necesita el id del bot para identificarse
    let user_id = client.http.get_current_user().await?.id;

    let player = Arc::new(MusicPlayer::new(storage.clone(), client.http.clone()));

    let lavalink = node::build_client(&config, user_id, player.clone()).await;

    {
        let mut data = client.data.write().await;
        data.insert::<PlayerKey>(player);
        data.insert::<LavalinkKey>(lavalink);
    }

    // Shutdown por Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Error al registrar Ctrl+C");
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        std::process::exit(0);
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
