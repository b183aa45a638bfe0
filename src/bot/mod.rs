//! # Bot Module
//!
//! Discord surface for GuildTune: registers the slash commands, routes
//! interactions onto the per-guild queues of the [`QueueManager`] and
//! forwards queue events back to the text channel that started each queue.
//!
//! The bot never touches queue state directly. Every chat command maps to
//! one [`GuildQueue`](crate::audio::queue::GuildQueue) command, and any
//! [`QueueError`](crate::error::QueueError) it returns is shown to the
//! caller as an ephemeral reply.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::{audio::manager::QueueManager, config::Config, sources::YouTubeClient};

/// Handler principal de eventos de Discord
pub struct GuildTuneBot {
    config: Arc<Config>,
    /// Registro de colas por guild
    pub manager: Arc<QueueManager>,
    /// Resolución de búsquedas y URLs con yt-dlp
    pub youtube: Arc<YouTubeClient>,
    // `ready` se repite en cada reconexión del gateway
    events_started: AtomicBool,
}

impl GuildTuneBot {
    pub fn new(config: Arc<Config>, manager: Arc<QueueManager>, youtube: Arc<YouTubeClient>) -> Self {
        Self {
            config,
            manager,
            youtube,
            events_started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registra los comandos slash, por guild si `GUILD_ID` está definido
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for GuildTuneBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        if !self.events_started.swap(true, Ordering::SeqCst) {
            events::spawn_event_forwarder(ctx.http.clone(), self.manager.clone());
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command_interaction) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Destruye la cola cuando el bot es desconectado del canal de voz
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };
        info!("🔌 Bot desconectado en guild {}", guild_id);

        if let Some(queue) = self.manager.get_queue(guild_id) {
            queue.remove().await;
        }
    }
}
