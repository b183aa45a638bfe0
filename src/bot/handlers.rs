use anyhow::Result;
use serenity::{
    builder::{
        CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
        EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::{GuildQueue, RepeatMode},
        transport::{SongbirdTransport, Transport},
    },
    bot::GuildTuneBot,
    error::QueueError,
    ui::embeds,
};

/// Respuesta de un comando de cola
enum Reply {
    Text(String),
    Embed(CreateEmbed),
}

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &GuildTuneBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    if command.data.name == "play" {
        return handle_play(ctx, &command, bot, guild_id).await;
    }

    let Some(queue) = bot.manager.get_queue(guild_id) else {
        return respond_error(ctx, &command, "No hay nada reproduciéndose actualmente").await;
    };

    match run_queue_command(&command, &queue).await {
        Ok(reply) => respond(ctx, &command, reply).await,
        Err(e) => {
            if e.is_internal() {
                error!("❌ /{} falló en guild {}: {:?}", command.data.name, guild_id, e);
            } else {
                debug!("/{} rechazado en guild {}: {}", command.data.name, guild_id, e.code());
            }
            respond_error(ctx, &command, &e.to_string()).await
        }
    }
}

async fn run_queue_command(
    command: &CommandInteraction,
    queue: &GuildQueue,
) -> crate::error::Result<Reply> {
    let reply = match command.data.name.as_str() {
        "pause" => {
            queue.pause().await?;
            Reply::Text("⏸️ Reproducción pausada".to_string())
        }
        "resume" => {
            queue.resume().await?;
            Reply::Text("▶️ Reproducción reanudada".to_string())
        }
        "skip" => {
            let next = queue.skip().await?;
            Reply::Text(format!("⏭️ Saltando a **{}**", next.name))
        }
        "previous" => {
            let previous = queue.previous().await?;
            Reply::Text(format!("⏮️ Volviendo a **{}**", previous.name))
        }
        "jump" => {
            let position = int_option(command, "position").unwrap_or(0);
            let song = queue.jump(position).await?;
            Reply::Text(format!("⤵️ Saltando a **{}**", song.name))
        }
        "shuffle" => {
            queue.shuffle().await?;
            Reply::Text("🔀 Próximas canciones mezcladas".to_string())
        }
        "repeat" => {
            let mode = str_option(command, "mode")
                .map(str::parse::<RepeatMode>)
                .transpose()?;
            let mode = queue.set_repeat_mode(mode).await?;
            let icon = match mode {
                RepeatMode::Disabled => "➡️",
                RepeatMode::Song => "🔂",
                RepeatMode::Queue => "🔁",
            };
            Reply::Text(format!("{} Repetición: {}", icon, mode))
        }
        "autoplay" => {
            let enabled = queue.toggle_autoplay().await?;
            Reply::Text(if enabled {
                "📻 Autoplay activado".to_string()
            } else {
                "📻 Autoplay desactivado".to_string()
            })
        }
        "seek" => {
            // Sin valor se rechaza igual que un número no finito
            let seconds = number_option(command, "seconds").unwrap_or(f64::NAN);
            queue.seek(seconds).await?;
            Reply::Text(format!("⏩ Posición: {}", queue.formatted_current_time().await))
        }
        "volume" => match int_option(command, "level") {
            Some(level) => {
                let volume = queue.set_volume(level as f32 / 100.0).await?;
                Reply::Text(format!("🔊 Volumen ajustado a {}%", (volume * 100.0).round() as u32))
            }
            None => Reply::Text(format!(
                "🔊 Volumen actual: {}%",
                (queue.volume() * 100.0).round() as u32
            )),
        },
        "queue" => {
            let page = int_option(command, "page").unwrap_or(1).max(1) as usize;
            Reply::Embed(embeds::create_queue_embed(queue, page))
        }
        "nowplaying" => {
            let song = queue.current_song().ok_or(QueueError::NoPlayingSong)?;
            let position = queue.formatted_current_time().await;
            Reply::Embed(embeds::create_now_playing_embed(&song, Some(&position)))
        }
        "stop" => {
            queue.stop().await?;
            Reply::Text("⏹️ Reproducción detenida y cola eliminada".to_string())
        }
        _ => Reply::Text("❌ Comando no reconocido".to_string()),
    };

    Ok(reply)
}

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &GuildTuneBot,
    guild_id: GuildId,
) -> Result<()> {
    let query = str_option(command, "query")
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?
        .to_string();
    let position = int_option(command, "position").unwrap_or(0);

    // Defer la respuesta ya que yt-dlp puede tomar tiempo
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let embed = match enqueue(ctx, command, bot, guild_id, &query, position).await {
        Ok(embed) => embed,
        Err(e) => {
            warn!("⚠️ /play falló en guild {}: {:?}", guild_id, e);
            embeds::create_error_embed("No se pudo reproducir", &e.to_string())
        }
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;

    Ok(())
}

/// Resuelve la búsqueda y la reproduce o la agrega a la cola existente
async fn enqueue(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &GuildTuneBot,
    guild_id: GuildId,
    query: &str,
    position: i64,
) -> Result<CreateEmbed> {
    let existing = bot.manager.get_queue(guild_id);

    let voice_channel = match &existing {
        Some(queue) => {
            let max = bot.config().max_queue_size;
            if queue.len() >= max {
                anyhow::bail!("La cola está llena ({} canciones)", max);
            }
            None
        }
        None => Some(get_user_voice_channel(ctx, guild_id, command.user.id)?),
    };

    let song = bot.youtube.resolve(query, command.user.id).await?;

    let transport = match (&existing, voice_channel) {
        (Some(queue), _) => queue.transport().clone(),
        (None, Some(channel_id)) => connect_transport(ctx, bot, guild_id, channel_id).await?,
        (None, None) => anyhow::bail!("Debes estar en un canal de voz"),
    };

    let queue = bot
        .manager
        .play(
            guild_id,
            transport,
            vec![song.clone()],
            position,
            Some(command.channel_id),
        )
        .await?;

    if existing.is_none() {
        return Ok(embeds::create_now_playing_embed(&song, None));
    }

    let index = queue
        .songs()
        .iter()
        .position(|queued| *queued == song)
        .unwrap_or_else(|| queue.len().saturating_sub(1));
    Ok(embeds::create_song_added_embed(&song, index + 1))
}

/// Conecta al canal de voz y crea el transporte de la nueva cola
async fn connect_transport(
    ctx: &Context,
    bot: &GuildTuneBot,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<Arc<dyn Transport>> {
    let manager = songbird::get(ctx)
        .await
        .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

    let call = manager.join(guild_id, channel_id).await.map_err(|e| {
        error!("Error al obtener handler de voz: {:?}", e);
        anyhow::anyhow!("Error al conectar al canal de voz")
    })?;
    info!("🔊 Conectado al canal de voz en guild {}", guild_id);

    Ok(Arc::new(SongbirdTransport::new(
        guild_id,
        channel_id,
        manager,
        call,
        bot.config().default_volume,
    )))
}

async fn respond(ctx: &Context, command: &CommandInteraction, reply: Reply) -> Result<()> {
    let message = match reply {
        Reply::Text(content) => CreateInteractionResponseMessage::new().content(content),
        Reply::Embed(embed) => CreateInteractionResponseMessage::new().embed(embed),
    };

    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await?;

    Ok(())
}

async fn respond_error(ctx: &Context, command: &CommandInteraction, description: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::create_error_embed("Error", description))
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

// Funciones auxiliares

fn str_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn int_option(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}

fn number_option(command: &CommandInteraction, name: &str) -> Option<f64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_f64())
}

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Result<ChannelId> {
    let guild = guild_id
        .to_guild_cached(&ctx.cache)
        .ok_or_else(|| anyhow::anyhow!("Guild no encontrada en caché"))?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or_else(|| anyhow::anyhow!("Debes estar en un canal de voz"))
}
