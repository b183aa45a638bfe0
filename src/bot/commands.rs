use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

/// Todos los comandos slash del bot
pub fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        previous_command(),
        jump_command(),
        shuffle_command(),
        repeat_command(),
        autoplay_command(),
        seek_command(),
        volume_command(),
        queue_command(),
        nowplaying_command(),
        stop_command(),
    ]
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Reproduce una canción o la agrega a la cola")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL o término de búsqueda",
            )
            .required(true),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "position",
                "Posición en la cola (1 = siguiente, por defecto al final)",
            )
            .min_int_value(1),
        )
}

fn seek_command() -> CreateCommand {
    CreateCommand::new("seek")
        .description("Salta a un momento de la canción actual")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Number, "seconds", "Segundos desde el inicio")
                .min_number_value(0.0)
                .required(true),
        )
}

// Comandos de control

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pausa la reproducción actual")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Reanuda la reproducción pausada")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Salta a la siguiente canción")
}

fn previous_command() -> CreateCommand {
    CreateCommand::new("previous").description("Vuelve a la canción anterior")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Detiene la reproducción y elimina la cola")
}

// Comandos de cola

fn jump_command() -> CreateCommand {
    CreateCommand::new("jump")
        .description("Salta a una posición de la cola (negativo: historial)")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "position",
                "Posición (1 = actual, -1 = anterior)",
            )
            .required(true),
        )
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue")
        .description("Muestra la cola de reproducción")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "page", "Número de página")
                .min_int_value(1),
        )
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Muestra información de la canción actual")
}

fn shuffle_command() -> CreateCommand {
    CreateCommand::new("shuffle").description("Mezcla las próximas canciones")
}

fn repeat_command() -> CreateCommand {
    CreateCommand::new("repeat")
        .description("Configura el modo de repetición")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "mode", "Modo de repetición")
                .add_string_choice("Desactivar", "off")
                .add_string_choice("Canción", "song")
                .add_string_choice("Cola", "queue"),
        )
}

fn autoplay_command() -> CreateCommand {
    CreateCommand::new("autoplay").description("Activa/desactiva canciones relacionadas al terminar")
}

// Comandos de audio

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Ajusta el volumen de reproducción")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "level",
                "Nivel de volumen (0-200)",
            )
            .min_int_value(0)
            .max_int_value(200),
        )
}
