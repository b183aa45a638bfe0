use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::audio::{
    queue::{GuildQueue, RepeatMode},
    song::Song,
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 GuildTune";

const ITEMS_PER_PAGE: usize = 10;

fn song_fields(mut embed: CreateEmbed, song: &Song) -> CreateEmbed {
    let duration = if song.is_live {
        "🔴 En vivo".to_string()
    } else {
        song.formatted_duration()
    };

    embed = embed
        .field(
            "🎤 Artista",
            song.uploader.as_deref().unwrap_or("Desconocido"),
            true,
        )
        .field("⏱️ Duración", duration, true);

    if let Some(member) = song.member {
        embed = embed.field("👤 Solicitado por", format!("<@{}>", member), true);
    }
    if let Some(thumbnail) = &song.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed.url(&song.url)
}

/// Crea un embed para mostrar la canción actual
pub fn create_now_playing_embed(song: &Song, position: Option<&str>) -> CreateEmbed {
    let description = match position {
        Some(position) => format!("**{}**\n`{} / {}`", song.name, position, song.formatted_duration()),
        None => format!("**{}**", song.name),
    };

    let embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(description)
        .color(colors::SUCCESS_GREEN);

    song_fields(embed, song)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar que se agregó una canción
pub fn create_song_added_embed(song: &Song, position: usize) -> CreateEmbed {
    let embed = CreateEmbed::default()
        .title("✅ Canción Agregada")
        .description(format!(
            "**{}** se ha agregado en la posición {}",
            song.name, position
        ))
        .color(colors::MUSIC_PURPLE);

    song_fields(embed, song)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn repeat_icon(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::Song => "🔂",
        RepeatMode::Queue => "🔁",
        RepeatMode::Disabled => "▶️",
    }
}

/// Crea un embed para mostrar la cola de reproducción
pub fn create_queue_embed(queue: &GuildQueue, page: usize) -> CreateEmbed {
    let songs = queue.songs();
    let mut embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    let Some(current) = songs.first() else {
        return embed
            .description("😴 **La cola está vacía**\n\n💡 Usa `/play <canción>` para agregar música")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    };

    let status = if queue.is_paused() {
        "⏸️"
    } else {
        repeat_icon(queue.repeat_mode())
    };
    embed = embed.field(
        format!("{} Reproduciendo", status),
        format!("**{}** `[{}]`", current.name, current.formatted_duration()),
        false,
    );

    let upcoming = &songs[1..];
    let total_pages = upcoming.len().div_ceil(ITEMS_PER_PAGE).max(1);
    let page = page.clamp(1, total_pages);

    if !upcoming.is_empty() {
        let start = (page - 1) * ITEMS_PER_PAGE;
        let description: String = upcoming
            .iter()
            .enumerate()
            .skip(start)
            .take(ITEMS_PER_PAGE)
            // La posición 1 es la canción actual
            .map(|(i, song)| format!("**{}**. {} `[{}]`\n", i + 2, song.name, song.formatted_duration()))
            .collect();

        embed = embed.field("Próximas canciones", description, false);
    }

    let mut info = format!(
        "**Total:** {} canciones • **Duración:** {}",
        songs.len(),
        queue.formatted_duration()
    );
    if queue.autoplay() {
        info.push_str(" • 📻 **Autoplay**");
    }
    let filters = queue.filters();
    if !filters.is_empty() {
        info.push_str(&format!(" • 🎛️ {}", filters.names().join(", ")));
    }
    embed = embed.field("Información", info, false);

    let footer = if total_pages > 1 {
        format!("Página {} de {} • GuildTune", page, total_pages)
    } else {
        STANDARD_FOOTER.to_string()
    };

    embed
        .footer(CreateEmbedFooter::new(footer))
        .timestamp(Timestamp::now())
}

/// Crea un embed de error
pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de información
pub fn create_info_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("ℹ️ {}", title))
        .description(description)
        .color(colors::INFO_BLUE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}
