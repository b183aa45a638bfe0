use serenity::{
    builder::CreateMessage,
    http::Http,
    model::id::{ChannelId, GuildId},
};
use std::{collections::HashMap, sync::Arc};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, error, warn};

use crate::{
    audio::{
        manager::{QueueEvent, QueueManager},
        song::Song,
    },
    ui::embeds,
};

/// Mensaje que se publica en el canal de texto de una cola
#[derive(Debug, Clone, PartialEq)]
enum Announcement {
    NowPlaying(Song),
    Finished,
    NoRelated,
    Failed(String),
}

impl Announcement {
    fn from_event(event: &QueueEvent) -> Option<Self> {
        match event {
            QueueEvent::PlaySong { song, .. } => Some(Self::NowPlaying(song.clone())),
            QueueEvent::Finish(_) => Some(Self::Finished),
            QueueEvent::NoRelated(_) => Some(Self::NoRelated),
            QueueEvent::Error { message, .. } => Some(Self::Failed(message.clone())),
            _ => None,
        }
    }

    fn into_message(self) -> CreateMessage {
        let embed = match self {
            Self::NowPlaying(song) => embeds::create_now_playing_embed(&song, None),
            Self::Finished => embeds::create_info_embed(
                "Cola terminada",
                "No quedan canciones. Usa `/play` para seguir escuchando.",
            ),
            Self::NoRelated => embeds::create_info_embed(
                "Autoplay",
                "No se encontraron canciones relacionadas",
            ),
            Self::Failed(message) => embeds::create_error_embed("Error de reproducción", &message),
        };
        CreateMessage::new().embed(embed)
    }
}

fn event_guild(event: &QueueEvent) -> GuildId {
    match event {
        QueueEvent::InitQueue(guild_id)
        | QueueEvent::Finish(guild_id)
        | QueueEvent::NoRelated(guild_id)
        | QueueEvent::DeleteQueue(guild_id) => *guild_id,
        QueueEvent::PlaySong { guild_id, .. }
        | QueueEvent::AddSong { guild_id, .. }
        | QueueEvent::AddList { guild_id, .. }
        | QueueEvent::FinishSong { guild_id, .. }
        | QueueEvent::Error { guild_id, .. } => *guild_id,
    }
}

/// Publica los eventos de las colas en su canal de texto
pub fn spawn_event_forwarder(http: Arc<Http>, manager: Arc<QueueManager>) -> JoinHandle<()> {
    let mut events = manager.subscribe();

    tokio::spawn(async move {
        // El canal se recuerda hasta DeleteQueue: Finish llega cuando la
        // cola ya puede haber salido del registro
        let mut channels: HashMap<GuildId, ChannelId> = HashMap::new();

        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("⚠️ Se perdieron {} eventos de cola", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let guild_id = event_guild(&event);
            if let Some(channel_id) = manager.get_queue(guild_id).and_then(|q| q.text_channel()) {
                channels.insert(guild_id, channel_id);
            }

            if let (Some(announcement), Some(channel_id)) =
                (Announcement::from_event(&event), channels.get(&guild_id).copied())
            {
                if let Err(e) = channel_id.send_message(&http, announcement.into_message()).await {
                    error!("Error al enviar mensaje a {}: {:?}", channel_id, e);
                }
            } else {
                debug!("Evento sin anuncio: {:?}", event);
            }

            if matches!(event, QueueEvent::DeleteQueue(_)) {
                channels.remove(&guild_id);
            }
        }
    })
}
