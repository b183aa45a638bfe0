use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::time::Duration;

/// Canción reproducible dentro de una cola
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub id: String,
    pub name: String,
    pub url: String,
    pub duration: Duration,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
    pub is_live: bool,
    /// Miembro que pidió la canción
    pub member: Option<UserId>,
    /// Datos opacos del llamador, se copian tal cual a las canciones relacionadas
    pub metadata: Option<serde_json::Value>,
    /// Canción original cuando esta es una sustitución de fuente
    pub source: Option<Box<Song>>,
    pub added_at: DateTime<Utc>,
}

impl Song {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            duration: Duration::ZERO,
            uploader: None,
            thumbnail: None,
            is_live: false,
            member: None,
            metadata: None,
            source: None,
            added_at: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_uploader(mut self, uploader: String) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: String) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    pub fn with_member(mut self, member: UserId) -> Self {
        self.member = Some(member);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Marca esta canción como sustituta de `source`
    pub fn with_source(mut self, source: Song) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn live(mut self) -> Self {
        self.is_live = true;
        self
    }

    pub fn formatted_duration(&self) -> String {
        if self.is_live {
            return "EN VIVO".to_string();
        }
        format_duration(self.duration)
    }
}

/// Entrada del historial. Sin retención completa sólo se guarda la identidad.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayedSong {
    Full(Song),
    Stub { id: String },
}

impl PlayedSong {
    pub fn record(song: Song, retain: bool) -> Self {
        if retain {
            Self::Full(song)
        } else {
            Self::Stub { id: song.id }
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Full(song) => &song.id,
            Self::Stub { id } => id,
        }
    }

    pub fn as_song(&self) -> Option<&Song> {
        match self {
            Self::Full(song) => Some(song),
            Self::Stub { .. } => None,
        }
    }

    pub fn into_song(self) -> Option<Song> {
        match self {
            Self::Full(song) => Some(song),
            Self::Stub { .. } => None,
        }
    }
}

/// Formato `m:ss` o `h:mm:ss`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
