use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::{sync::OnceLock, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::audio::{related::RelatedSongProvider, song::Song};

/// Cliente para interactuar con YouTube/yt-dlp
pub struct YouTubeClient {
    rate_limiter: Semaphore,
    related_limit: usize,
    max_duration: Option<Duration>,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: String,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    is_live: Option<bool>,
}

impl YtDlpInfo {
    fn into_song(self) -> Song {
        let url = self
            .webpage_url
            .or(self.url)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id));

        let mut song = Song::new(self.id, self.title, url)
            .with_duration(Duration::from_secs_f64(self.duration.unwrap_or(0.0).max(0.0)));
        if let Some(uploader) = self.uploader.or(self.channel) {
            song = song.with_uploader(uploader);
        }
        if let Some(thumbnail) = self.thumbnail {
            song = song.with_thumbnail(thumbnail);
        }
        if self.is_live.unwrap_or(false) {
            song = song.live();
        }
        song
    }
}

impl YouTubeClient {
    pub fn new(related_limit: usize, max_duration: Option<Duration>) -> Self {
        Self {
            // Limitar requests concurrentes para evitar rate limiting
            rate_limiter: Semaphore::new(3),
            related_limit,
            max_duration,
        }
    }

    pub fn is_youtube_url(url: &str) -> bool {
        static YOUTUBE: OnceLock<Regex> = OnceLock::new();
        YOUTUBE
            .get_or_init(|| {
                Regex::new(r"^https?://(www\.|music\.|m\.)?(youtube\.com|youtu\.be)/")
                    .expect("regex de YouTube válida")
            })
            .is_match(url)
    }

    pub fn is_url(query: &str) -> bool {
        query.starts_with("http://") || query.starts_with("https://")
    }

    /// Resuelve una URL o búsqueda a una canción pedida por `member`
    pub async fn resolve(&self, query: &str, member: UserId) -> Result<Song> {
        let song = if Self::is_url(query) {
            self.get_info(query).await?
        } else {
            self.search(query, 1)
                .await?
                .into_iter()
                .next()
                .with_context(|| format!("Sin resultados para: {}", query))?
        };

        if let Some(max) = self.max_duration {
            if !song.is_live && song.duration > max {
                anyhow::bail!(
                    "La canción dura {} y el máximo permitido es {}",
                    song.formatted_duration(),
                    humantime::format_duration(max)
                );
            }
        }

        Ok(song.with_member(member))
    }

    /// Busca videos en YouTube
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Song>> {
        info!("🔍 Buscando en YouTube: {}", query);
        let search_query = format!("ytsearch{}:{}", limit, query);

        let stdout = self
            .run(&[
                "--no-playlist",
                "--dump-json",
                "--flat-playlist",
                "--skip-download",
                "--no-warnings",
                &search_query,
            ])
            .await?;

        Ok(stdout
            .lines()
            .filter_map(|line| serde_json::from_str::<YtDlpInfo>(line).ok())
            .map(YtDlpInfo::into_song)
            .collect())
    }

    /// Obtiene información de una URL específica
    pub async fn get_info(&self, url: &str) -> Result<Song> {
        debug!("📊 Obteniendo info de: {}", url);
        if !Self::is_youtube_url(url) {
            debug!("URL fuera de YouTube, se delega en los extractores de yt-dlp");
        }
        let stdout = self
            .run(&["--no-playlist", "--dump-json", "--no-warnings", url])
            .await?;

        let info: YtDlpInfo =
            serde_json::from_str(&stdout).context("Error al parsear respuesta de yt-dlp")?;
        Ok(info.into_song())
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let _permit = self.rate_limiter.acquire().await?;

        let output = Command::new("yt-dlp")
            .args(args)
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl RelatedSongProvider for YouTubeClient {
    async fn related_songs(&self, song: &Song) -> Result<Vec<Song>> {
        let query = match &song.uploader {
            Some(uploader) => format!("{} {}", uploader, song.name),
            None => song.name.clone(),
        };

        let candidates = self.search(&query, self.related_limit + 1).await?;
        Ok(candidates
            .into_iter()
            .filter(|candidate| candidate.id != song.id && !candidate.is_live)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_url_detection() {
        assert!(YouTubeClient::is_youtube_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(YouTubeClient::is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(YouTubeClient::is_youtube_url(
            "https://music.youtube.com/watch?v=test"
        ));
        assert!(!YouTubeClient::is_youtube_url("https://example.com/video"));
    }

    #[test]
    fn test_query_vs_url() {
        assert!(YouTubeClient::is_url("https://youtu.be/abc"));
        assert!(!YouTubeClient::is_url("daft punk one more time"));
    }

    #[test]
    fn test_flat_search_entry_to_song() {
        let line = r#"{"id":"abc123","title":"Canción","duration":215.0,"channel":"Artista","url":"https://www.youtube.com/watch?v=abc123"}"#;
        let song = serde_json::from_str::<YtDlpInfo>(line).unwrap().into_song();

        assert_eq!(song.id, "abc123");
        assert_eq!(song.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(song.duration, Duration::from_secs(215));
        assert_eq!(song.uploader.as_deref(), Some("Artista"));
        assert!(!song.is_live);
    }

    #[test]
    fn test_missing_url_falls_back_to_watch_link() {
        let line = r#"{"id":"xyz","title":"Directo","is_live":true}"#;
        let song = serde_json::from_str::<YtDlpInfo>(line).unwrap().into_song();
        assert_eq!(song.url, "https://www.youtube.com/watch?v=xyz");
        assert!(song.is_live);
    }
}
