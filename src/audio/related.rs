use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::song::Song;

/// Fuente de canciones relacionadas usada por el autoplay
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelatedSongProvider: Send + Sync {
    /// Candidatas relacionadas con `song`, en orden de preferencia
    async fn related_songs(&self, song: &Song) -> Result<Vec<Song>>;
}

/// Primera candidata cuyo id no aparece en `exclude`.
///
/// Los fallos del proveedor se tratan como "sin resultados".
pub async fn find_related(
    provider: &dyn RelatedSongProvider,
    song: &Song,
    exclude: &HashSet<String>,
) -> Option<Song> {
    match provider.related_songs(song).await {
        Ok(candidates) => {
            let found = candidates
                .into_iter()
                .find(|candidate| !exclude.contains(&candidate.id));
            if found.is_none() {
                debug!("🔍 Sin relacionadas nuevas para: {}", song.name);
            }
            found
        }
        Err(e) => {
            warn!("⚠️ Error buscando relacionadas para {}: {:?}", song.name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_skips_songs_already_played() {
        let mut provider = MockRelatedSongProvider::new();
        provider.expect_related_songs().returning(|_| {
            Ok(vec![
                Song::new("a", "A", "https://youtu.be/a"),
                Song::new("b", "B", "https://youtu.be/b"),
            ])
        });

        let current = Song::new("x", "X", "https://youtu.be/x");
        let exclude: HashSet<String> = ["a".to_string()].into_iter().collect();
        let found = find_related(&provider, &current, &exclude).await;
        assert_eq!(found.map(|s| s.id), Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_provider_failure_means_no_related() {
        let mut provider = MockRelatedSongProvider::new();
        provider
            .expect_related_songs()
            .returning(|_| Err(anyhow::anyhow!("yt-dlp no disponible")));

        let current = Song::new("x", "X", "https://youtu.be/x");
        assert!(find_related(&provider, &current, &HashSet::new())
            .await
            .is_none());
    }
}
