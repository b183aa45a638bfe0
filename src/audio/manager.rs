use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::{queue::GuildQueue, related::RelatedSongProvider, song::Song, transport::Transport};
use crate::error::{QueueError, Result};

/// Opciones aplicadas a cada cola nueva
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Guarda canciones completas en el historial (si no, sólo su id)
    pub save_previous_songs: bool,
    /// Valor inicial del autoplay
    pub autoplay: bool,
    pub leave_on_stop: bool,
    pub leave_on_finish: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            save_previous_songs: true,
            autoplay: false,
            leave_on_stop: true,
            leave_on_finish: false,
        }
    }
}

/// Notificaciones emitidas por las colas
#[derive(Debug, Clone)]
pub enum QueueEvent {
    InitQueue(GuildId),
    PlaySong { guild_id: GuildId, song: Song },
    AddSong { guild_id: GuildId, song: Song },
    AddList { guild_id: GuildId, count: usize },
    FinishSong { guild_id: GuildId, song: Song },
    Finish(GuildId),
    NoRelated(GuildId),
    Error { guild_id: GuildId, message: String },
    /// Se emite una sola vez por cola, al terminar su destrucción
    DeleteQueue(GuildId),
}

/// Registro de colas por guild.
///
/// Las colas de guilds distintas son instancias independientes: nunca
/// comparten estado mutable ni compiten por la misma exclusividad.
pub struct QueueManager {
    queues: DashMap<GuildId, Arc<GuildQueue>>,
    options: QueueOptions,
    related: Arc<dyn RelatedSongProvider>,
    events: broadcast::Sender<QueueEvent>,
}

impl QueueManager {
    pub fn new(options: QueueOptions, related: Arc<dyn RelatedSongProvider>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            queues: DashMap::new(),
            options,
            related,
            events,
        })
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: QueueEvent) {
        debug!("📣 Evento de cola: {:?}", event);
        // Sin suscriptores el evento simplemente se descarta
        let _ = self.events.send(event);
    }

    pub fn get_queue(&self, guild_id: GuildId) -> Option<Arc<GuildQueue>> {
        self.queues.get(&guild_id).map(|queue| queue.clone())
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Quita la cola del registro; devuelve si existía
    pub fn remove_queue(&self, guild_id: GuildId) -> bool {
        self.queues.remove(&guild_id).is_some()
    }

    /// Reproduce canciones en una guild.
    ///
    /// Sin cola existente la crea con `transport` (ver [`Self::create_queue`]).
    /// Con cola existente agrega las canciones en `position` (ver
    /// [`GuildQueue::add_to_queue`]) e ignora `transport`.
    pub async fn play(
        self: &Arc<Self>,
        guild_id: GuildId,
        transport: Arc<dyn Transport>,
        songs: Vec<Song>,
        position: i64,
        text_channel: Option<ChannelId>,
    ) -> Result<Arc<GuildQueue>> {
        match self.get_queue(guild_id) {
            Some(queue) => {
                self.append(&queue, songs, position).await?;
                Ok(queue)
            }
            None => self.create_queue(guild_id, transport, songs, text_channel).await,
        }
    }

    /// Crea la cola de una guild y empieza a sonar su primera canción.
    ///
    /// Si otra llamada la creó antes, las canciones se agregan al final de
    /// esa cola. Si el transporte no puede iniciar la reproducción la cola
    /// se destruye y se devuelve el error.
    pub async fn create_queue(
        self: &Arc<Self>,
        guild_id: GuildId,
        transport: Arc<dyn Transport>,
        songs: Vec<Song>,
        text_channel: Option<ChannelId>,
    ) -> Result<Arc<GuildQueue>> {
        let mut pending = Some(songs);
        let created = match self.queues.entry(guild_id) {
            Entry::Occupied(entry) => Err(entry.get().clone()),
            Entry::Vacant(entry) => {
                let queue = Arc::new(GuildQueue::new(
                    guild_id,
                    pending.take().unwrap_or_default(),
                    transport,
                    self.related.clone(),
                    Arc::downgrade(self),
                    self.options.clone(),
                    text_channel,
                )?);
                entry.insert(queue.clone());
                Ok(queue)
            }
        };

        let queue = match created {
            Ok(queue) => queue,
            Err(existing) => {
                debug!("La cola de guild {} ya existía, agregando canciones", guild_id);
                self.append(&existing, pending.unwrap_or_default(), 0).await?;
                return Ok(existing);
            }
        };

        queue.attach_listener();
        info!("🎶 Cola creada para guild {}", guild_id);
        self.emit(QueueEvent::InitQueue(guild_id));

        if let Err(e) = queue.play(true).await {
            error!("❌ No se pudo iniciar la reproducción en guild {}: {}", guild_id, e);
            queue.remove().await;
            return Err(e);
        }
        Ok(queue)
    }

    async fn append(&self, queue: &GuildQueue, songs: Vec<Song>, position: i64) -> Result<()> {
        let count = songs.len();
        let first = songs.first().cloned();
        queue.add_to_queue(songs, position).await?;

        let guild_id = queue.id();
        match first {
            Some(song) if count == 1 => self.emit(QueueEvent::AddSong { guild_id, song }),
            _ => self.emit(QueueEvent::AddList { guild_id, count }),
        }
        Ok(())
    }

    /// Inicia en el transporte la canción actual de `queue`
    pub async fn play_song(&self, queue: &GuildQueue, emit_event: bool) -> Result<()> {
        let song = queue.current_song().ok_or(QueueError::NoPlayingSong)?;

        match queue.transport().play(&song, queue.begin_time()).await {
            Ok(()) => {
                if emit_event {
                    self.emit(QueueEvent::PlaySong {
                        guild_id: queue.id(),
                        song,
                    });
                }
                Ok(())
            }
            Err(e) => {
                error!("❌ Error al reproducir {} en guild {}: {:?}", song.name, queue.id(), e);
                self.emit(QueueEvent::Error {
                    guild_id: queue.id(),
                    message: e.to_string(),
                });
                Err(QueueError::Transport(e))
            }
        }
    }

    /// Detiene todas las colas (apagado del proceso)
    pub async fn shutdown(&self) {
        let queues: Vec<Arc<GuildQueue>> =
            self.queues.iter().map(|entry| entry.value().clone()).collect();

        for queue in queues {
            if let Err(e) = queue.stop().await {
                debug!("Cola {} ya detenida: {}", queue.id(), e);
            }
        }
        info!("🛑 Todas las colas detenidas");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{song, song_ids, MockTransport, TestHarness, TransportCall};
    use crate::audio::related::MockRelatedSongProvider;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_play_creates_then_appends() {
        let harness = TestHarness::new(&["a"]).await;
        let mut events = harness.manager.subscribe();

        let other_transport = Arc::new(MockTransport::new());
        let queue = harness
            .manager
            .play(
                harness.queue.id(),
                other_transport.clone(),
                vec![song("b")],
                0,
                None,
            )
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&queue, &harness.queue));
        assert_eq!(song_ids(&queue.songs()), vec!["a", "b"]);
        assert!(other_transport.calls().is_empty());
        assert!(matches!(
            events.try_recv(),
            Ok(QueueEvent::AddSong { song, .. }) if song.id == "b"
        ));
    }

    #[tokio::test]
    async fn test_play_emits_init_and_play_song() {
        let manager = QueueManager::new(
            QueueOptions::default(),
            Arc::new(MockRelatedSongProvider::new()),
        );
        let mut events = manager.subscribe();
        let transport = Arc::new(MockTransport::new());

        manager
            .play(GuildId::new(9), transport.clone(), vec![song("a")], 0, None)
            .await
            .unwrap();

        assert!(matches!(events.try_recv(), Ok(QueueEvent::InitQueue(_))));
        assert!(matches!(
            events.try_recv(),
            Ok(QueueEvent::PlaySong { song, .. }) if song.id == "a"
        ));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_create_queue_on_existing_guild_appends() {
        let harness = TestHarness::new(&["a", "b"]).await;

        let queue = harness
            .manager
            .create_queue(
                harness.queue.id(),
                Arc::new(MockTransport::new()),
                vec![song("c")],
                None,
            )
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&queue, &harness.queue));
        assert_eq!(song_ids(&queue.songs()), vec!["a", "b", "c"]);
        assert_eq!(harness.transport.play_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_start_removes_queue() {
        let manager = QueueManager::new(
            QueueOptions::default(),
            Arc::new(MockRelatedSongProvider::new()),
        );
        let transport = Arc::new(MockTransport::new());
        transport.fail_play(true);

        let err = manager
            .play(GuildId::new(3), transport, vec![song("a")], 0, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TRANSPORT");
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_guild_queues_are_independent() {
        let harness = TestHarness::new(&["a", "b"]).await;
        let other = Arc::new(MockTransport::new());
        let second = harness
            .manager
            .play(GuildId::new(2), other.clone(), vec![song("x")], 0, None)
            .await
            .unwrap();

        harness.queue.pause().await.unwrap();
        assert!(harness.queue.is_paused());
        assert!(!second.is_paused());
        assert!(!other.calls().contains(&TransportCall::Pause));

        second.stop().await.unwrap();
        assert_eq!(harness.manager.len(), 1);
        assert!(harness.manager.get_queue(harness.queue.id()).is_some());
    }

    #[tokio::test]
    async fn test_shutdown_stops_every_queue() {
        let harness = TestHarness::new(&["a"]).await;
        harness
            .manager
            .play(GuildId::new(2), Arc::new(MockTransport::new()), vec![song("x")], 0, None)
            .await
            .unwrap();

        harness.manager.shutdown().await;
        assert!(harness.manager.is_empty());
        assert!(harness.queue.is_stopped());
    }
}
