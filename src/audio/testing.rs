//! Test doubles for the queue engine: a recording transport and a harness
//! that wires a manager, a mocked related-song provider and one queue.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::broadcast;

use super::{
    manager::{QueueManager, QueueOptions},
    queue::GuildQueue,
    related::MockRelatedSongProvider,
    song::Song,
    transport::{Transport, TransportEvent},
};

pub fn song(id: &str) -> Song {
    Song::new(id, format!("Canción {}", id), format!("https://youtu.be/{}", id))
}

pub fn song_ids(songs: &[Song]) -> Vec<String> {
    songs.iter().map(|song| song.id.clone()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Play { song_id: String, begin: Duration },
    Stop,
    Pause,
    Unpause,
    SetVolume(f32),
    Leave,
}

/// Transporte que registra cada llamada. `pause`, `unpause` y `stop`
/// registran su entrada y salida y ceden el control `yields` veces entre
/// ambas, para detectar comandos solapados.
pub struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
    spans: Mutex<Vec<String>>,
    yields: AtomicUsize,
    fail_play: AtomicBool,
    fail_stop: AtomicBool,
    fail_pause: AtomicBool,
    elapsed: Mutex<Duration>,
    volume: Mutex<f32>,
    events: broadcast::Sender<TransportEvent>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            calls: Mutex::new(Vec::new()),
            spans: Mutex::new(Vec::new()),
            yields: AtomicUsize::new(0),
            fail_play: AtomicBool::new(false),
            fail_stop: AtomicBool::new(false),
            fail_pause: AtomicBool::new(false),
            elapsed: Mutex::new(Duration::ZERO),
            volume: Mutex::new(0.5),
            events,
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn spans(&self) -> Vec<String> {
        self.spans.lock().clone()
    }

    pub fn play_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, TransportCall::Play { .. }))
            .count()
    }

    pub fn last_play(&self) -> Option<(String, Duration)> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            TransportCall::Play { song_id, begin } => Some((song_id.clone(), *begin)),
            _ => None,
        })
    }

    pub fn set_yields(&self, yields: usize) {
        self.yields.store(yields, Ordering::SeqCst);
    }

    pub fn set_elapsed(&self, elapsed: Duration) {
        *self.elapsed.lock() = elapsed;
    }

    pub fn fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    /// `stop` falla como sobre una pista ya finalizada
    pub fn fail_stop(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    /// `pause` y `unpause` fallan
    pub fn fail_pause(&self, fail: bool) {
        self.fail_pause.store(fail, Ordering::SeqCst);
    }

    /// Simula el fin natural de la pista actual
    pub fn finish(&self) {
        let _ = self.events.send(TransportEvent::Finish);
    }

    async fn instrumented(&self, name: &str, call: TransportCall) {
        self.spans.lock().push(format!("enter {}", name));
        for _ in 0..self.yields.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        self.calls.lock().push(call);
        self.spans.lock().push(format!("exit {}", name));
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn play(&self, song: &Song, begin: Duration) -> Result<()> {
        if self.fail_play.load(Ordering::SeqCst) {
            anyhow::bail!("sin conexión de voz");
        }
        self.calls.lock().push(TransportCall::Play {
            song_id: song.id.clone(),
            begin,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.fail_stop.load(Ordering::SeqCst) {
            anyhow::bail!("la pista ya terminó");
        }
        self.instrumented("stop", TransportCall::Stop).await;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        if self.fail_pause.load(Ordering::SeqCst) {
            anyhow::bail!("no se pudo pausar la pista");
        }
        self.instrumented("pause", TransportCall::Pause).await;
        Ok(())
    }

    async fn unpause(&self) -> Result<()> {
        if self.fail_pause.load(Ordering::SeqCst) {
            anyhow::bail!("no se pudo reanudar la pista");
        }
        self.instrumented("unpause", TransportCall::Unpause).await;
        Ok(())
    }

    fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    async fn set_volume(&self, volume: f32) -> Result<()> {
        *self.volume.lock() = volume;
        self.calls.lock().push(TransportCall::SetVolume(volume));
        Ok(())
    }

    async fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    async fn leave(&self) -> Result<()> {
        self.calls.lock().push(TransportCall::Leave);
        Ok(())
    }

    fn channel(&self) -> Option<ChannelId> {
        Some(ChannelId::new(500))
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

pub struct TestHarness {
    pub manager: Arc<QueueManager>,
    pub queue: Arc<GuildQueue>,
    pub transport: Arc<MockTransport>,
}

impl TestHarness {
    pub async fn new(ids: &[&str]) -> Self {
        Self::builder(ids).build().await
    }

    pub async fn with_related(ids: &[&str], related: Vec<Song>) -> Self {
        Self::builder(ids).related(related).build().await
    }

    pub fn builder(ids: &[&str]) -> HarnessBuilder {
        Self::builder_with(ids.iter().map(|id| song(id)).collect())
    }

    pub fn builder_with(songs: Vec<Song>) -> HarnessBuilder {
        HarnessBuilder {
            songs,
            options: QueueOptions::default(),
            related: Vec::new(),
            related_by_id: HashMap::new(),
        }
    }
}

pub struct HarnessBuilder {
    songs: Vec<Song>,
    options: QueueOptions,
    related: Vec<Song>,
    related_by_id: HashMap<String, Vec<Song>>,
}

impl HarnessBuilder {
    pub fn retain_history(mut self, retain: bool) -> Self {
        self.options.save_previous_songs = retain;
        self
    }

    /// Relacionadas devueltas para cualquier canción
    pub fn related(mut self, songs: Vec<Song>) -> Self {
        self.related = songs;
        self
    }

    /// Relacionadas devueltas sólo para la canción `id`
    pub fn related_for(mut self, id: &str, songs: Vec<Song>) -> Self {
        self.related_by_id.insert(id.to_string(), songs);
        self
    }

    pub async fn build(self) -> TestHarness {
        let HarnessBuilder {
            songs,
            options,
            related,
            related_by_id,
        } = self;

        let mut provider = MockRelatedSongProvider::new();
        provider.expect_related_songs().returning(move |song| {
            Ok(related_by_id
                .get(&song.id)
                .cloned()
                .unwrap_or_else(|| related.clone()))
        });

        let manager = QueueManager::new(options, Arc::new(provider));
        let transport = Arc::new(MockTransport::new());
        let queue = manager
            .play(GuildId::new(1), transport.clone(), songs, 0, None)
            .await
            .expect("la cola de prueba debe crearse");

        TestHarness {
            manager,
            queue,
            transport,
        }
    }
}
