use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{Input, YoutubeDl},
    tracks::TrackHandle,
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::song::Song;

/// Notificaciones del transporte hacia la cola
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// La pista actual terminó, ya sea naturalmente o por `stop`
    Finish,
    /// La pista actual falló
    Error(String),
}

/// Conexión de audio en vivo de una guild
#[async_trait]
pub trait Transport: Send + Sync {
    /// Comienza a reproducir `song` desde `begin`, reemplazando la pista actual
    async fn play(&self, song: &Song, begin: Duration) -> Result<()>;
    async fn stop(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn unpause(&self) -> Result<()>;
    fn volume(&self) -> f32;
    async fn set_volume(&self, volume: f32) -> Result<()>;
    /// Tiempo reproducido de la pista actual, sin contar el inicio `begin`
    async fn elapsed(&self) -> Duration;
    /// Abandona el canal de voz
    async fn leave(&self) -> Result<()>;
    fn channel(&self) -> Option<ChannelId>;
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}

/// Transporte respaldado por una llamada de songbird
pub struct SongbirdTransport {
    guild_id: GuildId,
    channel_id: ChannelId,
    manager: Arc<Songbird>,
    call: Arc<tokio::sync::Mutex<Call>>,
    http: reqwest::Client,
    track: Mutex<Option<TrackHandle>>,
    begin: Mutex<Duration>,
    volume: Mutex<f32>,
    // Las pistas reemplazadas no deben reportar su fin
    generation: Arc<AtomicU64>,
    events: broadcast::Sender<TransportEvent>,
}

impl SongbirdTransport {
    pub fn new(
        guild_id: GuildId,
        channel_id: ChannelId,
        manager: Arc<Songbird>,
        call: Arc<tokio::sync::Mutex<Call>>,
        volume: f32,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            guild_id,
            channel_id,
            manager,
            call,
            http: reqwest::Client::new(),
            track: Mutex::new(None),
            begin: Mutex::new(Duration::ZERO),
            volume: Mutex::new(volume),
            generation: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    fn current_track(&self) -> Option<TrackHandle> {
        self.track.lock().clone()
    }
}

#[async_trait]
impl Transport for SongbirdTransport {
    async fn play(&self, song: &Song, begin: Duration) -> Result<()> {
        info!("🎵 Reproduciendo: {} en guild {}", song.name, self.guild_id);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.track.lock().take() {
            let _ = previous.stop();
        }

        let input: Input = YoutubeDl::new(self.http.clone(), song.url.clone()).into();
        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        let _ = handle.set_volume(*self.volume.lock());
        *self.begin.lock() = begin;
        if !begin.is_zero() {
            debug!("⏩ Iniciando desde {:?}", begin);
            let _ = handle.seek(begin);
        }

        let notifier = TrackNotifier {
            generation,
            current: self.generation.clone(),
            events: self.events.clone(),
        };
        handle
            .add_event(Event::Track(TrackEvent::End), TrackEndNotifier(notifier.clone()))
            .map_err(|e| anyhow::anyhow!("Error al agregar event handler: {}", e))?;
        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackErrorNotifier {
                    guild_id: self.guild_id,
                    notifier,
                },
            )
            .map_err(|e| anyhow::anyhow!("Error al agregar event handler: {}", e))?;

        *self.track.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if let Some(track) = self.current_track() {
            track
                .stop()
                .map_err(|e| anyhow::anyhow!("Error al detener la pista: {}", e))?;
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        if let Some(track) = self.current_track() {
            track
                .pause()
                .map_err(|e| anyhow::anyhow!("Error al pausar la pista: {}", e))?;
        }
        Ok(())
    }

    async fn unpause(&self) -> Result<()> {
        if let Some(track) = self.current_track() {
            track
                .play()
                .map_err(|e| anyhow::anyhow!("Error al reanudar la pista: {}", e))?;
        }
        Ok(())
    }

    fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    async fn set_volume(&self, volume: f32) -> Result<()> {
        *self.volume.lock() = volume;
        if let Some(track) = self.current_track() {
            track
                .set_volume(volume)
                .map_err(|e| anyhow::anyhow!("Error al ajustar volumen: {}", e))?;
        }
        Ok(())
    }

    async fn elapsed(&self) -> Duration {
        match self.current_track() {
            Some(track) => track
                .get_info()
                .await
                .map(|state| state.position.saturating_sub(*self.begin.lock()))
                .unwrap_or_default(),
            None => Duration::ZERO,
        }
    }

    async fn leave(&self) -> Result<()> {
        self.manager.remove(self.guild_id).await?;
        info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
        Ok(())
    }

    fn channel(&self) -> Option<ChannelId> {
        Some(self.channel_id)
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

/// Reenvía eventos de una pista sólo mientras sea la pista vigente
#[derive(Clone)]
struct TrackNotifier {
    generation: u64,
    current: Arc<AtomicU64>,
    events: broadcast::Sender<TransportEvent>,
}

impl TrackNotifier {
    fn notify(&self, event: TransportEvent) -> bool {
        if self.current.load(Ordering::SeqCst) != self.generation {
            debug!("Evento de una pista reemplazada descartado: {:?}", event);
            return false;
        }
        self.events.send(event).is_ok()
    }
}

struct TrackEndNotifier(TrackNotifier);

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        if self.0.notify(TransportEvent::Finish) {
            debug!("Track terminado, notificando a la cola...");
        }
        None
    }
}

struct TrackErrorNotifier {
    guild_id: GuildId,
    notifier: TrackNotifier,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                error!(
                    "❌ Error en track para guild {}: {:?}",
                    self.guild_id, state.playing
                );
                self.notifier
                    .notify(TransportEvent::Error(format!("{:?}", state.playing)));
            }
        }
        None
    }
}
