//! # Guild Queue
//!
//! Playback state of one guild and the commands that change it.
//!
//! `songs[0]` is always the song the transport is playing. Commands that
//! stop the transport only record their intent (skip or rewind) once the
//! stop succeeded; the song-finished handler consumes that intent and
//! completes the advance. A command that fails leaves the queue as it
//! found it.

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId};
use std::{
    collections::HashSet,
    fmt,
    str::FromStr,
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, error, info, warn};

use super::{
    manager::{QueueEvent, QueueManager, QueueOptions},
    related::{self, RelatedSongProvider},
    song::{format_duration, PlayedSong, Song},
    task_queue::{TaskPermit, TaskQueue},
    transport::{Transport, TransportEvent},
};
use crate::error::{QueueError, Result};

/// Política de continuación de la reproducción.
///
/// Los ordinales son estables: 0 = desactivado, 1 = canción, 2 = cola.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum RepeatMode {
    #[default]
    Disabled = 0,
    Song = 1,
    Queue = 2,
}

impl RepeatMode {
    /// Siguiente modo en el ciclo Disabled → Song → Queue → Disabled
    pub fn next(self) -> Self {
        match self {
            Self::Disabled => Self::Song,
            Self::Song => Self::Queue,
            Self::Queue => Self::Disabled,
        }
    }
}

impl TryFrom<u8> for RepeatMode {
    type Error = QueueError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Song),
            2 => Ok(Self::Queue),
            other => Err(QueueError::InvalidType {
                expected: "un modo de repetición (0, 1 o 2)",
                actual: other.to_string(),
                name: "mode",
            }),
        }
    }
}

impl FromStr for RepeatMode {
    type Err = QueueError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "off" | "disabled" | "0" => Ok(Self::Disabled),
            "song" | "track" | "1" => Ok(Self::Song),
            "queue" | "2" => Ok(Self::Queue),
            other => Err(QueueError::InvalidType {
                expected: "un modo de repetición (off, song, queue)",
                actual: other.to_string(),
                name: "mode",
            }),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "desactivado"),
            Self::Song => write!(f, "canción"),
            Self::Queue => write!(f, "cola"),
        }
    }
}

/// Transición pendiente que consume el manejador de fin de canción
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum PendingTransition {
    #[default]
    None,
    Skip,
    Previous,
}

/// Estado de filtros de audio. Opaco para la cola, sólo se guarda.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    names: Vec<String>,
}

impl FilterState {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Default)]
struct QueueState {
    songs: Vec<Song>,
    previous_songs: Vec<PlayedSong>,
    playing: bool,
    paused: bool,
    stopped: bool,
    repeat_mode: RepeatMode,
    autoplay: bool,
    begin_time: Duration,
    transition: PendingTransition,
}

/// Estado de reproducción de una guild.
///
/// Los comandos que mutan el estado pasan por el [`TaskQueue`] propio de la
/// cola y se aplican en orden de llegada. Cada mutación se publica completa
/// dentro de un único bloqueo de escritura, así que las lecturas sin ticket
/// nunca ven una cola a medio modificar.
pub struct GuildQueue {
    id: GuildId,
    state: RwLock<QueueState>,
    tasks: TaskQueue,
    transport: Arc<dyn Transport>,
    related: Arc<dyn RelatedSongProvider>,
    manager: Weak<QueueManager>,
    options: QueueOptions,
    text_channel: Option<ChannelId>,
    filters: RwLock<FilterState>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl GuildQueue {
    pub(crate) fn new(
        id: GuildId,
        songs: Vec<Song>,
        transport: Arc<dyn Transport>,
        related: Arc<dyn RelatedSongProvider>,
        manager: Weak<QueueManager>,
        options: QueueOptions,
        text_channel: Option<ChannelId>,
    ) -> Result<Self> {
        if songs.is_empty() {
            return Err(empty_songs());
        }

        Ok(Self {
            id,
            state: RwLock::new(QueueState {
                songs,
                autoplay: options.autoplay,
                ..QueueState::default()
            }),
            tasks: TaskQueue::new(),
            transport,
            related,
            manager,
            options,
            text_channel,
            filters: RwLock::new(FilterState::default()),
            listener: Mutex::new(None),
        })
    }

    /// Suscribe la cola a las notificaciones del transporte
    pub(crate) fn attach_listener(self: &Arc<Self>) {
        let mut events = self.transport.subscribe();
        let queue = Arc::downgrade(self);
        let guild_id = self.id;

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(queue) = queue.upgrade() else { break };
                        queue.handle_transport_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️ {} eventos de transporte perdidos en guild {}", skipped, guild_id);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Listener de transporte finalizado para guild {}", guild_id);
        });

        if let Some(previous) = self.listener.lock().replace(handle) {
            previous.abort();
        }
    }

    // Lecturas

    pub fn id(&self) -> GuildId {
        self.id
    }

    pub fn songs(&self) -> Vec<Song> {
        self.state.read().songs.clone()
    }

    pub fn previous_songs(&self) -> Vec<PlayedSong> {
        self.state.read().previous_songs.clone()
    }

    pub fn current_song(&self) -> Option<Song> {
        self.state.read().songs.first().cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().songs.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.state.read().playing
    }

    pub fn is_paused(&self) -> bool {
        let state = self.state.read();
        state.playing && state.paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state.read().stopped
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.state.read().repeat_mode
    }

    pub fn autoplay(&self) -> bool {
        self.state.read().autoplay
    }

    pub fn begin_time(&self) -> Duration {
        self.state.read().begin_time
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    pub fn text_channel(&self) -> Option<ChannelId> {
        self.text_channel
    }

    pub fn voice_channel(&self) -> Option<ChannelId> {
        self.transport.channel()
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Duración total de todas las canciones de la cola
    pub fn duration(&self) -> Duration {
        self.state.read().songs.iter().map(|song| song.duration).sum()
    }

    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration())
    }

    /// Posición actual dentro de la canción
    pub async fn current_time(&self) -> Duration {
        self.transport.elapsed().await + self.begin_time()
    }

    pub async fn formatted_current_time(&self) -> String {
        format_duration(self.current_time().await)
    }

    pub fn volume(&self) -> f32 {
        self.transport.volume()
    }

    pub fn filters(&self) -> FilterState {
        self.filters.read().clone()
    }

    pub fn set_filters(&self, filters: FilterState) {
        *self.filters.write() = filters;
    }

    // Comandos

    /// Agrega canciones a la cola.
    ///
    /// `position <= 0` agrega al final; `position > 0` inserta en ese índice,
    /// desplazando a la derecha lo que había ahí. Índices fuera de rango
    /// equivalen a agregar al final. Devuelve el nuevo tamaño de la cola.
    pub async fn add_to_queue(&self, songs: Vec<Song>, position: i64) -> Result<usize> {
        if self.is_stopped() {
            return Err(QueueError::QueueStopped);
        }
        if songs.is_empty() {
            return Err(empty_songs());
        }

        let _permit = self.tasks.acquire().await;
        let mut state = self.state.write();
        ensure_alive(&state)?;

        let count = songs.len();
        match usize::try_from(position) {
            Ok(index) if index > 0 && index < state.songs.len() => {
                state.songs.splice(index..index, songs);
            }
            _ => state.songs.extend(songs),
        }

        info!("➕ Agregadas {} canciones a la cola de guild {}", count, self.id);
        Ok(state.songs.len())
    }

    pub async fn pause(&self) -> Result<()> {
        let permit = self.tasks.acquire().await;
        {
            let state = self.state.read();
            ensure_alive(&state)?;
            if state.paused {
                return Err(QueueError::Paused);
            }
        }

        self.transport.pause().await?;
        self.state.write().paused = true;
        info!("⏸️ Reproducción pausada en guild {}", self.id);
        finish(permit, ())
    }

    pub async fn resume(&self) -> Result<()> {
        let permit = self.tasks.acquire().await;
        {
            let state = self.state.read();
            ensure_alive(&state)?;
            if !state.paused {
                return Err(QueueError::Resumed);
            }
        }

        self.transport.unpause().await?;
        self.state.write().paused = false;
        info!("▶️ Reproducción reanudada en guild {}", self.id);
        finish(permit, ())
    }

    /// Salta a la siguiente canción y la devuelve.
    ///
    /// Si no queda ninguna y el autoplay está activo, agrega primero una
    /// canción relacionada. La cola sólo cambia si el transporte se detuvo.
    pub async fn skip(&self) -> Result<Song> {
        let permit = self.tasks.acquire().await;
        let (remaining, autoplay) = {
            let state = self.state.read();
            ensure_alive(&state)?;
            (state.songs.len(), state.autoplay)
        };

        if remaining <= 1 {
            if !autoplay {
                return Err(QueueError::NoUpNext);
            }
            self.append_related_song().await.map_err(|e| match e {
                QueueError::NoRelated | QueueError::NoPlayingSong => QueueError::NoUpNext,
                other => other,
            })?;
        }

        let next = self
            .state
            .read()
            .songs
            .get(1)
            .cloned()
            .ok_or(QueueError::NoUpNext)?;

        self.transport.stop().await?;
        self.state.write().transition = PendingTransition::Skip;
        info!("⏭️ Saltando a: {}", next.name);
        finish(permit, next)
    }

    /// Vuelve a la canción anterior y la devuelve.
    ///
    /// Con repetición de cola envuelve hacia la última canción de la cola.
    pub async fn previous(&self) -> Result<Song> {
        let permit = self.tasks.acquire().await;
        let song = {
            let state = self.state.read();
            ensure_alive(&state)?;
            if !self.options.save_previous_songs {
                return Err(QueueError::DisabledOption("save_previous_songs"));
            }

            let song = if state.repeat_mode == RepeatMode::Queue {
                state.songs.last().cloned()
            } else {
                state.previous_songs.last().and_then(PlayedSong::as_song).cloned()
            };
            song.ok_or(QueueError::NoPrevious)?
        };

        self.transport.stop().await?;
        self.state.write().transition = PendingTransition::Previous;
        info!("⏮️ Volviendo a: {}", song.name);
        finish(permit, song)
    }

    /// Mezcla las canciones pendientes; la actual se queda en la posición 0
    pub async fn shuffle(&self) -> Result<()> {
        let _permit = self.tasks.acquire().await;
        let mut state = self.state.write();
        ensure_alive(&state)?;

        if state.songs.len() > 2 {
            let mut rng = rand::thread_rng();
            fisher_yates(&mut state.songs[1..], &mut rng);
        }

        info!("🔀 Cola mezclada en guild {}", self.id);
        Ok(())
    }

    /// Salta a una posición de la cola o del historial.
    ///
    /// Las posiciones positivas cuentan desde la canción actual (1 es la
    /// actual, 2 la siguiente). Las negativas retroceden en el historial.
    /// Devuelve la canción que quedará sonando.
    pub async fn jump(&self, position: i64) -> Result<Song> {
        let permit = self.tasks.acquire().await;
        let (song, transition, distance) = {
            let state = self.state.read();
            ensure_alive(&state)?;
            if position == 0 {
                return Err(QueueError::NoSongPosition);
            }

            if position > 0 {
                let target =
                    usize::try_from(position - 1).map_err(|_| QueueError::NoSongPosition)?;
                if target >= state.songs.len() {
                    return Err(QueueError::NoSongPosition);
                }
                if target == 0 {
                    let current = state.songs[0].clone();
                    drop(state);
                    return finish(permit, current);
                }
                (state.songs[target].clone(), PendingTransition::Skip, target)
            } else {
                if !self.options.save_previous_songs {
                    return Err(QueueError::DisabledOption("save_previous_songs"));
                }
                let steps = usize::try_from(position.unsigned_abs())
                    .map_err(|_| QueueError::NoSongPosition)?;
                let available = state.previous_songs.len();
                if steps > available {
                    return Err(QueueError::NoSongPosition);
                }

                let song = state.previous_songs[available - steps]
                    .as_song()
                    .cloned()
                    .ok_or(QueueError::NoSongPosition)?;
                (song, PendingTransition::Previous, steps)
            }
        };

        self.transport.stop().await?;
        {
            let mut state = self.state.write();
            match transition {
                PendingTransition::Skip => {
                    let retain = self.options.save_previous_songs;
                    let skipped: Vec<PlayedSong> = state
                        .songs
                        .drain(1..distance)
                        .map(|song| PlayedSong::record(song, retain))
                        .collect();
                    state.previous_songs.extend(skipped);
                }
                PendingTransition::Previous => {
                    // El último paso lo completa el manejador de fin de canción
                    let keep = state.previous_songs.len() - (distance - 1);
                    let rewound: Vec<Song> = state
                        .previous_songs
                        .split_off(keep)
                        .into_iter()
                        .filter_map(PlayedSong::into_song)
                        .collect();
                    state.songs.splice(0..0, rewound);
                }
                PendingTransition::None => {}
            }
            state.transition = transition;
        }

        info!("🎯 Saltando ({:?}) a: {}", transition, song.name);
        finish(permit, song)
    }

    /// Cambia el modo de repetición.
    ///
    /// Sin argumento avanza en el ciclo; con el modo actual lo desactiva.
    pub async fn set_repeat_mode(&self, mode: Option<RepeatMode>) -> Result<RepeatMode> {
        let _permit = self.tasks.acquire().await;
        let mut state = self.state.write();
        ensure_alive(&state)?;

        state.repeat_mode = match mode {
            None => state.repeat_mode.next(),
            Some(mode) if mode == state.repeat_mode => RepeatMode::Disabled,
            Some(mode) => mode,
        };

        match state.repeat_mode {
            RepeatMode::Disabled => info!("➡️ Repetición desactivada"),
            RepeatMode::Song => info!("🔂 Repetir canción activado"),
            RepeatMode::Queue => info!("🔁 Repetir cola activado"),
        }
        Ok(state.repeat_mode)
    }

    /// Activa o desactiva el autoplay y devuelve el nuevo valor
    pub async fn toggle_autoplay(&self) -> Result<bool> {
        let _permit = self.tasks.acquire().await;
        let mut state = self.state.write();
        ensure_alive(&state)?;
        state.autoplay = !state.autoplay;
        info!("📻 Autoplay: {}", state.autoplay);
        Ok(state.autoplay)
    }

    /// Reinicia la canción actual desde `time` segundos
    pub async fn seek(&self, time: f64) -> Result<()> {
        if !time.is_finite() {
            return Err(QueueError::InvalidType {
                expected: "un número finito",
                actual: time.to_string(),
                name: "time",
            });
        }
        if time < 0.0 {
            return Err(QueueError::NumberCompare {
                name: "time",
                value: time,
                min: 0.0,
            });
        }

        let _permit = self.tasks.acquire().await;
        {
            let mut state = self.state.write();
            ensure_alive(&state)?;
            state.begin_time = Duration::from_secs_f64(time);
        }

        debug!("⏩ Seek a {}s en guild {}", time, self.id);
        self.start_playback(false).await
    }

    /// Ajusta el volumen del transporte (0.0 a 2.0)
    pub async fn set_volume(&self, volume: f32) -> Result<f32> {
        if !volume.is_finite() {
            return Err(QueueError::InvalidType {
                expected: "un número finito",
                actual: volume.to_string(),
                name: "volume",
            });
        }
        if self.is_stopped() {
            return Err(QueueError::QueueStopped);
        }

        let clamped = volume.clamp(0.0, 2.0);
        self.transport.set_volume(clamped).await?;
        info!("🔊 Volumen ajustado a {}%", (clamped * 100.0) as u32);
        Ok(clamped)
    }

    /// Agrega una canción relacionada con la actual y la devuelve
    pub async fn add_related_song(&self) -> Result<Song> {
        let _permit = self.tasks.acquire().await;
        ensure_alive(&self.state.read())?;
        self.append_related_song().await
    }

    /// Inicia la reproducción de la canción actual
    pub async fn play(&self, emit_event: bool) -> Result<()> {
        let _permit = self.tasks.acquire().await;
        self.start_playback(emit_event).await
    }

    /// Detiene el transporte y destruye la cola
    pub async fn stop(&self) -> Result<()> {
        let permit = self.tasks.acquire().await;
        ensure_alive(&self.state.read())?;

        if let Err(e) = self.transport.stop().await {
            warn!("⚠️ Error al detener el transporte: {:?}", e);
        }
        if self.options.leave_on_stop {
            if let Err(e) = self.transport.leave().await {
                warn!("⚠️ Error al abandonar el canal de voz: {:?}", e);
            }
        }

        self.teardown(&permit);
        info!("⏹️ Reproducción detenida en guild {}", self.id);
        Ok(())
    }

    /// Destruye la cola sin tocar el transporte
    pub async fn remove(&self) {
        let permit = self.tasks.acquire().await;
        self.teardown(&permit);
    }

    // Eventos del transporte

    pub(crate) async fn handle_transport_event(&self, event: TransportEvent) {
        let result = match event {
            TransportEvent::Finish => self.handle_song_finish().await,
            TransportEvent::Error(message) => self.handle_transport_error(message).await,
        };
        if let Err(e) = result {
            error!("❌ Error al avanzar la cola de guild {}: {:?}", self.id, e);
        }
    }

    /// Avanza a la siguiente canción cuando termina la actual
    pub async fn handle_song_finish(&self) -> Result<()> {
        if let Some(song) = self.current_song() {
            self.emit(QueueEvent::FinishSong {
                guild_id: self.id,
                song,
            });
        }

        let permit = self.tasks.acquire().await;
        let (transition, exhausted) = {
            let mut state = self.state.write();
            if state.stopped {
                return Ok(());
            }

            let transition = state.transition;
            if state.repeat_mode == RepeatMode::Queue && transition != PendingTransition::Previous {
                if let Some(head) = state.songs.first().cloned() {
                    state.songs.push(head);
                }
            }

            if transition == PendingTransition::Previous {
                if state.repeat_mode == RepeatMode::Queue {
                    if let Some(last) = state.songs.pop() {
                        state.songs.insert(0, last);
                    }
                } else if let Some(previous) =
                    state.previous_songs.pop().and_then(PlayedSong::into_song)
                {
                    state.songs.insert(0, previous);
                }
            }

            let exhausted = state.songs.len() <= 1
                && (transition == PendingTransition::Skip
                    || state.repeat_mode == RepeatMode::Disabled);
            (transition, exhausted)
        };

        if exhausted {
            let autoplay = self.autoplay();
            if autoplay {
                if let Err(e) = self.append_related_song().await {
                    debug!("Autoplay sin resultados en guild {}: {}", self.id, e);
                    self.emit(QueueEvent::NoRelated(self.id));
                }
            }

            if self.len() <= 1 {
                info!("📭 Cola terminada en guild {}", self.id);
                if !autoplay {
                    self.emit(QueueEvent::Finish(self.id));
                }
                if self.options.leave_on_finish {
                    if let Err(e) = self.transport.leave().await {
                        warn!("⚠️ Error al abandonar el canal de voz: {:?}", e);
                    }
                }
                self.teardown(&permit);
                return Ok(());
            }
        }

        let replay = {
            let mut state = self.state.write();
            let replay = transition == PendingTransition::None
                && state.repeat_mode == RepeatMode::Song;
            if transition != PendingTransition::Previous && !replay && !state.songs.is_empty() {
                let finished = state.songs.remove(0);
                state
                    .previous_songs
                    .push(PlayedSong::record(finished, self.options.save_previous_songs));
            }
            state.transition = PendingTransition::None;
            state.begin_time = Duration::ZERO;
            replay
        };

        if replay {
            info!("🔂 Repitiendo canción en guild {}", self.id);
        }
        self.start_playback(!replay).await
    }

    /// Descarta la canción que falló y continúa con la siguiente
    pub async fn handle_transport_error(&self, message: String) -> Result<()> {
        error!("❌ Error de reproducción en guild {}: {}", self.id, message);
        self.emit(QueueEvent::Error {
            guild_id: self.id,
            message,
        });

        let permit = self.tasks.acquire().await;
        let has_next = {
            let mut state = self.state.write();
            if state.stopped {
                return Ok(());
            }
            if !state.songs.is_empty() {
                let failed = state.songs.remove(0);
                warn!("⏭️ Saltando canción problemática: {}", failed.name);
            }
            state.transition = PendingTransition::None;
            state.begin_time = Duration::ZERO;
            !state.songs.is_empty()
        };

        if has_next {
            self.start_playback(true).await
        } else {
            self.teardown(&permit);
            Ok(())
        }
    }

    // Funciones privadas (requieren la exclusividad)

    async fn start_playback(&self, emit_event: bool) -> Result<()> {
        {
            let mut state = self.state.write();
            ensure_alive(&state)?;
            state.playing = true;
            state.paused = false;
        }

        let manager = self.manager.upgrade().ok_or(QueueError::QueueStopped)?;
        manager.play_song(self, emit_event).await
    }

    async fn append_related_song(&self) -> Result<Song> {
        let (current, played) = {
            let state = self.state.read();
            let current = state
                .songs
                .first()
                .cloned()
                .ok_or(QueueError::NoPlayingSong)?;
            let played: HashSet<String> = state
                .previous_songs
                .iter()
                .map(|song| song.id().to_string())
                .collect();
            (current, played)
        };

        let mut related = related::find_related(&*self.related, &current, &played).await;
        if related.is_none() {
            if let Some(source) = current.source.as_deref() {
                debug!("🔁 Reintentando relacionadas con la fuente original: {}", source.name);
                related = related::find_related(&*self.related, source, &played).await;
            }
        }

        let mut song = related.ok_or(QueueError::NoRelated)?;
        song.member = current.member;
        song.metadata = current.metadata.clone();

        {
            let mut state = self.state.write();
            ensure_alive(&state)?;
            state.songs.push(song.clone());
        }

        info!("📻 Canción relacionada agregada: {}", song.name);
        self.emit(QueueEvent::AddSong {
            guild_id: self.id,
            song: song.clone(),
        });
        Ok(song)
    }

    fn teardown(&self, _permit: &TaskPermit<'_>) {
        {
            let mut state = self.state.write();
            if state.stopped {
                return;
            }
            state.stopped = true;
            state.playing = false;
            state.paused = false;
            state.transition = PendingTransition::None;
            state.songs.clear();
            state.previous_songs.clear();
        }

        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }

        if let Some(manager) = self.manager.upgrade() {
            manager.remove_queue(self.id);
            manager.emit(QueueEvent::DeleteQueue(self.id));
        }
        info!("🗑️ Cola eliminada para guild {}", self.id);
    }

    fn emit(&self, event: QueueEvent) {
        if let Some(manager) = self.manager.upgrade() {
            manager.emit(event);
        }
    }
}

impl fmt::Debug for GuildQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuildQueue")
            .field("id", &self.id)
            .field("state", &*self.state.read())
            .field("text_channel", &self.text_channel)
            .finish_non_exhaustive()
    }
}

/// Libera la exclusividad de un comando exitoso
fn finish<T>(permit: TaskPermit<'_>, value: T) -> Result<T> {
    permit.release()?;
    Ok(value)
}

fn ensure_alive(state: &QueueState) -> Result<()> {
    if state.stopped {
        Err(QueueError::QueueStopped)
    } else {
        Ok(())
    }
}

fn empty_songs() -> QueueError {
    QueueError::InvalidType {
        expected: "una canción o una lista de canciones",
        actual: "lista vacía".to_string(),
        name: "songs",
    }
}

/// Permutación uniforme en el lugar
fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}
