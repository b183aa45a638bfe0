//! # Error Types
//!
//! User-facing failures of the guild queue commands.
//!
//! Every command returns [`QueueError`] synchronously to its caller. The
//! Display text is what the bot shows in the reply, [`QueueError::code`]
//! is the stable kind name used in logs.

use thiserror::Error;

use crate::audio::task_queue::TaskQueueError;

#[derive(Error, Debug)]
pub enum QueueError {
    /// The queue has been torn down
    #[error("La cola ya fue detenida")]
    QueueStopped,

    /// Argument with the wrong shape or type
    #[error("Se esperaba {expected} en '{name}', se recibió: {actual}")]
    InvalidType {
        expected: &'static str,
        actual: String,
        name: &'static str,
    },

    #[error("La reproducción ya está en pausa")]
    Paused,

    #[error("La reproducción no está en pausa")]
    Resumed,

    #[error("No hay una siguiente canción en la cola")]
    NoUpNext,

    #[error("No hay canciones anteriores")]
    NoPrevious,

    #[error("No existe una canción en esa posición")]
    NoSongPosition,

    /// A required option is turned off
    #[error("La opción '{0}' está desactivada")]
    DisabledOption(&'static str),

    #[error("No hay ninguna canción reproduciéndose")]
    NoPlayingSong,

    #[error("No se encontraron canciones relacionadas")]
    NoRelated,

    /// Numeric argument outside its allowed range
    #[error("'{name}' debe ser mayor o igual a {min}, se recibió: {value}")]
    NumberCompare {
        name: &'static str,
        value: f64,
        min: f64,
    },

    /// Consistency defect inside the task queue, never caused by the user
    #[error("Error interno de la cola: {0}")]
    Internal(#[from] TaskQueueError),

    /// Unexpected failure while talking to the voice transport
    #[error("Error de transporte de audio: {0}")]
    Transport(#[from] anyhow::Error),
}

impl QueueError {
    /// Nombre estable del tipo de error
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueueStopped => "QUEUE_STOPPED",
            Self::InvalidType { .. } => "INVALID_TYPE",
            Self::Paused => "PAUSED",
            Self::Resumed => "RESUMED",
            Self::NoUpNext => "NO_UP_NEXT",
            Self::NoPrevious => "NO_PREVIOUS",
            Self::NoSongPosition => "NO_SONG_POSITION",
            Self::DisabledOption(_) => "DISABLED_OPTION",
            Self::NoPlayingSong => "NO_PLAYING_SONG",
            Self::NoRelated => "NO_RELATED",
            Self::NumberCompare { .. } => "NUMBER_COMPARE",
            Self::Internal(_) => "INTERNAL",
            Self::Transport(_) => "TRANSPORT",
        }
    }

    /// Errores que indican un defecto y no un uso incorrecto
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(QueueError::NoUpNext.code(), "NO_UP_NEXT");
        assert_eq!(
            QueueError::DisabledOption("save_previous_songs").code(),
            "DISABLED_OPTION"
        );
        assert!(!QueueError::Paused.is_internal());
        assert!(QueueError::Internal(TaskQueueError::NotActive { ticket: 3 }).is_internal());
    }

    #[test]
    fn test_invalid_type_message() {
        let err = QueueError::InvalidType {
            expected: "un número finito",
            actual: "NaN".to_string(),
            name: "time",
        };
        assert_eq!(
            err.to_string(),
            "Se esperaba un número finito en 'time', se recibió: NaN"
        );
    }
}
