//! # Audio Module
//!
//! Per-guild playback queues for GuildTune.
//!
//! ## Architecture
//!
//! ### [`task_queue`] - Serial Task Queue
//! - FIFO admission of async commands, one at a time per guild
//! - RAII permits released on drop
//!
//! ### [`queue`] - Guild Queue
//! - Upcoming songs, history, repeat/autoplay state
//! - Every command runs under the guild's task queue, so concurrent chat
//!   commands are applied in arrival order and never interleave
//! - Advances on the transport's end-of-track notifications
//!
//! ### [`manager`] - Queue Manager
//! - Registry of live queues keyed by guild
//! - Starts songs on the transport and broadcasts [`manager::QueueEvent`]s
//!
//! ### [`transport`] - Voice Transport
//! - Songbird-backed audio connection behind the [`transport::Transport`] trait
//!
//! ### [`related`] - Related Songs
//! - Provider used by skip/autoplay to extend an exhausted queue

pub mod manager;
pub mod queue;
pub mod related;
pub mod song;
pub mod task_queue;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
