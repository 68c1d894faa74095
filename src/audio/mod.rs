//! # Audio Module
//!
//! Playback orchestration for Aurora Music.
//!
//! The bot does not decode audio itself: an external Lavalink node resolves
//! searches, decodes and pushes voice. What lives here is the state that the
//! node cannot keep for us:
//!
//! ### [`queue`] - Queue and history
//! - Pure per-guild playback queue (pending, current, capped history)
//! - Loop semantics and the one-shot shuffle
//!
//! ### [`player`] - Orchestrator
//! - One session per guild behind a mutex, created on first reference and
//!   torn down on stop
//! - Translates user intent and node events into queue mutations and node
//!   commands (best-effort)
//!
//! ### [`resolver`] - Search with fallback
//! - Tries a fixed list of search sources and keeps the first non-empty
//!   result
//!
//! ### [`node`] - Lavalink boundary
//! - Client construction, event hooks, voice connection handshake, filters

pub mod node;
pub mod player;
pub mod queue;
pub mod resolver;
