//! Domain services used by the websocket coordinator and timers.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the room registry and game lifecycle so the
//! websocket handler can stay focused on protocol translation and session
//! plumbing.

pub mod game;
pub mod room;
pub mod timers;
