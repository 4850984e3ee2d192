//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the room registry, the link maps that tie transport connections to
//! players and players to rooms, the dictionary, and the config. Rooms and
//! players never reference each other directly; everything goes through
//! stable ids and these maps.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::envelope::ServerMsg;
use crate::services::room::SharedRoom;
use crate::words::Lexicon;

/// Current time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// LINK MAPS
// =============================================================================

/// Id-based lookups binding connections, players, and rooms.
///
/// A connection binds to at most one player at a time; a player sits in at
/// most one room. Disconnects clear the connection half only; the player
/// keeps their seat for reconnection.
#[derive(Default)]
pub struct Links {
    /// Connection id → outbound message queue.
    pub senders: HashMap<Uuid, mpsc::Sender<ServerMsg>>,
    /// Connection id → bound player.
    pub conn_player: HashMap<Uuid, Uuid>,
    /// Player id → current connection.
    pub player_conn: HashMap<Uuid, Uuid>,
    /// Player id → room code.
    pub player_room: HashMap<Uuid, String>,
}

impl Links {
    /// Bind a connection to a player, replacing any previous binding on
    /// either side.
    pub fn bind(&mut self, conn_id: Uuid, player_id: Uuid) {
        if let Some(old_conn) = self.player_conn.insert(player_id, conn_id) {
            self.conn_player.remove(&old_conn);
        }
        self.conn_player.insert(conn_id, player_id);
    }

    /// Drop everything keyed by a closed connection. Returns the player that
    /// was bound, if any.
    pub fn drop_conn(&mut self, conn_id: Uuid) -> Option<Uuid> {
        self.senders.remove(&conn_id);
        let player_id = self.conn_player.remove(&conn_id)?;
        if self.player_conn.get(&player_id) == Some(&conn_id) {
            self.player_conn.remove(&player_id);
        }
        Some(player_id)
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    /// Room code → room, each behind its own mutex.
    pub rooms: Arc<RwLock<HashMap<String, SharedRoom>>>,
    pub links: Arc<RwLock<Links>>,
    pub words: Arc<dyn Lexicon>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, words: Arc<dyn Lexicon>) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            links: Arc::new(RwLock::new(Links::default())),
            words,
            config: Arc::new(config),
        }
    }

    /// Look up a room by code.
    pub async fn room(&self, code: &str) -> Option<SharedRoom> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Fan a batch of player-addressed messages out to live connections.
    /// Best-effort: a full or missing channel drops the message.
    /// Callers build the batch under the room lock and call this after
    /// releasing it, so sends never block room mutation.
    pub async fn send_many(&self, batch: Vec<(Uuid, ServerMsg)>) {
        let links = self.links.read().await;
        for (player_id, msg) in batch {
            let Some(conn_id) = links.player_conn.get(&player_id) else {
                continue;
            };
            if let Some(tx) = links.senders.get(conn_id) {
                let _ = tx.try_send(msg);
            }
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
