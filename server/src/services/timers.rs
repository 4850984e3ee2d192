//! Background timers — turn-deadline enforcement and idle-room sweeping.
//!
//! DESIGN
//! ======
//! Two spawned interval loops. Each tick snapshots the registry under the
//! read lock, then visits rooms one at a time so a slow room never blocks
//! the others. A forced pass goes through the same `play_move` path as a
//! player's own submission and contends for the same room lock; whichever
//! wins applies first. Internal failures of a forced pass are logged and
//! swallowed; clients only ever see the normal `turnUpdate`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use crate::envelope::MoveAction;
use crate::services::game;
use crate::services::room::{RoomStatus, SharedRoom};
use crate::state::{now_ms, AppState};
use crate::views;

/// Spawn the 1-second turn tick. Returns a handle for shutdown.
pub fn spawn_turn_ticker(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_millis(state.config.turn_tick_ms);
    info!(tick_ms = state.config.turn_tick_ms, "turn ticker configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            tick_turns(&state, now_ms()).await;
        }
    })
}

/// Spawn the idle-room sweep. Returns a handle for shutdown.
pub fn spawn_idle_sweeper(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.sweep_interval_secs);
    info!(
        sweep_interval_secs = state.config.sweep_interval_secs,
        idle_room_ttl_secs = state.config.idle_room_ttl_secs,
        "idle sweeper configured"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let swept = sweep_idle(&state, now_ms()).await;
            if swept > 0 {
                info!(swept, "idle rooms evicted");
            }
        }
    })
}

async fn registry_snapshot(state: &AppState) -> Vec<(String, SharedRoom)> {
    state
        .rooms
        .read()
        .await
        .iter()
        .map(|(code, room)| (code.clone(), room.clone()))
        .collect()
}

/// Force a pass in every playing room whose turn deadline has lapsed.
pub(crate) async fn tick_turns(state: &AppState, now: i64) {
    for (code, shared) in registry_snapshot(state).await {
        let batch = {
            let mut room = shared.lock().await;
            let expired = room.status == RoomStatus::Playing
                && room.game.as_ref().is_some_and(|g| now > g.turn_ends_at);
            if !expired {
                continue;
            }
            let Some(absent) = room.game.as_ref().map(|g| g.active_player_id) else {
                continue;
            };

            let mut rng = StdRng::from_os_rng();
            match game::play_move(
                &mut room,
                state.words.as_ref(),
                &state.config,
                &mut rng,
                absent,
                MoveAction::Pass,
                &[],
                &[],
                now,
            )
            .await
            {
                Ok(outcome) => {
                    info!(%code, player_id = %absent, "turn timed out; forced pass");
                    views::move_batch(&room, &outcome, false)
                }
                Err(e) => {
                    warn!(%code, error = %e, "forced pass failed");
                    continue;
                }
            }
        };
        state.send_many(batch).await;
    }
}

/// Delete rooms that have no connected player and have been idle past the
/// configured threshold. Returns how many were deleted.
pub(crate) async fn sweep_idle(state: &AppState, now: i64) -> usize {
    let ttl_ms = (state.config.idle_room_ttl_secs * 1000) as i64;

    let mut expired: Vec<String> = Vec::new();
    for (code, shared) in registry_snapshot(state).await {
        let room = shared.lock().await;
        let unconnected = room.players.iter().all(|p| !p.connected);
        if unconnected && now - room.last_activity_at > ttl_ms {
            expired.push(code);
        }
    }
    if expired.is_empty() {
        return 0;
    }

    let mut swept = 0;
    let mut rooms = state.rooms.write().await;
    for code in expired {
        let Some(shared) = rooms.get(&code).cloned() else {
            continue;
        };
        // Re-check under the registry write lock: a player may have come
        // back between the scan and now.
        let room = shared.lock().await;
        let still_idle =
            room.players.iter().all(|p| !p.connected) && now - room.last_activity_at > ttl_ms;
        if !still_idle {
            continue;
        }
        let member_ids: Vec<Uuid> = room.players.iter().map(|p| p.id).collect();
        drop(room);

        rooms.remove(&code);
        let mut links = state.links.write().await;
        for id in member_ids {
            links.player_room.remove(&id);
        }
        drop(links);
        info!(%code, "idle room deleted");
        swept += 1;
    }
    swept
}

#[cfg(test)]
#[path = "timers_test.rs"]
mod tests;
