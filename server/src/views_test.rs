use super::*;
use crate::config::ServerConfig;
use crate::services::game::{self, MoveOutcome};
use crate::services::room::RoomStatus;
use crate::state::now_ms;
use crate::words::OpenLexicon;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::envelope::MoveAction;

fn seeded_room(n: usize) -> (Room, Vec<Uuid>) {
    let players: Vec<Player> = (0..n)
        .map(|i| {
            let mut p = Player::new(Uuid::new_v4(), &format!("player{i}"));
            p.ready = true;
            p
        })
        .collect();
    let ids: Vec<Uuid> = players.iter().map(|p| p.id).collect();
    let room = Room {
        code: "AB2C".into(),
        host_id: ids[0],
        status: RoomStatus::Waiting,
        max_players: 4,
        players,
        game: None,
        last_activity_at: now_ms(),
    };
    (room, ids)
}

fn started_room(n: usize) -> (Room, Vec<Uuid>) {
    let (mut room, ids) = seeded_room(n);
    let config = ServerConfig::default();
    let mut rng = StdRng::seed_from_u64(11);
    game::start_game(&mut room, &config, &mut rng, ids[0], 1_000).unwrap();
    (room, ids)
}

#[test]
fn room_view_never_exposes_racks() {
    let (room, _) = started_room(2);
    let view = room_view(&room);
    assert_eq!(view.room_id, "AB2C");
    assert_eq!(view.players.len(), 2);
    for player in &view.players {
        assert!(player.rack.is_none());
        assert_eq!(player.rack_size, 7);
    }
}

#[test]
fn game_view_populates_only_the_recipients_rack() {
    let (room, ids) = started_room(3);
    let game = room.game.as_ref().unwrap();

    let view = game_view_for(&room, game, Some(ids[1]));
    for player in &view.players {
        if player.id == ids[1] {
            assert_eq!(player.rack.as_ref().map(Vec::len), Some(7));
        } else {
            assert!(player.rack.is_none(), "rack leaked to {}", player.nickname);
        }
    }
    assert_eq!(view.version, 1);
    assert_eq!(view.active_player_id, ids[0]);
    assert_eq!(view.bag_count, 100 - 3 * 7);
}

#[test]
fn full_state_carries_game_only_when_running() {
    let (waiting, ids) = seeded_room(2);
    let ServerMsg::FullState { game_state, .. } = full_state(&waiting, ids[0]) else {
        panic!("expected fullState");
    };
    assert!(game_state.is_none());

    let (playing, ids) = started_room(2);
    let ServerMsg::FullState { game_state, .. } = full_state(&playing, ids[0]) else {
        panic!("expected fullState");
    };
    assert!(game_state.is_some());
}

#[test]
fn room_update_batch_addresses_every_seat() {
    let (room, ids) = seeded_room(3);
    let batch = room_update_batch(&room);
    let recipients: Vec<Uuid> = batch.iter().map(|(id, _)| *id).collect();
    assert_eq!(recipients, ids);
    assert!(batch.iter().all(|(_, msg)| msg.kind() == "roomUpdate"));
}

#[test]
fn game_start_batch_has_room_state_and_turn_per_player() {
    let (room, ids) = started_room(2);
    let batch = game_start_batch(&room);
    assert_eq!(batch.len(), 2 * 3);

    let first_player: Vec<&str> = batch
        .iter()
        .filter(|(id, _)| *id == ids[0])
        .map(|(_, msg)| msg.kind())
        .collect();
    assert_eq!(first_player, vec!["roomUpdate", "gameState", "turnUpdate"]);
}

#[tokio::test]
async fn move_batch_orders_accept_state_turn() {
    let (mut room, ids) = started_room(2);
    let config = ServerConfig::default();
    let mut rng = StdRng::seed_from_u64(12);
    let outcome: MoveOutcome = game::play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Pass,
        &[],
        &[],
        2_000,
    )
    .await
    .unwrap();

    let batch = move_batch(&room, &outcome, true);
    let first_player: Vec<&str> = batch
        .iter()
        .filter(|(id, _)| *id == ids[0])
        .map(|(_, msg)| msg.kind())
        .collect();
    assert_eq!(first_player, vec!["moveAccepted", "gameState", "turnUpdate"]);

    // A silent (timer) batch skips the move announcement.
    let silent = move_batch(&room, &outcome, false);
    assert!(silent.iter().all(|(_, msg)| msg.kind() != "moveAccepted"));
}
