use super::*;
use crate::services::room::{Player, Room};
use crate::state::now_ms;
use crate::words::OpenLexicon;
use rand::rngs::StdRng;
use rand::SeedableRng;

const NOW: i64 = 10_000;

fn fresh_room(n: usize) -> (Room, Vec<Uuid>) {
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

fn started(n: usize) -> (Room, Vec<Uuid>, ServerConfig) {
    let (mut room, ids) = fresh_room(n);
    let config = ServerConfig::default();
    let mut rng = StdRng::seed_from_u64(21);
    start_game(&mut room, &config, &mut rng, ids[0], NOW).unwrap();
    (room, ids, config)
}

/// Hand a player a specific rack of 1-point tiles (ids from 900).
fn give_rack(room: &mut Room, player_id: Uuid, letters: &str) -> Vec<Tile> {
    let rack: Vec<Tile> = letters
        .chars()
        .enumerate()
        .map(|(i, c)| Tile::lettered(900 + i as u32, c, 1))
        .collect();
    room.players
        .iter_mut()
        .find(|p| p.id == player_id)
        .unwrap()
        .rack = rack.clone();
    rack
}

fn row_placements(rack: &[Tile], x0: u8, y: u8) -> Vec<Placement> {
    rack.iter()
        .enumerate()
        .map(|(i, t)| Placement { tile_id: t.id, x: x0 + i as u8, y, letter: None })
        .collect()
}

async fn pass(room: &mut Room, config: &ServerConfig, player_id: Uuid, now: i64) -> MoveOutcome {
    let mut rng = StdRng::seed_from_u64(0);
    play_move(room, &OpenLexicon, config, &mut rng, player_id, MoveAction::Pass, &[], &[], now)
        .await
        .unwrap()
}

// =============================================================
// Start
// =============================================================

#[test]
fn start_game_deals_and_arms_the_first_turn() {
    let (room, ids, config) = started(3);
    assert_eq!(room.status, RoomStatus::Playing);

    let game = room.game.as_ref().unwrap();
    assert_eq!(game.version, 1);
    assert_eq!(game.turn_index, 0);
    assert_eq!(game.active_player_id, ids[0]);
    assert_eq!(game.turn_ends_at, NOW + config.turn_duration_ms as i64);
    assert_eq!(game.bag.len(), 100 - 3 * 7);
    assert_eq!(game.consecutive_passes, 0);
    assert!(game.moves.is_empty());

    for player in &room.players {
        assert_eq!(player.rack.len(), 7);
        assert_eq!(player.score, 0);
        assert!(!player.ready, "ready flags reset at start");
        assert_eq!(player.stats, Default::default());
    }
}

#[test]
fn start_game_rejects_non_host() {
    let (mut room, ids) = fresh_room(2);
    let mut rng = StdRng::seed_from_u64(1);
    let err = start_game(&mut room, &ServerConfig::default(), &mut rng, ids[1], NOW).unwrap_err();
    assert!(matches!(err, GameError::NotHost));
    assert!(room.game.is_none());
}

#[test]
fn start_game_requires_two_players() {
    let (mut room, ids) = fresh_room(1);
    let mut rng = StdRng::seed_from_u64(1);
    let err = start_game(&mut room, &ServerConfig::default(), &mut rng, ids[0], NOW).unwrap_err();
    assert!(matches!(err, GameError::MinPlayers));
}

#[test]
fn start_game_requires_everyone_ready() {
    let (mut room, ids) = fresh_room(2);
    room.players[1].ready = false;
    let mut rng = StdRng::seed_from_u64(1);
    let err = start_game(&mut room, &ServerConfig::default(), &mut rng, ids[0], NOW).unwrap_err();
    assert!(matches!(err, GameError::NotAllReady));
}

#[test]
fn start_game_rejects_restart() {
    let (mut room, ids, config) = started(2);
    let mut rng = StdRng::seed_from_u64(1);
    let err = start_game(&mut room, &config, &mut rng, ids[0], NOW).unwrap_err();
    assert!(matches!(err, GameError::InvalidState));
}

// =============================================================
// Preconditions
// =============================================================

#[tokio::test]
async fn move_without_game_is_invalid_state() {
    let (mut room, ids) = fresh_room(2);
    let mut rng = StdRng::seed_from_u64(1);
    let err = play_move(
        &mut room,
        &OpenLexicon,
        &ServerConfig::default(),
        &mut rng,
        ids[0],
        MoveAction::Pass,
        &[],
        &[],
        NOW,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GameError::InvalidState));
}

#[tokio::test]
async fn move_out_of_turn_is_rejected() {
    let (mut room, ids, config) = started(2);
    let mut rng = StdRng::seed_from_u64(1);
    let err = play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        ids[1],
        MoveAction::Pass,
        &[],
        &[],
        NOW,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GameError::NotYourTurn));
    assert_eq!(room.game.as_ref().unwrap().version, 1, "rejected move must not mutate");
}

#[tokio::test]
async fn move_by_stranger_is_rejected() {
    let (mut room, _, config) = started(2);
    let mut rng = StdRng::seed_from_u64(1);
    let err = play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        Uuid::new_v4(),
        MoveAction::Pass,
        &[],
        &[],
        NOW,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GameError::NotInRoom));
}

// =============================================================
// Pass
// =============================================================

#[tokio::test]
async fn pass_advances_turn_and_counts() {
    let (mut room, ids, config) = started(2);
    let outcome = pass(&mut room, &config, ids[0], NOW + 500).await;

    assert_eq!(outcome.record.action, MoveAction::Pass);
    assert_eq!(outcome.record.score, 0);
    assert_eq!(outcome.record.turn, 1);
    assert!(outcome.end.is_none());

    let game = room.game.as_ref().unwrap();
    assert_eq!(game.version, 2);
    assert_eq!(game.active_player_id, ids[1]);
    assert_eq!(game.consecutive_passes, 1);
    assert_eq!(game.turn_ends_at, NOW + 500 + config.turn_duration_ms as i64);
    assert_eq!(room.players[0].stats.passes, 1);
}

#[tokio::test]
async fn passes_leave_board_bag_and_racks_untouched() {
    let (mut room, ids, config) = started(4);
    let racks_before: Vec<Vec<Tile>> = room.players.iter().map(|p| p.rack.clone()).collect();
    let bag_before = room.game.as_ref().unwrap().bag.clone();

    for (i, id) in ids.iter().enumerate() {
        pass(&mut room, &config, *id, NOW + i as i64).await;
    }

    let game = room.game.as_ref().unwrap();
    assert_eq!(game.consecutive_passes, 4);
    assert_eq!(game.version, 5);
    assert!(game.board.is_empty());
    assert_eq!(game.bag, bag_before);
    let racks_after: Vec<Vec<Tile>> = room.players.iter().map(|p| p.rack.clone()).collect();
    assert_eq!(racks_after, racks_before);
}

#[tokio::test]
async fn six_passes_end_the_game_with_rack_penalties() {
    let (mut room, ids, config) = started(2);
    let rack_values: Vec<i32> = room
        .players
        .iter()
        .map(|p| Tile::face_value(&p.rack) as i32)
        .collect();

    let mut end = None;
    for i in 0..6u32 {
        let player = ids[(i as usize) % 2];
        let outcome = pass(&mut room, &config, player, NOW + i64::from(i)).await;
        if i < 5 {
            assert!(outcome.end.is_none(), "game ended early on pass {i}");
        } else {
            end = outcome.end;
        }
    }

    let end = end.expect("sixth pass should end the game");
    assert_eq!(room.status, RoomStatus::Finished);
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(end.scores[id], -rack_values[i], "no finisher bonus on a stall-out");
    }
}

// =============================================================
// Exchange
// =============================================================

#[tokio::test]
async fn exchange_swaps_tiles_and_counts_as_non_scoring() {
    let (mut room, ids, config) = started(2);
    let bag_before = room.game.as_ref().unwrap().bag.len();
    let swap: Vec<u32> = room.players[0].rack.iter().take(3).map(|t| t.id).collect();

    let mut rng = StdRng::seed_from_u64(2);
    let outcome = play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Exchange,
        &[],
        &swap,
        NOW,
    )
    .await
    .unwrap();

    assert_eq!(outcome.record.action, MoveAction::Exchange);
    assert_eq!(outcome.record.score, 0);
    assert_eq!(room.players[0].rack.len(), 7);
    let game = room.game.as_ref().unwrap();
    assert_eq!(game.bag.len(), bag_before);
    assert_eq!(game.consecutive_passes, 1, "exchange counts toward the stall counter");
    assert_eq!(room.players[0].stats.passes, 1);
    assert_eq!(game.active_player_id, ids[1]);
}

#[tokio::test]
async fn exchange_stall_policy_is_configurable() {
    let (mut room, ids, _) = started(2);
    let config = ServerConfig { exchange_counts_as_pass: false, ..ServerConfig::default() };
    let swap: Vec<u32> = room.players[0].rack.iter().take(2).map(|t| t.id).collect();

    let mut rng = StdRng::seed_from_u64(3);
    play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Exchange,
        &[],
        &swap,
        NOW,
    )
    .await
    .unwrap();

    let game = room.game.as_ref().unwrap();
    assert_eq!(game.consecutive_passes, 0);
    assert_eq!(room.players[0].stats.passes, 1, "the stat still counts it");
}

#[tokio::test]
async fn exchange_with_empty_selection_is_rejected() {
    let (mut room, ids, config) = started(2);
    let mut rng = StdRng::seed_from_u64(4);
    let err = play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Exchange,
        &[],
        &[],
        NOW,
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "NO_TILES_TO_EXCHANGE");
}

#[tokio::test]
async fn exchange_larger_than_bag_is_rejected() {
    let (mut room, ids, config) = started(2);
    {
        let game = room.game.as_mut().unwrap();
        let remaining = game.bag.len();
        let _ = game.bag.draw(remaining - 2);
    }
    let swap: Vec<u32> = room.players[0].rack.iter().take(3).map(|t| t.id).collect();
    let mut rng = StdRng::seed_from_u64(5);
    let err = play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Exchange,
        &[],
        &swap,
        NOW,
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "BAG_TOO_SMALL");
}

// =============================================================
// Play
// =============================================================

#[tokio::test]
async fn opening_bingo_scores_and_updates_stats() {
    let (mut room, ids, config) = started(2);
    let rack = give_rack(&mut room, ids[0], "RETINAS");
    let placements = row_placements(&rack, 4, 7);

    let mut rng = StdRng::seed_from_u64(6);
    let outcome = play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Play,
        &placements,
        &[],
        NOW,
    )
    .await
    .unwrap();

    assert_eq!(outcome.record.words, vec!["RETINAS"]);
    assert_eq!(outcome.record.score, 64);
    assert!(outcome.end.is_none());

    let player = &room.players[0];
    assert_eq!(player.score, 64);
    assert_eq!(player.rack.len(), 7, "rack refilled after the play");
    assert_eq!(player.stats.words_played, 1);
    assert_eq!(player.stats.total_turns, 1);
    assert_eq!(player.stats.best_word_score, 64);
    assert_eq!(player.stats.best_word.as_deref(), Some("RETINAS"));

    let game = room.game.as_ref().unwrap();
    assert_eq!(game.version, 2);
    assert_eq!(game.active_player_id, ids[1]);
    assert_eq!(game.consecutive_passes, 0);
    assert_eq!(game.moves.len(), 1);
}

#[tokio::test]
async fn best_word_only_improves_on_strictly_higher_score() {
    let (mut room, ids, config) = started(2);

    let rack = give_rack(&mut room, ids[0], "RETINAS");
    let placements = row_placements(&rack, 4, 7);
    let mut rng = StdRng::seed_from_u64(7);
    play_move(&mut room, &OpenLexicon, &config, &mut rng, ids[0], MoveAction::Play, &placements, &[], NOW)
        .await
        .unwrap();
    pass(&mut room, &config, ids[1], NOW + 1).await;

    // A low-scoring follow-up: one S appended under the R forming a
    // two-letter column word.
    let tile = Tile::lettered(990, 'S', 1);
    room.players[0].rack = vec![tile.clone()];
    let placements = vec![Placement { tile_id: tile.id, x: 4, y: 8, letter: None }];
    let mut rng = StdRng::seed_from_u64(8);
    play_move(&mut room, &OpenLexicon, &config, &mut rng, ids[0], MoveAction::Play, &placements, &[], NOW + 2)
        .await
        .unwrap();

    let stats = &room.players[0].stats;
    assert_eq!(stats.best_word_score, 64, "lower-scoring play must not demote the best");
    assert_eq!(stats.best_word.as_deref(), Some("RETINAS"));
    assert_eq!(stats.words_played, 2);
    assert_eq!(stats.total_turns, 2);
}

#[tokio::test]
async fn rejected_word_leaves_state_untouched() {
    let state_words = "CAT\nDOG\n";
    let lexicon = crate::words::WordList::from_reader(std::io::Cursor::new(state_words)).unwrap();

    let (mut room, ids, config) = started(2);
    let rack = give_rack(&mut room, ids[0], "ZZT");
    let placements = row_placements(&rack, 6, 7);

    let mut rng = StdRng::seed_from_u64(9);
    let err = play_move(
        &mut room,
        &lexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Play,
        &placements,
        &[],
        NOW,
    )
    .await
    .unwrap_err();

    assert_eq!(err.error_code(), "INVALID_WORD");
    assert!(matches!(err, GameError::InvalidWord { ref word } if word == "ZZT"));

    let game = room.game.as_ref().unwrap();
    assert_eq!(game.version, 1);
    assert!(game.board.is_empty());
    assert_eq!(game.active_player_id, ids[0]);
    assert_eq!(room.players[0].rack.len(), 3);
    assert_eq!(room.players[0].score, 0);
}

struct StallingLexicon;

#[async_trait::async_trait]
impl crate::words::Lexicon for StallingLexicon {
    async fn is_valid(&self, _word: &str) -> bool {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        true
    }
}

#[tokio::test]
async fn dictionary_timeout_counts_as_invalid() {
    let (mut room, ids, _) = started(2);
    let config = ServerConfig { word_lookup_timeout_ms: 10, ..ServerConfig::default() };
    let rack = give_rack(&mut room, ids[0], "CAT");
    let placements = row_placements(&rack, 6, 7);

    let mut rng = StdRng::seed_from_u64(10);
    let err = play_move(
        &mut room,
        &StallingLexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Play,
        &placements,
        &[],
        NOW,
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_WORD");
}

#[tokio::test]
async fn geometry_errors_surface_their_codes() {
    let (mut room, ids, config) = started(2);
    let rack = give_rack(&mut room, ids[0], "CAT");
    // Off-center opening.
    let placements = row_placements(&rack, 0, 0);

    let mut rng = StdRng::seed_from_u64(11);
    let err = play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Play,
        &placements,
        &[],
        NOW,
    )
    .await
    .unwrap_err();
    assert_eq!(err.error_code(), "MUST_COVER_CENTER");
}

// =============================================================
// End of game
// =============================================================

#[tokio::test]
async fn emptied_rack_with_empty_bag_ends_and_pays_the_finisher() {
    let (mut room, ids, config) = started(2);
    {
        let game = room.game.as_mut().unwrap();
        let remaining = game.bag.len();
        let _ = game.bag.draw(remaining);
    }
    let rack = give_rack(&mut room, ids[0], "AT");
    let placements = row_placements(&rack, 7, 7);
    // Opponent is stuck with 7 tiles; remember their face value.
    let opponent_face = Tile::face_value(&room.players[1].rack) as i32;

    let mut rng = StdRng::seed_from_u64(12);
    let outcome = play_move(
        &mut room,
        &OpenLexicon,
        &config,
        &mut rng,
        ids[0],
        MoveAction::Play,
        &placements,
        &[],
        NOW,
    )
    .await
    .unwrap();

    let end = outcome.end.expect("playing out should end the game");
    assert_eq!(room.status, RoomStatus::Finished);

    // AT on the center star: (1 + 1) × 2, no penalty, plus the leftovers.
    assert_eq!(end.scores[&ids[0]], 4 + opponent_face);
    assert_eq!(end.scores[&ids[1]], -opponent_face);
    assert_eq!(end.winner_ids, vec![ids[0]]);
}

#[tokio::test]
async fn version_counts_every_successful_move() {
    let (mut room, ids, config) = started(2);
    for i in 0..4u32 {
        let player = ids[(i as usize) % 2];
        pass(&mut room, &config, player, NOW + i64::from(i)).await;
    }
    assert_eq!(room.game.as_ref().unwrap().version, 5);
    assert_eq!(room.game.as_ref().unwrap().moves.len(), 4);
}
