use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

#[test]
fn english_bag_has_100_tiles() {
    let bag = Bag::standard(Language::English, &mut rng());
    assert_eq!(bag.len(), 100);
    assert_eq!(bag.tiles().iter().filter(|t| t.joker).count(), 2);
}

#[test]
fn french_bag_has_102_tiles() {
    let bag = Bag::standard(Language::French, &mut rng());
    assert_eq!(bag.len(), 102);
    assert_eq!(bag.tiles().iter().filter(|t| t.joker).count(), 2);
}

#[test]
fn english_letter_counts_and_values() {
    let bag = Bag::standard(Language::English, &mut rng());
    let mut counts: HashMap<char, u32> = HashMap::new();
    for tile in bag.tiles() {
        if let Some(letter) = tile.letter {
            *counts.entry(letter).or_default() += 1;
        }
    }
    assert_eq!(counts[&'E'], 12);
    assert_eq!(counts[&'A'], 9);
    assert_eq!(counts[&'Q'], 1);
    assert_eq!(counts[&'Z'], 1);

    let q = bag.tiles().iter().find(|t| t.letter == Some('Q')).unwrap();
    assert_eq!(q.value, 10);
    let e = bag.tiles().iter().find(|t| t.letter == Some('E')).unwrap();
    assert_eq!(e.value, 1);
}

#[test]
fn french_distribution_differs_from_english() {
    let bag = Bag::standard(Language::French, &mut rng());
    let e_count = bag.tiles().iter().filter(|t| t.letter == Some('E')).count();
    assert_eq!(e_count, 15);
    let k = bag.tiles().iter().find(|t| t.letter == Some('K')).unwrap();
    assert_eq!(k.value, 10);
    let w = bag.tiles().iter().find(|t| t.letter == Some('W')).unwrap();
    assert_eq!(w.value, 10);
}

#[test]
fn tile_ids_are_unique() {
    let bag = Bag::standard(Language::English, &mut rng());
    let mut ids: Vec<_> = bag.tiles().iter().map(|t| t.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 100);
}

#[test]
fn seeded_shuffle_is_deterministic() {
    let a = Bag::standard(Language::English, &mut StdRng::seed_from_u64(7));
    let b = Bag::standard(Language::English, &mut StdRng::seed_from_u64(7));
    assert_eq!(a, b);

    let c = Bag::standard(Language::English, &mut StdRng::seed_from_u64(8));
    assert_ne!(a, c, "different seeds should order the bag differently");
}

#[test]
fn draw_pops_from_tail_and_respects_size() {
    let mut bag = Bag::standard(Language::English, &mut rng());
    let before: Vec<_> = bag.tiles().to_vec();

    let drawn = bag.draw(7);
    assert_eq!(drawn.len(), 7);
    assert_eq!(bag.len(), 93);
    assert_eq!(drawn, before[93..].to_vec());

    let rest = bag.draw(1000);
    assert_eq!(rest.len(), 93);
    assert!(bag.is_empty());
    assert_eq!(bag.draw(3).len(), 0);
}

#[test]
fn put_back_restores_count() {
    let mut r = rng();
    let mut bag = Bag::standard(Language::English, &mut r);
    let drawn = bag.draw(5);
    bag.put_back(drawn, &mut r);
    assert_eq!(bag.len(), 100);
}
