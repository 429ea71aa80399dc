use crate::domain::entities::Item;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Keeps at most one item per author, preserving each author's first
/// position. With `randomize` set, a later duplicate gets a seeded chance to
/// replace the earlier one, so one early post cannot permanently crowd out an
/// active author for the whole session.
pub fn dedup_by_author(items: Vec<Item>, randomize: bool, seed: u64, rng: &mut StdRng) -> Vec<Item> {
    let mut kept: Vec<Item> = Vec::with_capacity(items.len());
    let mut by_author: HashMap<String, usize> = HashMap::new();

    for (i, item) in items.into_iter().enumerate() {
        match by_author.get(&item.author) {
            Some(&pos) => {
                if randomize && i as u64 % 3 == seed % 3 && rng.gen_bool(0.5) {
                    kept[pos] = item;
                }
            }
            None => {
                by_author.insert(item.author.clone(), kept.len());
                kept.push(item);
            }
        }
    }

    kept
}

/// Interleaves the discover stream into the home stream: output position `p`
/// takes the next discover item when `p % rate == seed % rate`, otherwise the
/// next home item. When either stream runs out, the rest of the other is
/// appended. Deterministic for a given seed.
pub fn merge(home: Vec<Item>, discover: Vec<Item>, rate: u32, seed: u64) -> Vec<Item> {
    let rate = rate.max(1) as u64;
    let mut merged = Vec::with_capacity(home.len() + discover.len());
    let mut home = home.into_iter();
    let mut discover = discover.into_iter();

    loop {
        let take_discover = merged.len() as u64 % rate == seed % rate;
        let next = if take_discover {
            discover.next().or_else(|| home.next())
        } else {
            home.next().or_else(|| discover.next())
        };
        match next {
            Some(item) => merged.push(item),
            None => break,
        }
    }

    merged
}

/// Cosmetic variety within the already rate-controlled window: seeded
/// shuffle, one more dedup pass, then trim to the page size. Rank continuity
/// across pages is carried by the cursor boundaries, not by intra-page order.
pub fn shuffle_trim(
    items: Vec<Item>,
    limit: usize,
    seed: u64,
    randomize: bool,
    rng: &mut StdRng,
) -> Vec<Item> {
    let mut items = items;
    items.shuffle(rng);
    let mut deduped = dedup_by_author(items, randomize, seed, rng);
    deduped.truncate(limit);
    deduped
}
