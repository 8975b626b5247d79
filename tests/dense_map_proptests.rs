use dense_map::{DenseMap, QuadraticProbe, MAX_LOAD};
use proptest::prelude::*;
use std::collections::BTreeMap;

// Model DenseMap against BTreeMap through the public API only.
proptest! {
    #[test]
    fn prop_dense_map_matches_btree_map(keys in 1u32..=40, ops in proptest::collection::vec((0u8..=3u8, 0u32..1000u32, any::<i16>()), 1..200)) {
        // keys in [0..keys-1]
        let mut m: DenseMap<u32, i16> = DenseMap::new();
        let mut model: BTreeMap<u32, i16> = BTreeMap::new();

        for (op, raw_k, v) in ops {
            let k = raw_k % keys;
            match op {
                // Insert returns the displaced value
                0 => prop_assert_eq!(m.insert(k, v), model.insert(k, v)),
                // Erase returns the removed value
                1 => prop_assert_eq!(m.erase(&k), model.remove(&k)),
                // Non-compacting lookup
                2 => prop_assert_eq!(m.get(&k), model.get(&k)),
                // Compacting lookup through a cursor
                3 => match m.find(&k) {
                    Some(c) => prop_assert_eq!(m.value_at(c).ok(), model.get(&k)),
                    None => prop_assert!(!model.contains_key(&k)),
                },
                _ => unreachable!(),
            }
            prop_assert_eq!(m.len(), model.len());
            prop_assert!(m.load_factor() <= MAX_LOAD);
        }

        let mut pairs: Vec<(u32, i16)> = m.into_iter().collect();
        pairs.sort_unstable();
        let expected: Vec<(u32, i16)> = model.into_iter().collect();
        prop_assert_eq!(pairs, expected);
    }
}

// Cursor walks visit each live entry exactly once, even when erasing along
// the way.
proptest! {
    #[test]
    fn prop_cursor_walk_with_erase(keys in proptest::collection::btree_set(0u64..5000, 0..150), modulus in 2u64..5) {
        let mut m: DenseMap<u64, u64, QuadraticProbe> = DenseMap::with_probe(QuadraticProbe);
        m.extend(keys.iter().map(|&k| (k, k)));

        let mut visited = 0usize;
        let mut cursor = m.first();
        while let Some(c) = cursor {
            visited += 1;
            let v = *m.value_at(c).expect("cursor from walk is live");
            if v % modulus == 0 {
                let (k, _) = m.erase_at(c).expect("cursor from walk is live");
                prop_assert_eq!(k, v);
            }
            cursor = m.advance(c).expect("erase_at keeps the generation");
        }
        prop_assert_eq!(visited, keys.len());
        let survivors = keys.iter().filter(|&&k| k % modulus != 0).count();
        prop_assert_eq!(m.len(), survivors);
        prop_assert!(m.keys().all(|k| k % modulus != 0));
    }
}
