//! Triangle matching against the catalog pair index.
//!
//! Each side of a detected triangle is looked up in the angle index. The hits
//! for a side are folded into an insertion-ordered map from catalog star to
//! the ordered set of stars it pairs with on that side, in both orderings. A
//! catalog triple `(c1, c2, c3)` is consistent when `c1–c2` appears on side
//! 1–2, and `c3` pairs with `c1` on side 1–3 and with `c2` on side 2–3.
//!
//! Iteration follows insertion order everywhere, so the emitted triples come
//! out in the same order on every run.

use std::collections::{HashMap, HashSet};

use crate::star::{angle_between, StarAnglePair};
use crate::{StarCatalog, Vector3};

use super::Correspondence;

/// Set that iterates in insertion order.
#[derive(Debug, Clone, Default)]
pub struct OrderedSet {
    items: Vec<u64>,
    members: HashSet<u64>,
}

impl OrderedSet {
    /// Insert `id`; returns `false` if it was already present.
    pub fn insert(&mut self, id: u64) -> bool {
        if self.members.insert(id) {
            self.items.push(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.items.iter().copied()
    }
}

/// Catalog star → partner stars, keyed and iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PairMap {
    keys: Vec<u64>,
    partners: HashMap<u64, OrderedSet>,
}

impl PairMap {
    /// Fold a slice of pairs into the map, inserting both orderings of each pair.
    pub fn from_pairs(pairs: &[StarAnglePair]) -> Self {
        let mut map = Self::default();
        for p in pairs {
            map.insert(p.star_a, p.star_b);
            map.insert(p.star_b, p.star_a);
        }
        map
    }

    fn insert(&mut self, from: u64, to: u64) {
        let keys = &mut self.keys;
        self.partners
            .entry(from)
            .or_insert_with(|| {
                keys.push(from);
                OrderedSet::default()
            })
            .insert(to);
    }

    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.keys.iter().copied()
    }

    pub fn get(&self, id: u64) -> Option<&OrderedSet> {
        self.partners.get(&id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Find every catalog triple consistent with the triangle `observed`.
///
/// `observed` holds camera-frame unit vectors; `tolerance_rad` is the
/// half-width of the window applied to each measured side. Each result pairs
/// `observed[k]` with the catalog star assigned to vertex `k`.
pub fn match_triangle(
    catalog: &StarCatalog,
    observed: &[Vector3; 3],
    tolerance_rad: f64,
) -> Vec<[Correspondence; 3]> {
    let [v1, v2, v3] = observed;
    let side_map = |a: &Vector3, b: &Vector3| {
        let angle = angle_between(a, b);
        PairMap::from_pairs(catalog.pairs_in_range(angle - tolerance_rad, angle + tolerance_rad))
    };
    let map12 = side_map(v1, v2);
    if map12.is_empty() {
        return Vec::new();
    }
    let map13 = side_map(v1, v3);
    let map23 = side_map(v2, v3);

    let mut matches = Vec::new();
    for c1 in map12.keys() {
        let (Some(c2_set), Some(c13)) = (map12.get(c1), map13.get(c1)) else {
            continue;
        };
        for c2 in c2_set.iter() {
            let Some(c23) = map23.get(c2) else {
                continue;
            };
            for c3 in c13.iter() {
                if c3 == c2 || !c23.contains(c3) {
                    continue;
                }
                let (Some(s1), Some(s2), Some(s3)) =
                    (catalog.star(c1), catalog.star(c2), catalog.star(c3))
                else {
                    continue;
                };
                matches.push([
                    Correspondence {
                        observed: *v1,
                        catalog: s1.uvec(),
                        catalog_id: c1,
                    },
                    Correspondence {
                        observed: *v2,
                        catalog: s2.uvec(),
                        catalog_id: c2,
                    },
                    Correspondence {
                        observed: *v3,
                        catalog: s3.uvec(),
                        catalog_id: c3,
                    },
                ]);
            }
        }
    }
    matches
}
