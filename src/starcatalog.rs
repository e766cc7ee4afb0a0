//! Star catalog tables and the indexed catalog used by the tracker.
//!
//! The raw data is two tables: catalog stars (id + unit direction) and the
//! precomputed pairwise angles between them. Anything that can hand out those
//! two slices implements [`CatalogSource`]; [`CatalogTables`] is the in-memory
//! implementation, which can also generate the pair table from a star list and
//! persist itself with rkyv.
//!
//! [`StarCatalog::build`] turns a source into the read-only runtime catalog:
//! a K-vector over pair angles for triangle matching and a k-d tree over star
//! directions for verification. Both are immutable after construction and safe
//! to share across worker threads.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, ensure, Context};
use rayon::prelude::*;
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{info, warn};

use crate::index::{KVector, KdTree};
use crate::star::{angle_between, CatalogStar, StarAnglePair};
use crate::Vector3;

/// Read-only provider of catalog stars and their precomputed pair angles.
pub trait CatalogSource {
    fn stars(&self) -> &[CatalogStar];
    fn star_pairs(&self) -> &[StarAnglePair];
}

/// Parameters for generating the pair-angle table from a star list.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Pairs separated by more than this (radians) are not stored. The camera
    /// can never see both stars at once, so they only bloat the table.
    /// Default: 80°
    pub max_pair_angle_rad: f64,
    /// Faintest magnitude kept. Stars without a magnitude are always kept.
    /// Default: None (no cut)
    pub max_magnitude: Option<f32>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_pair_angle_rad: 80.0_f64.to_radians(),
            max_magnitude: None,
        }
    }
}

// ── Raw tables ──────────────────────────────────────────────────────────────

/// In-memory star and pair-angle tables, serializable with rkyv.
#[derive(Debug, Clone, Default, Archive, Serialize, Deserialize)]
pub struct CatalogTables {
    pub stars: Vec<CatalogStar>,
    pub pairs: Vec<StarAnglePair>,
}

impl CatalogSource for CatalogTables {
    fn stars(&self) -> &[CatalogStar] {
        &self.stars
    }

    fn star_pairs(&self) -> &[StarAnglePair] {
        &self.pairs
    }
}

impl CatalogTables {
    pub fn new(stars: Vec<CatalogStar>, pairs: Vec<StarAnglePair>) -> Self {
        Self { stars, pairs }
    }

    /// Build the pair-angle table from a star list.
    ///
    /// Applies the magnitude cut, then stores every pair with `star_a < star_b`
    /// whose separation is below `config.max_pair_angle_rad`.
    pub fn generate(mut stars: Vec<CatalogStar>, config: &CatalogConfig) -> Self {
        let num_before = stars.len();
        if let Some(max_mag) = config.max_magnitude {
            stars.retain(|s| s.mag.map_or(true, |m| m <= max_mag));
        }
        stars.sort_by_key(|s| s.id);
        stars.dedup_by_key(|s| s.id);
        info!(
            "Generating pair table from {} of {} stars",
            stars.len(),
            num_before
        );

        let max_angle = config.max_pair_angle_rad;
        let star_list = &stars;
        let pairs: Vec<StarAnglePair> = (0..star_list.len())
            .into_par_iter()
            .flat_map_iter(move |i| {
                let a = star_list[i].uvec();
                (i + 1..star_list.len()).filter_map(move |j| {
                    let angle = angle_between(&a, &star_list[j].uvec());
                    (angle < max_angle).then_some(StarAnglePair {
                        star_a: star_list[i].id,
                        star_b: star_list[j].id,
                        angle,
                    })
                })
            })
            .collect();

        info!(
            "Generated {} star pairs below {:.1}°",
            pairs.len(),
            max_angle.to_degrees()
        );
        Self { stars, pairs }
    }

    /// Serialize the tables to bytes using rkyv.
    pub fn to_rkyv_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| anyhow::anyhow!("rkyv serialization failed: {}", e))?;
        Ok(bytes.to_vec())
    }

    /// Save the tables to a file using rkyv.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = self.to_rkyv_bytes()?;
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write catalog: {}", path.display()))?;
        info!("Saved catalog to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Load tables from an rkyv file.
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
        let tables = rkyv::from_bytes::<Self, rkyv::rancor::Error>(&bytes)
            .map_err(|e| anyhow::anyhow!("rkyv deserialization failed: {}", e))?;
        info!(
            "Loaded catalog: {} stars, {} pairs",
            tables.stars.len(),
            tables.pairs.len()
        );
        Ok(tables)
    }
}

/// Parse a plain-text star table.
///
/// One star per line: `id x y z [mag]`, separated by commas and/or whitespace.
/// Blank lines and lines starting with `#` are skipped. The direction does not
/// need to be normalized (e.g. raw parsec coordinates); zero vectors are rejected.
pub fn parse_star_table(data: &str) -> anyhow::Result<Vec<CatalogStar>> {
    let mut stars = Vec::new();
    for (lineno, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        ensure!(
            fields.len() == 4 || fields.len() == 5,
            "line {}: expected `id x y z [mag]`, got {} fields",
            lineno + 1,
            fields.len()
        );

        let id: u64 = fields[0]
            .parse()
            .with_context(|| format!("line {}: bad star id {:?}", lineno + 1, fields[0]))?;
        let mut xyz = [0.0f64; 3];
        for (k, v) in xyz.iter_mut().enumerate() {
            *v = fields[k + 1].parse().with_context(|| {
                format!("line {}: bad coordinate {:?}", lineno + 1, fields[k + 1])
            })?;
        }
        let Some(mut star) = CatalogStar::new(id, Vector3::new(xyz[0], xyz[1], xyz[2])) else {
            bail!("line {}: star {} has a zero-length direction", lineno + 1, id);
        };
        if let Some(m) = fields.get(4) {
            let mag: f32 = m
                .parse()
                .with_context(|| format!("line {}: bad magnitude {:?}", lineno + 1, m))?;
            star = star.with_mag(mag);
        }
        stars.push(star);
    }
    Ok(stars)
}

/// Load a plain-text star table from disk. See [`parse_star_table`].
pub fn load_star_table(path: impl AsRef<Path>) -> anyhow::Result<Vec<CatalogStar>> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read star table: {}", path.display()))?;
    parse_star_table(&data)
}

// ── Indexed catalog ─────────────────────────────────────────────────────────

/// Indexed, read-only star catalog.
#[derive(Debug, Clone)]
pub struct StarCatalog {
    /// Stars that appear in at least one pair, in first-appearance order.
    stars: Vec<CatalogStar>,
    id_lookup: HashMap<u64, usize>,
    angle_index: KVector<StarAnglePair>,
    spatial_index: Option<KdTree>,
}

impl StarCatalog {
    /// Build both indices from a catalog source.
    ///
    /// Fails if a pair references a star id the source does not provide, or if
    /// a pair is degenerate (same star twice, non-finite angle).
    pub fn build(source: &impl CatalogSource) -> anyhow::Result<Self> {
        let mut by_id: HashMap<u64, &CatalogStar> = HashMap::with_capacity(source.stars().len());
        for star in source.stars() {
            if by_id.insert(star.id, star).is_some() {
                warn!("Duplicate catalog star id {}; keeping the last entry", star.id);
            }
        }

        let mut stars: Vec<CatalogStar> = Vec::new();
        let mut id_lookup: HashMap<u64, usize> = HashMap::new();
        for pair in source.star_pairs() {
            ensure!(
                pair.star_a != pair.star_b,
                "pair references star {} twice",
                pair.star_a
            );
            ensure!(
                pair.angle.is_finite(),
                "pair ({}, {}) has a non-finite angle",
                pair.star_a,
                pair.star_b
            );
            for id in [pair.star_a, pair.star_b] {
                if id_lookup.contains_key(&id) {
                    continue;
                }
                let Some(star) = by_id.get(&id) else {
                    bail!("pair references unknown star id {}", id);
                };
                id_lookup.insert(id, stars.len());
                stars.push((*star).clone());
            }
        }

        let angle_index = KVector::new(source.star_pairs().to_vec());
        let points: Vec<[f64; 3]> = stars.iter().map(|s| s.uvec).collect();
        let spatial_index = KdTree::build(&points);

        info!(
            "Built star catalog: {} stars, {} pairs",
            stars.len(),
            angle_index.len()
        );

        Ok(Self {
            stars,
            id_lookup,
            angle_index,
            spatial_index,
        })
    }

    /// Number of indexed stars.
    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Number of indexed star pairs.
    pub fn num_pairs(&self) -> usize {
        self.angle_index.len()
    }

    /// All indexed stars.
    pub fn stars(&self) -> &[CatalogStar] {
        &self.stars
    }

    /// Look up a star by catalog id.
    pub fn star(&self, id: u64) -> Option<&CatalogStar> {
        self.id_lookup.get(&id).map(|&i| &self.stars[i])
    }

    /// Star pairs whose separation lies in `[lower, upper]` radians, sorted by angle.
    pub fn pairs_in_range(&self, lower: f64, upper: f64) -> &[StarAnglePair] {
        self.angle_index.query(lower, upper)
    }

    /// Nearest indexed star to a (possibly non-unit) direction.
    ///
    /// With `max_angle_rad` set, returns `None` when the nearest star is further
    /// than that from `dir`.
    pub fn nearest_star(&self, dir: &Vector3, max_angle_rad: Option<f64>) -> Option<&CatalogStar> {
        let tree = self.spatial_index.as_ref()?;
        let norm = dir.norm();
        if !(norm > 0.0) {
            return None;
        }
        let q = dir / norm;
        let (idx, d2) = tree.nearest([q.x, q.y, q.z])?;
        if let Some(max_angle) = max_angle_rad {
            // Chord length c on the unit sphere subtends 2*asin(c/2).
            let angle = 2.0 * (d2.sqrt() / 2.0).min(1.0).asin();
            if angle > max_angle {
                return None;
            }
        }
        Some(&self.stars[idx])
    }
}
