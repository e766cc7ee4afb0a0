//! 3-D k-d tree over unit direction vectors.
//!
//! Built once with median splits and queried many times for the single nearest
//! neighbor. Distances are squared Euclidean (chord) distances, which order the
//! same way as angular separation on the unit sphere.

#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<[f64; 3]>,
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Index into the points array
    point_idx: usize,
    left: Option<usize>,
    right: Option<usize>,
    /// Split axis (0 = x, 1 = y, 2 = z)
    split_dim: usize,
}

impl KdTree {
    /// Build a tree from a list of points.
    ///
    /// Returns `None` if `points` is empty.
    pub fn build(points: &[[f64; 3]]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let points = points.to_vec();
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        Self::build_recursive(&points, &mut indices, 0, &mut nodes);

        Some(Self { nodes, points })
    }

    fn build_recursive(
        points: &[[f64; 3]],
        indices: &mut [usize],
        depth: usize,
        nodes: &mut Vec<KdNode>,
    ) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }

        let split_dim = depth % 3;
        // Ties broken by index so the layout does not depend on sort stability.
        indices.sort_by(|&a, &b| {
            points[a][split_dim]
                .total_cmp(&points[b][split_dim])
                .then(a.cmp(&b))
        });

        let median = indices.len() / 2;
        let node_idx = nodes.len();
        nodes.push(KdNode {
            point_idx: indices[median],
            left: None,
            right: None,
            split_dim,
        });

        let (left_indices, right_part) = indices.split_at_mut(median);
        let right_indices = &mut right_part[1..];

        let left = Self::build_recursive(points, left_indices, depth + 1, nodes);
        let right = Self::build_recursive(points, right_indices, depth + 1, nodes);
        nodes[node_idx].left = left;
        nodes[node_idx].right = right;

        Some(node_idx)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, idx: usize) -> [f64; 3] {
        self.points[idx]
    }

    /// Nearest point to `query` as `(index, distance_squared)`.
    ///
    /// Equidistant points resolve to the lowest index.
    pub fn nearest(&self, query: [f64; 3]) -> Option<(usize, f64)> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best = (usize::MAX, f64::INFINITY);
        self.nearest_recursive(0, query, &mut best);
        (best.0 != usize::MAX).then_some(best)
    }

    fn nearest_recursive(&self, node_idx: usize, query: [f64; 3], best: &mut (usize, f64)) {
        let node = &self.nodes[node_idx];
        let point = self.points[node.point_idx];

        let d2 = distance_squared(query, point);
        if d2 < best.1 || (d2 == best.1 && node.point_idx < best.0) {
            *best = (node.point_idx, d2);
        }

        let diff = query[node.split_dim] - point[node.split_dim];
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(first_idx) = first {
            self.nearest_recursive(first_idx, query, best);
        }
        // `<=` so ties on the far side are still visited.
        if let Some(second_idx) = second {
            if diff * diff <= best.1 {
                self.nearest_recursive(second_idx, query, best);
            }
        }
    }
}

fn distance_squared(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}
