//! Minimum spanning tree over transmitter locations.

use crate::projection::ProjectedPoint;


/// A connection between two transmitters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    pub from: ProjectedPoint,
    pub to: ProjectedPoint,
}

impl Edge {
    pub fn length(&self) -> f64 {
        self.from.distance_to(&self.to)
    }
}

/// Connect all points by a tree of minimum total 3D length.
///
/// Dense variant of Prim's algorithm in O(n²), point counts stay in the hundreds. The tree grows
/// from index 0, the cheapest unvisited point is found by a linear scan (ties go to the lower
/// index). One edge `(points[parent[i]], points[i])` is returned for every `i` in `1..n`, in
/// index order.
pub fn build_mst(points: &[ProjectedPoint]) -> Vec<Edge> {
    let n = points.len();
    if n < 2 {
        return vec![];
    }

    let mut visited = vec![false; n];
    let mut min_edge = vec![std::f64::INFINITY; n];
    let mut parent: Vec<Option<usize>> = vec![None; n];
    min_edge[0] = 0.0;

    for _ in 0..n - 1 {
        let mut u: Option<usize> = None;
        for j in 0..n {
            if visited[j] {
                continue;
            }
            match u {
                Some(best) if min_edge[j] >= min_edge[best] => {},
                _ => u = Some(j),
            }
        }

        // there is always an unvisited point left inside this loop
        let u = match u {
            Some(u) => u,
            None => break,
        };
        visited[u] = true;

        for v in 0..n {
            if visited[v] {
                continue;
            }
            let dist = points[u].distance_to(&points[v]);
            if dist < min_edge[v] {
                min_edge[v] = dist;
                parent[v] = Some(u);
            }
        }
    }

    (1..n)
        .filter_map(|i| parent[i].map(|p| Edge { from: points[p], to: points[i] }))
        .collect()
}
