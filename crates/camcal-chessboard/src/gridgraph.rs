use crate::geom::{angle_diff_abs, axis_vec_diff, is_orthogonal};
use crate::params::GridGraphParams;
use camcal_core::Corner;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Vector2;
use std::collections::{HashMap, VecDeque};

/// Direction of a neighbor along the estimated grid axes (`Right` is +u, `Down` is +v).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    Right,
    Left,
    Up,
    Down,
}

impl NeighborDirection {
    fn slot(self) -> usize {
        match self {
            NeighborDirection::Right => 0,
            NeighborDirection::Left => 1,
            NeighborDirection::Up => 2,
            NeighborDirection::Down => 3,
        }
    }

    /// Grid step `(di, dj)` taken when following this edge.
    pub fn step(self) -> (i32, i32) {
        match self {
            NeighborDirection::Right => (1, 0),
            NeighborDirection::Left => (-1, 0),
            NeighborDirection::Up => (0, -1),
            NeighborDirection::Down => (0, 1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeNeighbor {
    pub direction: NeighborDirection,
    pub index: usize,
    pub distance: f32,
    pub score: f32,
}

/// Classify an edge vector against grid axes `u = (cos a, sin a)`, `v = (-sin a, cos a)`.
fn classify_direction(vec_to_neighbor: &Vector2<f32>, axis_angle: f32) -> NeighborDirection {
    let u = Vector2::new(axis_angle.cos(), axis_angle.sin());
    let v = Vector2::new(-axis_angle.sin(), axis_angle.cos());
    let du = vec_to_neighbor.dot(&u);
    let dv = vec_to_neighbor.dot(&v);
    if du.abs() > dv.abs() {
        if du >= 0.0 {
            NeighborDirection::Right
        } else {
            NeighborDirection::Left
        }
    } else if dv >= 0.0 {
        NeighborDirection::Down
    } else {
        NeighborDirection::Up
    }
}

fn is_good_neighbor(
    corner: &Corner,
    neighbor: &Corner,
    neighbor_index: usize,
    params: &GridGraphParams,
    axis_angle: f32,
) -> Option<NodeNeighbor> {
    let tol = params.orientation_tolerance_deg.to_radians();

    // 1. Adjacent chessboard corners have orthogonal orientations.
    if !is_orthogonal(corner.orientation, neighbor.orientation, tol) {
        return None;
    }

    // 2. Distance within the expected spacing window.
    let vec_to_neighbor = neighbor.position - corner.position;
    let distance = vec_to_neighbor.norm();
    if distance < params.min_spacing_pix || distance > params.max_spacing_pix {
        return None;
    }

    // 3. Orientation is the light-square diagonal, so a grid edge runs at
    //    ~45° to both corner orientations.
    let edge_angle = vec_to_neighbor.y.atan2(vec_to_neighbor.x);
    let expected = std::f32::consts::FRAC_PI_4;
    let score_corner = (axis_vec_diff(corner.orientation, edge_angle) - expected).abs();
    let score_neighbor = (axis_vec_diff(neighbor.orientation, edge_angle) - expected).abs();
    if score_corner > tol || score_neighbor > tol {
        return None;
    }

    let score_orientation = (std::f32::consts::FRAC_PI_2
        - angle_diff_abs(corner.orientation, neighbor.orientation))
    .abs();

    Some(NodeNeighbor {
        direction: classify_direction(&vec_to_neighbor, axis_angle),
        index: neighbor_index,
        distance,
        score: score_corner + score_neighbor + score_orientation,
    })
}

/// Keep at most one neighbor per direction, choosing the lowest-score candidate.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> Vec<NodeNeighbor> {
    let mut best: [Option<NodeNeighbor>; 4] = [None, None, None, None];

    for candidate in candidates {
        let slot = &mut best[candidate.direction.slot()];
        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.score < current.score
                    || (candidate.score == current.score && candidate.distance < current.distance)
            }
        };
        if replace {
            *slot = Some(candidate);
        }
    }

    best.into_iter().flatten().collect()
}

/// 4-connected neighbor graph over a set of corners.
pub struct GridGraph {
    pub neighbors: Vec<Vec<NodeNeighbor>>,
}

impl GridGraph {
    /// Build the graph; `axis_angle` is the grid `u` axis in image space (radians).
    pub fn new(corners: &[Corner], params: &GridGraphParams, axis_angle: f32) -> Self {
        if corners.is_empty() {
            return Self {
                neighbors: Vec::new(),
            };
        }

        let coords = corners
            .iter()
            .map(|c| [c.position.x, c.position.y])
            .collect::<Vec<_>>();
        let tree: KdTree<f32, 2> = (&coords).into();
        let k = (params.k_neighbors + 1).min(corners.len());

        let neighbors = corners
            .iter()
            .enumerate()
            .map(|(i, corner)| {
                let query = [corner.position.x, corner.position.y];
                let candidates = tree
                    .nearest_n::<SquaredEuclidean>(&query, k)
                    .into_iter()
                    .map(|nn| nn.item as usize)
                    .filter(|&j| j != i)
                    .filter_map(|j| is_good_neighbor(corner, &corners[j], j, params, axis_angle))
                    .collect();
                select_neighbors(candidates)
            })
            .collect();

        Self { neighbors }
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// Connected components, treating every edge as undirected.
pub fn connected_components(graph: &GridGraph) -> Vec<Vec<usize>> {
    let n = graph.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (node, list) in graph.neighbors.iter().enumerate() {
        for nb in list {
            adjacency[node].push(nb.index);
            adjacency[nb.index].push(node);
        }
    }

    let mut visited = vec![false; n];
    let mut components = Vec::new();
    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            component.push(node);
            stack.extend(adjacency[node].iter().copied().filter(|&m| !visited[m]));
        }
        components.push(component);
    }
    components
}

/// BFS-label a component with integer grid coordinates `(node, i, j)`.
///
/// Returns `None` if two edges disagree on a node's coordinates or two nodes
/// land on the same cell.
pub fn assign_grid_coordinates(
    graph: &GridGraph,
    component: &[usize],
) -> Option<Vec<(usize, i32, i32)>> {
    let start = *component.first()?;
    let mut assigned: HashMap<usize, (i32, i32)> = HashMap::with_capacity(component.len());
    let mut occupied: HashMap<(i32, i32), usize> = HashMap::with_capacity(component.len());
    let mut order = Vec::with_capacity(component.len());
    let mut queue = VecDeque::from([(start, 0, 0)]);

    while let Some((node, i, j)) = queue.pop_front() {
        if let Some(&prev) = assigned.get(&node) {
            if prev != (i, j) {
                log::debug!("node {node} labeled both {prev:?} and {:?}", (i, j));
                return None;
            }
            continue;
        }
        if let Some(&other) = occupied.get(&(i, j)) {
            log::debug!("nodes {other} and {node} both at {:?}", (i, j));
            return None;
        }
        assigned.insert(node, (i, j));
        occupied.insert((i, j), node);
        order.push((node, i, j));

        for nb in &graph.neighbors[node] {
            let (di, dj) = nb.direction.step();
            queue.push_back((nb.index, i + di, j + dj));
        }
    }

    Some(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use std::f32::consts::FRAC_PI_4;

    fn make_corner(x: f32, y: f32, orientation: f32) -> Corner {
        Corner {
            position: Point2::new(x, y),
            orientation,
            strength: 1.0,
        }
    }

    fn lattice(cols: usize, rows: usize, spacing: f32) -> Vec<Corner> {
        let mut corners = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let orientation = if (i + j) % 2 == 0 {
                    FRAC_PI_4
                } else {
                    3.0 * FRAC_PI_4
                };
                corners.push(make_corner(
                    i as f32 * spacing,
                    j as f32 * spacing,
                    orientation,
                ));
            }
        }
        corners
    }

    fn params(max_spacing: f32, k: usize) -> GridGraphParams {
        GridGraphParams {
            min_spacing_pix: 5.0,
            max_spacing_pix: max_spacing,
            k_neighbors: k,
            ..Default::default()
        }
    }

    fn neighbor_map(neighbors: &[NodeNeighbor]) -> HashMap<NeighborDirection, &NodeNeighbor> {
        neighbors.iter().map(|n| (n.direction, n)).collect()
    }

    #[test]
    fn finds_axis_neighbors_in_regular_grid() {
        let spacing = 10.0;
        let corners = lattice(3, 3, spacing);
        let graph = GridGraph::new(&corners, &params(15.0, 8), 0.0);
        let idx = |i: usize, j: usize| j * 3 + i;

        let center = neighbor_map(&graph.neighbors[idx(1, 1)]);
        assert_eq!(4, center.len());
        assert_eq!(idx(0, 1), center[&NeighborDirection::Left].index);
        assert_eq!(idx(2, 1), center[&NeighborDirection::Right].index);
        assert_eq!(idx(1, 0), center[&NeighborDirection::Up].index);
        assert_eq!(idx(1, 2), center[&NeighborDirection::Down].index);
        for n in center.values() {
            assert!((n.distance - spacing).abs() < 1e-4);
        }

        let top_left = neighbor_map(&graph.neighbors[idx(0, 0)]);
        assert_eq!(2, top_left.len());
        assert!(top_left.contains_key(&NeighborDirection::Right));
        assert!(top_left.contains_key(&NeighborDirection::Down));
    }

    #[test]
    fn rejects_neighbors_when_orientation_relation_invalid() {
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(10.0, 0.0, FRAC_PI_4),
        ];
        let graph = GridGraph::new(&corners, &params(15.0, 2), 0.0);
        assert!(graph.neighbors[0].is_empty());
        assert!(graph.neighbors[1].is_empty());
    }

    #[test]
    fn rejects_neighbors_outside_distance_window() {
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(30.0, 0.0, 3.0 * FRAC_PI_4),
        ];
        let graph = GridGraph::new(&corners, &params(15.0, 2), 0.0);
        assert!(graph.neighbors[0].is_empty());
        assert!(graph.neighbors[1].is_empty());
    }

    #[test]
    fn keeps_best_candidate_per_direction() {
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(10.0, 0.0, 3.0 * FRAC_PI_4),
            make_corner(12.0, 0.0, 3.0 * FRAC_PI_4 + 0.1),
            make_corner(-10.0, 0.0, 3.0 * FRAC_PI_4),
        ];
        let graph = GridGraph::new(&corners, &params(15.0, 4), 0.0);

        let map = neighbor_map(&graph.neighbors[0]);
        assert_eq!(2, map.len());
        assert_eq!(1, map[&NeighborDirection::Right].index);
        assert_eq!(3, map[&NeighborDirection::Left].index);
    }

    #[test]
    fn directions_follow_rotated_axis() {
        let angle = 0.6f32;
        let e = Vector2::new(angle.cos(), angle.sin()) * 10.0;
        assert_eq!(classify_direction(&e, angle), NeighborDirection::Right);
        assert_eq!(classify_direction(&-e, angle), NeighborDirection::Left);
        let perp = Vector2::new(-angle.sin(), angle.cos()) * 10.0;
        assert_eq!(classify_direction(&perp, angle), NeighborDirection::Down);
    }

    #[test]
    fn bfs_labels_a_full_lattice() {
        let corners = lattice(4, 3, 10.0);
        let graph = GridGraph::new(&corners, &params(15.0, 8), 0.0);
        let components = connected_components(&graph);
        assert_eq!(components.len(), 1);

        let coords = assign_grid_coordinates(&graph, &components[0]).unwrap();
        assert_eq!(coords.len(), 12);
        let (node0, i0, j0) = coords[0];
        for &(node, i, j) in &coords {
            let di = (node % 4) as i32 - (node0 % 4) as i32;
            let dj = (node / 4) as i32 - (node0 / 4) as i32;
            assert_eq!((i - i0, j - j0), (di, dj));
        }
    }

    #[test]
    fn isolated_corners_form_their_own_components() {
        let mut corners = lattice(2, 2, 10.0);
        corners.push(make_corner(500.0, 500.0, FRAC_PI_4));
        let graph = GridGraph::new(&corners, &params(15.0, 8), 0.0);
        let mut sizes: Vec<usize> = connected_components(&graph)
            .iter()
            .map(Vec::len)
            .collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 4]);
    }
}
