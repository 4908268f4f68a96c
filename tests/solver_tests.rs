//! Tour solver tests
//!
//! Optimality on small instances, tour shape, infeasibility and time limits.

mod fixtures;

use std::time::{Duration, Instant};

use bin_route_planner::error::SolveError;
use bin_route_planner::haversine::HaversineDistance;
use bin_route_planner::matrix::{DistanceMatrix, MatrixBuilder};
use bin_route_planner::solver::{construction_tour, solve, SolveOptions, Tour};

use fixtures::MARKHAM;

// ============================================================================
// Helper Functions
// ============================================================================

const INF: f64 = f64::INFINITY;

fn matrix(rows: Vec<Vec<f64>>) -> DistanceMatrix {
    DistanceMatrix::from_rows(rows).expect("valid matrix")
}

/// Deterministic pseudo-random distances in [1, 100].
struct Lcg(u64);

impl Lcg {
    fn next_distance(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) % 991) as f64 / 10.0 + 1.0
    }

    fn next_index(&mut self, bound: usize) -> usize {
        self.next_distance() as usize % bound
    }
}

/// A random one-way cycle through every node, plus `extra` random open arcs.
/// Every other arc is unreachable.
fn hidden_cycle_matrix(size: usize, extra: usize, seed: u64) -> DistanceMatrix {
    let mut rng = Lcg(seed);
    let mut order: Vec<usize> = (1..size).collect();
    for i in (1..order.len()).rev() {
        order.swap(i, rng.next_index(i + 1));
    }

    let mut rows = vec![vec![INF; size]; size];
    for (i, row) in rows.iter_mut().enumerate() {
        row[i] = 0.0;
    }
    let mut previous = 0;
    for &node in order.iter().chain(std::iter::once(&0)) {
        rows[previous][node] = rng.next_distance();
        previous = node;
    }
    for _ in 0..extra {
        let from = rng.next_index(size);
        let to = rng.next_index(size);
        if from != to {
            rows[from][to] = rng.next_distance();
        }
    }
    matrix(rows)
}

fn random_matrix(size: usize, seed: u64, symmetric: bool) -> DistanceMatrix {
    let mut rng = Lcg(seed);
    let mut rows = vec![vec![0.0; size]; size];
    for i in 0..size {
        for j in 0..size {
            if i == j || (symmetric && j < i) {
                continue;
            }
            let d = rng.next_distance();
            rows[i][j] = d;
            if symmetric {
                rows[j][i] = d;
            }
        }
    }
    matrix(rows)
}

/// Cheapest closed tour by enumerating every visiting order.
fn brute_force(matrix: &DistanceMatrix, depot: usize) -> f64 {
    fn permute(matrix: &DistanceMatrix, depot: usize, prefix: &mut Vec<usize>, rest: &mut Vec<usize>, best: &mut f64) {
        if rest.is_empty() {
            let mut nodes = vec![depot];
            nodes.extend(prefix.iter().copied());
            nodes.push(depot);
            *best = best.min(matrix.path_distance(&nodes));
            return;
        }
        for i in 0..rest.len() {
            let node = rest.remove(i);
            prefix.push(node);
            permute(matrix, depot, prefix, rest, best);
            prefix.pop();
            rest.insert(i, node);
        }
    }

    let mut rest: Vec<usize> = (0..matrix.size()).filter(|&n| n != depot).collect();
    let mut best = INF;
    permute(matrix, depot, &mut Vec::new(), &mut rest, &mut best);
    best
}

fn assert_closed_permutation(tour: &Tour, size: usize, depot: usize) {
    assert_eq!(tour.nodes.first(), Some(&depot), "tour must start at depot");
    assert_eq!(tour.nodes.last(), Some(&depot), "tour must end at depot");

    let mut visits = tour.visits().to_vec();
    visits.sort_unstable();
    let expected: Vec<usize> = (0..size).filter(|&n| n != depot).collect();
    assert_eq!(visits, expected, "every non-depot node exactly once");
}

fn quick() -> SolveOptions {
    SolveOptions {
        time_limit: Duration::from_secs(10),
        max_iterations: 200,
        ..SolveOptions::default()
    }
}

// ============================================================================
// Optimality Tests
// ============================================================================

#[test]
fn test_classic_four_node_instance() {
    let m = matrix(vec![
        vec![0.0, 10.0, 15.0, 20.0],
        vec![10.0, 0.0, 35.0, 25.0],
        vec![15.0, 35.0, 0.0, 30.0],
        vec![20.0, 25.0, 30.0, 0.0],
    ]);

    let tour = solve(&m, 0, &SolveOptions::default()).unwrap();

    assert_eq!(tour.distance_km, 80.0);
    assert_eq!(brute_force(&m, 0), 80.0);
    assert_closed_permutation(&tour, 4, 0);
}

#[test]
fn test_matches_brute_force_on_tiny_instances() {
    for seed in 1..=25 {
        for symmetric in [true, false] {
            let m = random_matrix(5, seed, symmetric);
            let tour = solve(&m, 0, &quick()).unwrap();
            let optimum = brute_force(&m, 0);
            assert!(
                (tour.distance_km - optimum).abs() < 1e-9,
                "seed {} symmetric {}: got {}, optimum {}",
                seed,
                symmetric,
                tour.distance_km,
                optimum
            );
        }
    }
}

#[test]
fn test_never_below_optimum_never_above_construction() {
    for seed in 100..110 {
        let m = random_matrix(8, seed, false);
        let tour = solve(&m, 0, &quick()).unwrap();
        let construction = construction_tour(&m, 0).unwrap();
        let optimum = brute_force(&m, 0);

        assert!(tour.distance_km >= optimum - 1e-9);
        assert!(tour.distance_km <= construction.distance_km + 1e-9);
    }
}

#[test]
fn test_no_single_swap_improves_result() {
    let m = random_matrix(10, 7, true);
    let tour = solve(&m, 0, &quick()).unwrap();

    for i in 1..tour.nodes.len() - 1 {
        for j in i + 1..tour.nodes.len() - 1 {
            let mut neighbor = tour.nodes.clone();
            neighbor.swap(i, j);
            assert!(
                tour.distance_km <= m.path_distance(&neighbor) + 1e-9,
                "swapping positions {} and {} improves the tour",
                i,
                j
            );
        }
    }
}

// ============================================================================
// Tour Shape Tests
// ============================================================================

#[test]
fn test_real_coordinates_produce_closed_tour() {
    let coords: Vec<(f64, f64)> = MARKHAM.iter().map(|location| location.coords()).collect();
    let builder = MatrixBuilder::new(HaversineDistance::new(1.3), 4, 5.0).unwrap();
    let m = builder.build(&coords).matrix;

    let tour = solve(&m, 0, &quick()).unwrap();

    assert_closed_permutation(&tour, coords.len(), 0);
    assert!(tour.distance_km > 0.0);
    assert!((tour.distance_km - m.path_distance(&tour.nodes)).abs() < 1e-9);
}

#[test]
fn test_depot_in_the_middle() {
    let m = random_matrix(6, 42, true);
    let tour = solve(&m, 3, &quick()).unwrap();

    assert_closed_permutation(&tour, 6, 3);
    assert!((tour.distance_km - brute_force(&m, 3)).abs() < 1e-9);
}

#[test]
fn test_single_stop_round_trip() {
    let m = matrix(vec![vec![0.0, 4.0], vec![6.0, 0.0]]);
    let tour = solve(&m, 0, &quick()).unwrap();

    assert_eq!(tour.nodes, vec![0, 1, 0]);
    assert_eq!(tour.distance_km, 10.0);
}

#[test]
fn test_same_input_same_tour() {
    let m = random_matrix(9, 3, false);
    let first = solve(&m, 0, &quick()).unwrap();
    let second = solve(&m, 0, &quick()).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Reachability Tests
// ============================================================================

#[test]
fn test_unreachable_pair_without_bypass() {
    let m = matrix(vec![vec![0.0, INF], vec![3.0, 0.0]]);

    match solve(&m, 0, &quick()) {
        Err(SolveError::Infeasible { unreachable }) => assert!(!unreachable.is_empty()),
        other => panic!("expected Infeasible, got {:?}", other),
    }
}

#[test]
fn test_unreachable_arc_is_bypassed() {
    // 0 → 1 is closed, the other direction around is open.
    let m = matrix(vec![
        vec![0.0, INF, 5.0],
        vec![5.0, 0.0, 5.0],
        vec![5.0, 5.0, 0.0],
    ]);

    let tour = solve(&m, 0, &quick()).unwrap();

    assert_eq!(tour.nodes, vec![0, 2, 1, 0]);
    assert!(tour.distance_km.is_finite());
}

#[test]
fn test_forced_order_found_in_larger_instance() {
    // A one-way ring 0 → 1 → ... → 6 → 0 with expensive chords everywhere
    // else, except chords into the depot are closed.
    let size = 7;
    let mut rows = vec![vec![0.0; size]; size];
    for i in 0..size {
        for j in 0..size {
            if i == j {
                continue;
            }
            rows[i][j] = if j == (i + 1) % size {
                1.0
            } else if j == 0 {
                INF
            } else {
                40.0
            };
        }
    }
    let m = matrix(rows);

    let tour = solve(&m, 0, &quick()).unwrap();

    assert_eq!(tour.nodes, vec![0, 1, 2, 3, 4, 5, 6, 0]);
    assert_eq!(tour.distance_km, 7.0);
}

#[test]
fn test_hidden_cycle_found_beyond_exact_search_size() {
    for size in 13..=20 {
        for seed in 1..=5 {
            let m = hidden_cycle_matrix(size, size, seed);
            let tour = solve(&m, 0, &quick())
                .unwrap_or_else(|err| panic!("size {} seed {}: {:?}", size, seed, err));

            assert_closed_permutation(&tour, size, 0);
            assert!(tour.distance_km.is_finite(), "size {} seed {} uses a closed arc", size, seed);
        }
    }
}

// ============================================================================
// Time Limit Tests
// ============================================================================

#[test]
fn test_time_limit_caps_search() {
    let m = random_matrix(60, 11, false);
    let options = SolveOptions {
        time_limit: Duration::from_millis(200),
        max_iterations: usize::MAX,
        ..SolveOptions::default()
    };

    let started = Instant::now();
    let tour = solve(&m, 0, &options).unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
    assert_closed_permutation(&tour, 60, 0);
    assert!(tour.distance_km <= construction_tour(&m, 0).unwrap().distance_km + 1e-9);
}
