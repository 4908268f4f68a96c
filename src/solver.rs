//! Single-vehicle closed-tour solver.
//!
//! The tour starts and ends at a fixed depot and visits every other node
//! exactly once. A cheapest-insertion construction seeds a guided local
//! search over relocate, swap and 2-opt moves, bounded by a wall-clock limit.
//!
//! Kilometer distances are scaled to integer meter-equivalents. Unreachable
//! arcs are priced above any finite tour, so once the search holds a feasible
//! tour it never leaves the feasible region. If the construction needs an
//! unreachable arc, a search over open arcs alone looks for a feasible start:
//! exact on small instances, depth-first within the time limit otherwise.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::SolveError;
use crate::matrix::DistanceMatrix;

/// Kilometers to integer cost units (meters).
const COST_SCALE: f64 = 1000.0;

/// Largest instance handed to Held-Karp when the construction is not
/// feasible. Larger ones use the depth-first search.
const EXACT_SEARCH_MAX_NODES: usize = 12;

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Hard wall-clock cap on the improvement phase.
    pub time_limit: Duration,
    /// Maximum guided local search penalty rounds.
    pub max_iterations: usize,
    /// Weight of arc penalties relative to the average arc cost.
    pub penalty_factor: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
            max_iterations: 1000,
            penalty_factor: 0.1,
        }
    }
}

/// A closed tour as matrix indices, depot first and last.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    pub nodes: Vec<usize>,
    /// Total distance in kilometers, measured on the unscaled matrix.
    ///
    /// The search compares tours on costs rounded to whole meters, so two
    /// tours within rounding of each other may rank differently here.
    pub distance_km: f64,
}

impl Tour {
    fn from_visits(matrix: &DistanceMatrix, depot: usize, visits: &[usize]) -> Self {
        let mut nodes = Vec::with_capacity(visits.len() + 2);
        nodes.push(depot);
        nodes.extend_from_slice(visits);
        nodes.push(depot);

        let distance_km = matrix.path_distance(&nodes);
        Self { nodes, distance_km }
    }

    /// The non-depot nodes in visiting order.
    pub fn visits(&self) -> &[usize] {
        &self.nodes[1..self.nodes.len() - 1]
    }
}

/// Solve the closed tour from `depot` over every node of `matrix`.
pub fn solve(matrix: &DistanceMatrix, depot: usize, options: &SolveOptions) -> Result<Tour, SolveError> {
    let deadline = Deadline::after(options.time_limit);
    let Some(costs) = prepare(matrix, depot)? else {
        return Ok(Tour::from_visits(matrix, depot, &[]));
    };

    let mut initial = cheapest_insertion(&costs, depot);
    debug!(
        nodes = costs.size,
        cost = tour_cost(&initial, depot, &|a: usize, b: usize| costs.arc(a, b)),
        "construction finished"
    );

    if !costs.is_feasible(&initial, depot) {
        debug!("construction uses an unreachable arc, searching open arcs only");
        initial = match feasible_tour(&costs, depot, &deadline) {
            Search::Found(visits) => visits,
            Search::Exhausted => {
                return Err(SolveError::Infeasible {
                    unreachable: costs.blocked_nodes(&initial, depot),
                });
            }
            Search::TimedOut => return Err(SolveError::Unproven { nodes: costs.size }),
        };
    }

    let visits = guided_local_search(&costs, depot, initial, options, &deadline);
    Ok(Tour::from_visits(matrix, depot, &visits))
}

/// The cheapest-insertion tour on its own, without improvement.
///
/// The result may use unreachable arcs, in which case its distance is
/// infinite.
pub fn construction_tour(matrix: &DistanceMatrix, depot: usize) -> Result<Tour, SolveError> {
    let visits = match prepare(matrix, depot)? {
        Some(costs) => cheapest_insertion(&costs, depot),
        None => Vec::new(),
    };
    Ok(Tour::from_visits(matrix, depot, &visits))
}

/// Validate the depot and reject nodes that cannot be entered or left.
///
/// Returns `None` for a depot-only matrix.
fn prepare(matrix: &DistanceMatrix, depot: usize) -> Result<Option<CostMatrix>, SolveError> {
    let size = matrix.size();
    if depot >= size {
        return Err(SolveError::DepotOutOfRange { depot, size });
    }
    if size == 1 {
        return Ok(None);
    }

    let isolated: Vec<usize> = (0..size)
        .filter(|&node| {
            let can_leave = (0..size).any(|other| other != node && matrix.is_reachable(node, other));
            let can_enter = (0..size).any(|other| other != node && matrix.is_reachable(other, node));
            !(can_leave && can_enter)
        })
        .collect();

    if !isolated.is_empty() {
        return Err(SolveError::Infeasible { unreachable: isolated });
    }

    Ok(Some(CostMatrix::new(matrix)))
}

struct Deadline(Option<Instant>);

impl Deadline {
    fn after(limit: Duration) -> Self {
        Self(Instant::now().checked_add(limit))
    }

    fn reached(&self) -> bool {
        self.0.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Integer arc costs owned by the solver.
///
/// Finite costs are capped so that a whole tour of the largest arcs, plus
/// penalties, stays well inside an i64. Distances beyond the cap compare equal.
struct CostMatrix {
    size: usize,
    costs: Vec<i64>,
    reachable: Vec<bool>,
    /// Ceiling for one penalized arc during guided local search.
    augmented_limit: i64,
}

impl CostMatrix {
    fn new(matrix: &DistanceMatrix) -> Self {
        let size = matrix.size();
        let nodes = size as i64 + 1;
        let arc_limit = (i64::MAX / (8 * nodes * nodes)).max(1);
        let mut costs = vec![0; size * size];
        let mut reachable = vec![true; size * size];
        let mut finite_total: i64 = 0;

        for from in 0..size {
            for to in 0..size {
                let km = matrix.get(from, to);
                if km.is_finite() {
                    let cost = ((km * COST_SCALE).round() as i64).min(arc_limit);
                    costs[from * size + to] = cost;
                    finite_total = finite_total.saturating_add(cost);
                } else {
                    reachable[from * size + to] = false;
                }
            }
        }

        // A finite tour has `size` arcs of at most `arc_limit` each, so any
        // tour with an unreachable arc costs more than every finite tour.
        let unreachable_cost = finite_total.min(arc_limit.saturating_mul(size as i64)) + 1;
        for (cost, reachable) in costs.iter_mut().zip(&reachable) {
            if !reachable {
                *cost = unreachable_cost;
            }
        }

        Self {
            size,
            costs,
            reachable,
            augmented_limit: arc_limit * nodes,
        }
    }

    fn arc(&self, from: usize, to: usize) -> i64 {
        self.costs[from * self.size + to]
    }

    fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.reachable[from * self.size + to]
    }

    fn is_feasible(&self, visits: &[usize], depot: usize) -> bool {
        closed_arcs(visits, depot).all(|(from, to)| self.is_reachable(from, to))
    }

    fn blocked_nodes(&self, visits: &[usize], depot: usize) -> Vec<usize> {
        let mut nodes: Vec<usize> = closed_arcs(visits, depot)
            .filter(|&(from, to)| !self.is_reachable(from, to))
            .flat_map(|(from, to)| [from, to])
            .filter(|&node| node != depot)
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }
}

/// Arcs of the closed tour `depot → visits → depot`.
fn closed_arcs(visits: &[usize], depot: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
    let starts = std::iter::once(depot).chain(visits.iter().copied());
    let ends = visits.iter().copied().chain(std::iter::once(depot));
    starts.zip(ends)
}

fn tour_cost<C: Fn(usize, usize) -> i64>(visits: &[usize], depot: usize, cost: &C) -> i64 {
    let mut previous = depot;
    let mut total = 0;
    for &node in visits {
        total += cost(previous, node);
        previous = node;
    }
    total + cost(previous, depot)
}

/// Repeatedly insert the node/position pair with the least marginal cost.
///
/// Ties go to the lowest node index, then the earliest position.
fn cheapest_insertion(costs: &CostMatrix, depot: usize) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..costs.size).filter(|&node| node != depot).collect();
    let mut visits: Vec<usize> = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut best: Option<(i64, usize, usize)> = None;

        for (slot, &node) in remaining.iter().enumerate() {
            for position in 0..=visits.len() {
                let prev = if position == 0 { depot } else { visits[position - 1] };
                let next = if position == visits.len() { depot } else { visits[position] };
                let delta = costs.arc(prev, node) + costs.arc(node, next) - costs.arc(prev, next);

                if best.is_none_or(|(best_delta, _, _)| delta < best_delta) {
                    best = Some((delta, slot, position));
                }
            }
        }

        if let Some((_, slot, position)) = best {
            let node = remaining.remove(slot);
            visits.insert(position, node);
        }
    }

    visits
}

fn guided_local_search(
    costs: &CostMatrix,
    depot: usize,
    mut current: Vec<usize>,
    options: &SolveOptions,
    deadline: &Deadline,
) -> Vec<usize> {
    let true_cost = |a: usize, b: usize| costs.arc(a, b);

    descend(&mut current, depot, &true_cost, deadline);
    let mut best = current.clone();
    let mut best_cost = tour_cost(&best, depot, &true_cost);

    if current.len() < 2 {
        return best;
    }

    let lambda = penalty_weight(costs, &current, depot, options.penalty_factor);
    let mut penalties = vec![0i64; costs.size * costs.size];

    for round in 0..options.max_iterations {
        if deadline.reached() {
            debug!(round, "time limit reached");
            break;
        }

        penalize(costs, &current, depot, &mut penalties);
        let augmented = |a: usize, b: usize| {
            costs
                .arc(a, b)
                .saturating_add(lambda.saturating_mul(penalties[a * costs.size + b]))
                .min(costs.augmented_limit)
        };
        let converged = descend(&mut current, depot, &augmented, deadline);

        let cost = tour_cost(&current, depot, &true_cost);
        if cost < best_cost {
            debug!(round, cost, "guided local search improved");
            best.clone_from(&current);
            best_cost = cost;
        }

        if !converged {
            break;
        }
    }

    descend(&mut best, depot, &true_cost, deadline);
    best
}

/// Penalty unit: a fraction of the mean reachable arc cost of the tour.
fn penalty_weight(costs: &CostMatrix, visits: &[usize], depot: usize, factor: f64) -> i64 {
    let (total, count) = closed_arcs(visits, depot)
        .filter(|&(from, to)| costs.is_reachable(from, to))
        .fold((0i64, 0i64), |(total, count), (from, to)| (total + costs.arc(from, to), count + 1));

    if count == 0 {
        return 1;
    }
    ((factor * total as f64 / count as f64).round() as i64).max(1)
}

/// Penalize the tour arcs with the highest utility `cost / (1 + penalty)`.
fn penalize(costs: &CostMatrix, visits: &[usize], depot: usize, penalties: &mut [i64]) {
    let utility = |from: usize, to: usize, penalties: &[i64]| {
        costs.arc(from, to) as f64 / (1 + penalties[from * costs.size + to]) as f64
    };

    let max_utility = closed_arcs(visits, depot)
        .map(|(from, to)| utility(from, to, penalties))
        .fold(f64::MIN, f64::max);

    let chosen: Vec<(usize, usize)> = closed_arcs(visits, depot)
        .filter(|&(from, to)| utility(from, to, penalties) >= max_utility)
        .collect();

    for (from, to) in chosen {
        penalties[from * costs.size + to] += 1;
    }
}

/// First-improvement descent until no move improves `cost`.
///
/// Returns false if the deadline interrupted it.
fn descend<C: Fn(usize, usize) -> i64>(visits: &mut Vec<usize>, depot: usize, cost: &C, deadline: &Deadline) -> bool {
    loop {
        if deadline.reached() {
            return false;
        }

        let improved = relocate_improve(visits, depot, cost)
            || swap_improve(visits, depot, cost)
            || two_opt_improve(visits, depot, cost);

        if !improved {
            return true;
        }
    }
}

fn before(visits: &[usize], depot: usize, position: usize) -> usize {
    if position == 0 { depot } else { visits[position - 1] }
}

fn after(visits: &[usize], depot: usize, position: usize) -> usize {
    if position + 1 == visits.len() { depot } else { visits[position + 1] }
}

/// Relocate: move one node to another position.
/// Returns true if an improvement was made.
fn relocate_improve<C: Fn(usize, usize) -> i64>(visits: &mut Vec<usize>, depot: usize, cost: &C) -> bool {
    let n = visits.len();
    if n < 2 {
        return false;
    }

    for from in 0..n {
        let node = visits[from];
        let prev = before(visits, depot, from);
        let next = after(visits, depot, from);
        let removal_gain = cost(prev, node) + cost(node, next) - cost(prev, next);

        // Positions refer to the sequence with `node` removed.
        let reduced = |k: usize| if k < from { visits[k] } else { visits[k + 1] };

        for to in 0..n {
            if to == from {
                continue;
            }
            let a = if to == 0 { depot } else { reduced(to - 1) };
            let b = if to == n - 1 { depot } else { reduced(to) };
            let insertion_cost = cost(a, node) + cost(node, b) - cost(a, b);

            if insertion_cost - removal_gain < 0 {
                let node = visits.remove(from);
                visits.insert(to, node);
                return true;
            }
        }
    }

    false
}

/// Swap: exchange the positions of two nodes.
/// Returns true if an improvement was made.
fn swap_improve<C: Fn(usize, usize) -> i64>(visits: &mut [usize], depot: usize, cost: &C) -> bool {
    let n = visits.len();

    for i in 0..n {
        for j in i + 1..n {
            let a = visits[i];
            let b = visits[j];
            let prev_i = before(visits, depot, i);
            let next_j = after(visits, depot, j);

            let delta = if j == i + 1 {
                cost(prev_i, b) + cost(b, a) + cost(a, next_j) - cost(prev_i, a) - cost(a, b) - cost(b, next_j)
            } else {
                let next_i = visits[i + 1];
                let prev_j = visits[j - 1];
                cost(prev_i, b) + cost(b, next_i) + cost(prev_j, a) + cost(a, next_j)
                    - cost(prev_i, a)
                    - cost(a, next_i)
                    - cost(prev_j, b)
                    - cost(b, next_j)
            };

            if delta < 0 {
                visits.swap(i, j);
                return true;
            }
        }
    }

    false
}

/// 2-opt: reverse a segment. Inner arcs are re-priced since costs may be
/// asymmetric.
/// Returns true if an improvement was made.
fn two_opt_improve<C: Fn(usize, usize) -> i64>(visits: &mut [usize], depot: usize, cost: &C) -> bool {
    let n = visits.len();

    for i in 0..n {
        let prev = before(visits, depot, i);
        let mut forward = 0;
        let mut backward = 0;

        for j in i + 1..n {
            forward += cost(visits[j - 1], visits[j]);
            backward += cost(visits[j], visits[j - 1]);
            let next = after(visits, depot, j);

            let old = cost(prev, visits[i]) + forward + cost(visits[j], next);
            let new = cost(prev, visits[j]) + backward + cost(visits[i], next);

            if new < old {
                visits[i..=j].reverse();
                return true;
            }
        }
    }

    false
}

enum Search {
    Found(Vec<usize>),
    Exhausted,
    TimedOut,
}

/// A tour over reachable arcs only, or proof that none exists.
fn feasible_tour(costs: &CostMatrix, depot: usize, deadline: &Deadline) -> Search {
    if costs.size <= EXACT_SEARCH_MAX_NODES {
        return match exact_tour(costs, depot) {
            Some(visits) => Search::Found(visits),
            None => Search::Exhausted,
        };
    }

    let mut search = PathSearch {
        costs,
        depot,
        deadline,
        visited: vec![false; costs.size],
        path: Vec::with_capacity(costs.size - 1),
        timed_out: false,
    };
    search.visited[depot] = true;

    if search.extend() {
        Search::Found(search.path)
    } else if search.timed_out {
        debug!(nodes = costs.size, "time limit reached during feasibility search");
        Search::TimedOut
    } else {
        Search::Exhausted
    }
}

/// Depth-first search for a path from the depot through every node that can
/// close back to it. Successors with the fewest onward arcs go first.
struct PathSearch<'a> {
    costs: &'a CostMatrix,
    depot: usize,
    deadline: &'a Deadline,
    visited: Vec<bool>,
    path: Vec<usize>,
    timed_out: bool,
}

impl PathSearch<'_> {
    fn extend(&mut self) -> bool {
        let last = self.path.last().copied().unwrap_or(self.depot);
        if self.path.len() + 1 == self.costs.size {
            return self.costs.is_reachable(last, self.depot);
        }
        if self.deadline.reached() {
            self.timed_out = true;
            return false;
        }
        if self.stranded(last) {
            return false;
        }

        let mut candidates: Vec<(usize, i64, usize)> = (0..self.costs.size)
            .filter(|&next| !self.visited[next] && self.costs.is_reachable(last, next))
            .map(|next| (self.onward_arcs(next), self.costs.arc(last, next), next))
            .collect();
        candidates.sort_unstable();

        for (_, _, next) in candidates {
            self.visited[next] = true;
            self.path.push(next);
            if self.extend() {
                return true;
            }
            self.path.pop();
            self.visited[next] = false;
            if self.timed_out {
                return false;
            }
        }

        false
    }

    /// Open arcs from `node` to unvisited nodes or back to the depot.
    fn onward_arcs(&self, node: usize) -> usize {
        (0..self.costs.size)
            .filter(|&other| other != node && (!self.visited[other] || other == self.depot))
            .filter(|&other| self.costs.is_reachable(node, other))
            .count()
    }

    /// True if some unvisited node can no longer be entered or left.
    fn stranded(&self, last: usize) -> bool {
        let size = self.costs.size;
        let open = |node: usize| !self.visited[node];

        (0..size).filter(|&node| open(node)).any(|node| {
            let can_enter = self.costs.is_reachable(last, node)
                || (0..size).any(|other| other != node && open(other) && self.costs.is_reachable(other, node));
            let can_leave = self.costs.is_reachable(node, self.depot)
                || (0..size).any(|other| other != node && open(other) && self.costs.is_reachable(node, other));
            !(can_enter && can_leave)
        })
    }
}

/// Held-Karp over reachable arcs only. Optimal when a feasible tour exists.
/// Exponential in the node count.
fn exact_tour(costs: &CostMatrix, depot: usize) -> Option<Vec<usize>> {
    let others: Vec<usize> = (0..costs.size).filter(|&node| node != depot).collect();
    let m = others.len();
    let full = (1usize << m) - 1;

    // best[mask][last] = cheapest path from the depot through `mask` ending at `last`.
    let mut best: Vec<Vec<Option<i64>>> = vec![vec![None; m]; 1 << m];
    let mut parent: Vec<Vec<usize>> = vec![vec![usize::MAX; m]; 1 << m];

    for (k, &node) in others.iter().enumerate() {
        if costs.is_reachable(depot, node) {
            best[1 << k][k] = Some(costs.arc(depot, node));
        }
    }

    for mask in 1..=full {
        for last in 0..m {
            let Some(base) = best[mask][last] else { continue };
            for next in 0..m {
                if mask & (1 << next) != 0 || !costs.is_reachable(others[last], others[next]) {
                    continue;
                }
                let extended = mask | (1 << next);
                let cost = base + costs.arc(others[last], others[next]);
                if best[extended][next].is_none_or(|current| cost < current) {
                    best[extended][next] = Some(cost);
                    parent[extended][next] = last;
                }
            }
        }
    }

    let mut closing: Option<(i64, usize)> = None;
    for last in 0..m {
        if let Some(base) = best[full][last] {
            if costs.is_reachable(others[last], depot) {
                let cost = base + costs.arc(others[last], depot);
                if closing.is_none_or(|(current, _)| cost < current) {
                    closing = Some((cost, last));
                }
            }
        }
    }

    let (_, mut last) = closing?;
    let mut mask = full;
    let mut reversed = Vec::with_capacity(m);
    while mask != 0 {
        reversed.push(others[last]);
        let previous = parent[mask][last];
        mask &= !(1 << last);
        last = previous;
    }
    reversed.reverse();
    Some(reversed)
}
