//! Exact optimal transport between two discrete distributions.
//!
//! Solves the balanced transportation problem
//!
//! ```text
//! min  sum_ij f_ij c_ij
//! s.t. sum_j f_ij = supply_i,  sum_i f_ij = demand_j,  f_ij >= 0
//! ```
//!
//! by successive shortest augmenting paths on the residual bipartite graph.
//! Backward residual edges carry cost `-c_ij`, so shortest paths are found
//! with a queue-based Bellman-Ford (SPFA). Problem sizes are the number of
//! unique words in two documents, so the dense formulation is fine.

use ndarray::Array2;
use std::collections::VecDeque;

const EPS: f64 = 1e-12;

/// Minimum transport cost between `supply` and `demand` under `cost`.
///
/// `cost` is `supply.len() x demand.len()`. If the totals differ, the
/// smaller total is transported. Returns `0.0` when either side is empty.
pub fn emd(supply: &[f64], demand: &[f64], cost: &Array2<f64>) -> f64 {
    let n = supply.len();
    let m = demand.len();
    if n == 0 || m == 0 {
        return 0.0;
    }
    debug_assert_eq!(cost.dim(), (n, m));

    let mut supply_left: Vec<f64> = supply.iter().map(|s| s.max(0.0)).collect();
    let mut demand_left: Vec<f64> = demand.iter().map(|d| d.max(0.0)).collect();
    let mut flow = Array2::<f64>::zeros((n, m));

    // Each augmentation saturates a supply, a demand, or a backward edge.
    let max_augmentations = 4 * (n + m) * (n + m) + 16;
    for _ in 0..max_augmentations {
        let remaining = supply_left.iter().sum::<f64>().min(demand_left.iter().sum::<f64>());
        if remaining <= EPS {
            break;
        }
        let Some((path, target)) = shortest_path(&supply_left, &demand_left, &flow, cost) else {
            break;
        };

        let origin = path[0];
        let mut delta = supply_left[origin].min(demand_left[target]);
        for step in path.windows(2) {
            if let [from, to] = *step {
                if from >= n {
                    // backward edge demand -> supply
                    delta = delta.min(flow[[to, from - n]]);
                }
            }
        }
        if delta <= EPS {
            break;
        }

        for step in path.windows(2) {
            if let [from, to] = *step {
                if from < n {
                    flow[[from, to - n]] += delta;
                } else {
                    flow[[to, from - n]] -= delta;
                }
            }
        }
        supply_left[origin] -= delta;
        demand_left[target] -= delta;
    }

    flow.iter().zip(cost.iter()).map(|(f, c)| f * c).sum()
}

/// Shortest residual path from any supply node with stock left to the
/// cheapest reachable demand node with demand left.
///
/// Nodes `0..n` are supplies, `n..n+m` are demands. Returns the node path
/// and the demand index.
fn shortest_path(
    supply_left: &[f64],
    demand_left: &[f64],
    flow: &Array2<f64>,
    cost: &Array2<f64>,
) -> Option<(Vec<usize>, usize)> {
    let n = supply_left.len();
    let m = demand_left.len();
    let mut dist = vec![f64::INFINITY; n + m];
    let mut prev: Vec<Option<usize>> = vec![None; n + m];
    let mut in_queue = vec![false; n + m];
    let mut queue = VecDeque::new();

    for (i, &s) in supply_left.iter().enumerate() {
        if s > EPS {
            dist[i] = 0.0;
            in_queue[i] = true;
            queue.push_back(i);
        }
    }

    let max_relaxations = (n + m) * (n + m) * (n + m) + 64;
    let mut relaxations = 0usize;
    while let Some(u) = queue.pop_front() {
        in_queue[u] = false;
        relaxations += 1;
        if relaxations > max_relaxations {
            break;
        }
        if u < n {
            for j in 0..m {
                let nd = dist[u] + cost[[u, j]];
                if nd < dist[n + j] - EPS {
                    dist[n + j] = nd;
                    prev[n + j] = Some(u);
                    if !in_queue[n + j] {
                        in_queue[n + j] = true;
                        queue.push_back(n + j);
                    }
                }
            }
        } else {
            let j = u - n;
            for i in 0..n {
                if flow[[i, j]] <= EPS {
                    continue;
                }
                let nd = dist[u] - cost[[i, j]];
                if nd < dist[i] - EPS {
                    dist[i] = nd;
                    prev[i] = Some(u);
                    if !in_queue[i] {
                        in_queue[i] = true;
                        queue.push_back(i);
                    }
                }
            }
        }
    }

    let target = (0..m)
        .filter(|&j| demand_left[j] > EPS && dist[n + j].is_finite())
        .min_by(|&a, &b| dist[n + a].total_cmp(&dist[n + b]))?;

    let mut path = vec![n + target];
    let mut node = n + target;
    while let Some(p) = prev[node] {
        path.push(p);
        node = p;
        if path.len() > n + m + 1 {
            return None;
        }
    }
    path.reverse();
    if path[0] >= n || supply_left[path[0]] <= EPS {
        return None;
    }
    Some((path, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use proptest::prelude::*;

    #[test]
    fn test_identity_cost_zero() {
        let cost = arr2(&[[0.0, 1.0], [1.0, 0.0]]);
        assert!(emd(&[0.5, 0.5], &[0.5, 0.5], &cost).abs() < 1e-12);
    }

    #[test]
    fn test_single_supply_splits() {
        let cost = arr2(&[[1.0, 3.0]]);
        let d = emd(&[1.0], &[0.25, 0.75], &cost);
        assert!((d - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_hand_computed_plan() {
        // optimum ships 0.5 on (0,0), 0.1 on (0,1), 0.4 on (1,1)
        let cost = arr2(&[[1.0, 2.0], [3.0, 1.0]]);
        let d = emd(&[0.6, 0.4], &[0.5, 0.5], &cost);
        assert!((d - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_rerouting_through_backward_edge() {
        // greedy would pay 0.5 * 1 + 0.5 * 10
        let cost = arr2(&[[1.0, 2.0], [1.0, 10.0]]);
        let d = emd(&[0.5, 0.5], &[0.5, 0.5], &cost);
        assert!((d - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_side() {
        let cost = Array2::zeros((0, 2));
        assert_eq!(emd(&[], &[0.5, 0.5], &cost), 0.0);
    }

    fn weights(len: usize) -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.05f64..1.0, len).prop_map(|mut v| {
            let s: f64 = v.iter().sum();
            v.iter_mut().for_each(|x| *x /= s);
            v
        })
    }

    /// Cost of the north-west corner plan, a feasible upper bound.
    fn north_west(supply: &[f64], demand: &[f64], cost: &Array2<f64>) -> f64 {
        let (mut s, mut d) = (supply.to_vec(), demand.to_vec());
        let (mut i, mut j, mut total) = (0, 0, 0.0);
        while i < s.len() && j < d.len() {
            let f = s[i].min(d[j]);
            total += f * cost[[i, j]];
            s[i] -= f;
            d[j] -= f;
            if s[i] <= 1e-15 {
                i += 1;
            } else {
                j += 1;
            }
        }
        total
    }

    proptest! {
        #[test]
        fn prop_between_relaxed_bound_and_feasible_plan(
            supply in weights(4),
            demand in weights(3),
            raw in prop::collection::vec(0.0f64..2.0, 12),
        ) {
            let cost = Array2::from_shape_vec((4, 3), raw).unwrap();
            let d = emd(&supply, &demand, &cost);
            let relaxed: f64 = supply
                .iter()
                .enumerate()
                .map(|(i, w)| w * cost.row(i).iter().cloned().fold(f64::INFINITY, f64::min))
                .sum();
            prop_assert!(d >= relaxed - 1e-9);
            prop_assert!(d <= north_west(&supply, &demand, &cost) + 1e-9);
        }
    }
}
