//! Weighted CART decision trees, the base learner of [`crate::models::forest::RandomForest`].
//!
//! Regression trees minimise the weighted sum of squared errors; classification trees
//! minimise weighted Gini impurity. Every sample carries a weight, which is how recency
//! weighting and class balancing reach the learner.

use ndarray::{ArrayView1, ArrayView2};
use ordered_float::OrderedFloat;
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const MIN_IMPURITY_DECREASE: f64 = 1e-12;

/// What a tree (or forest) predicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// A single continuous value.
    Regression,
    /// A probability for each of `n_classes` class indices.
    Classification { n_classes: usize },
}

impl Task {
    /// Width of a leaf output.
    pub fn output_width(&self) -> usize {
        match self {
            Task::Regression => 1,
            Task::Classification { n_classes } => *n_classes,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of candidate features drawn at each split.
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        output: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grows a tree on the rows listed in `samples` (duplicates allowed, as produced by
    /// bootstrapping).
    pub(crate) fn fit<'d>(
        x: ArrayView2<'d, f64>,
        y: ArrayView1<'d, f64>,
        weights: ArrayView1<'d, f64>,
        samples: Vec<usize>,
        task: Task,
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut grower = Grower {
            x,
            y,
            weights,
            task,
            params,
            rng,
            nodes: Vec::new(),
        };
        grower.grow(samples, 0);
        Self {
            nodes: grower.nodes,
        }
    }

    /// Routes `row` to its leaf and returns the leaf output.
    pub fn predict(&self, row: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { output } => return output,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Running weighted statistics of the targets on one side of a split.
#[derive(Debug, Clone)]
enum Accumulator {
    Moments { weight: f64, sum: f64, sum_sq: f64 },
    Classes { weight: f64, totals: Vec<f64> },
}

impl Accumulator {
    fn empty(task: Task) -> Self {
        match task {
            Task::Regression => Accumulator::Moments {
                weight: 0.0,
                sum: 0.0,
                sum_sq: 0.0,
            },
            Task::Classification { n_classes } => Accumulator::Classes {
                weight: 0.0,
                totals: vec![0.0; n_classes],
            },
        }
    }

    fn add(&mut self, y: f64, w: f64) {
        self.shift(y, w);
    }

    fn remove(&mut self, y: f64, w: f64) {
        self.shift(y, -w);
    }

    fn shift(&mut self, y: f64, w: f64) {
        match self {
            Accumulator::Moments {
                weight,
                sum,
                sum_sq,
            } => {
                *weight += w;
                *sum += w * y;
                *sum_sq += w * y * y;
            }
            Accumulator::Classes { weight, totals } => {
                *weight += w;
                totals[y as usize] += w;
            }
        }
    }

    /// Weighted impurity mass: the SSE for regression, weight × Gini for classification.
    fn impurity(&self) -> f64 {
        match self {
            Accumulator::Moments {
                weight,
                sum,
                sum_sq,
            } => {
                if *weight <= 0.0 {
                    return 0.0;
                }
                (sum_sq - sum * sum / weight).max(0.0)
            }
            Accumulator::Classes { weight, totals } => {
                if *weight <= 0.0 {
                    return 0.0;
                }
                let squares: f64 = totals.iter().map(|t| t * t).sum();
                (weight - squares / weight).max(0.0)
            }
        }
    }

    fn output(&self) -> Vec<f64> {
        match self {
            Accumulator::Moments { weight, sum, .. } => {
                vec![if *weight > 0.0 { sum / weight } else { 0.0 }]
            }
            Accumulator::Classes { weight, totals } => totals
                .iter()
                .map(|t| if *weight > 0.0 { t / weight } else { 0.0 })
                .collect(),
        }
    }
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct Grower<'d, 'p> {
    x: ArrayView2<'d, f64>,
    y: ArrayView1<'d, f64>,
    weights: ArrayView1<'d, f64>,
    task: Task,
    params: &'p TreeParams,
    rng: &'p mut ChaCha8Rng,
    nodes: Vec<Node>,
}

impl Grower<'_, '_> {
    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let stats = self.accumulate(&samples);
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            output: stats.output(),
        });

        if depth >= self.params.max_depth
            || samples.len() < self.params.min_samples_split
            || stats.impurity() <= MIN_IMPURITY_DECREASE
        {
            return node_idx;
        }
        let Some(split) = self.best_split(&samples, &stats) else {
            return node_idx;
        };

        let x = &self.x;
        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| x[[i, split.feature]] <= split.threshold);
        if left.is_empty() || right.is_empty() {
            return node_idx;
        }

        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn accumulate(&self, samples: &[usize]) -> Accumulator {
        let mut acc = Accumulator::empty(self.task);
        for &i in samples {
            acc.add(self.y[i], self.weights[i]);
        }
        acc
    }

    fn best_split(&mut self, samples: &[usize], total: &Accumulator) -> Option<Candidate> {
        let n_features = self.x.ncols();
        let features = sample(
            &mut *self.rng,
            n_features,
            self.params.max_features.clamp(1, n_features),
        )
        .into_vec();

        let (x, y, w) = (&self.x, &self.y, &self.weights);
        let min_leaf = self.params.min_samples_leaf;
        let parent = total.impurity();
        let mut best: Option<Candidate> = None;
        let mut sorted = samples.to_vec();

        for feature in features {
            sorted.sort_by_key(|&i| OrderedFloat(x[[i, feature]]));
            let mut left = Accumulator::empty(self.task);
            let mut right = total.clone();

            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                left.add(y[i], w[i]);
                right.remove(y[i], w[i]);

                let n_left = pos + 1;
                if n_left < min_leaf || sorted.len() - n_left < min_leaf {
                    continue;
                }
                let here = x[[i, feature]];
                let next = x[[sorted[pos + 1], feature]];
                if next <= here {
                    continue;
                }
                let impurity = left.impurity() + right.impurity();
                if impurity < parent - MIN_IMPURITY_DECREASE
                    && best.as_ref().map_or(true, |b| impurity < b.impurity)
                {
                    best = Some(Candidate {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};
    use rand::SeedableRng;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: usize::MAX,
        }
    }

    fn fit(x: &Array2<f64>, y: &Array1<f64>, w: &Array1<f64>, task: Task, depth: usize) -> DecisionTree {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        DecisionTree::fit(
            x.view(),
            y.view(),
            w.view(),
            (0..x.nrows()).collect(),
            task,
            &params(depth),
            &mut rng,
        )
    }

    #[test]
    fn test_regression_learns_step() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [10.0], [11.0], [12.0], [13.0]];
        let y = array![1.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0];
        let w = Array1::ones(8);
        let tree = fit(&x, &y, &w, Task::Regression, 4);
        assert_eq!(tree.predict(&[2.5]), &[1.0]);
        assert_eq!(tree.predict(&[11.5]), &[5.0]);
        // One split is enough for a pure step.
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_depth_zero_is_weighted_mean() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 10.0];
        let w = array![1.0, 3.0];
        let tree = fit(&x, &y, &w, Task::Regression, 0);
        assert_eq!(tree.predict(&[0.0]), &[7.5]);
    }

    #[test]
    fn test_classification_outputs_probabilities() {
        let x = array![[0.0, 5.0], [0.1, 5.0], [0.2, 5.0], [0.9, 5.0], [1.0, 5.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0];
        let w = Array1::ones(5);
        let tree = fit(&x, &y, &w, Task::Classification { n_classes: 2 }, 3);
        assert_eq!(tree.predict(&[0.05, 5.0]), &[1.0, 0.0]);
        assert_eq!(tree.predict(&[0.95, 5.0]), &[0.0, 1.0]);
    }

    #[test]
    fn test_constant_feature_yields_leaf() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![0.0, 1.0, 2.0];
        let w = Array1::ones(3);
        let tree = fit(&x, &y, &w, Task::Regression, 5);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[1.0]), &[1.0]);
    }
}
