use crate::models::error::ModelError;
use crate::models::tree::{DecisionTree, Task, TreeParams};
use bon::Builder;
use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How many features each split may consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Every feature, i.e. bagged trees.
    #[default]
    All,
    /// `⌈√n⌉` features drawn at random per split.
    Sqrt,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        }
        .max(1)
    }
}

/// Hyperparameters of a [`RandomForest`].
///
/// # Examples
///
/// ```
/// use weathercast::{ForestConfig, MaxFeatures};
///
/// let config = ForestConfig::builder()
///     .n_trees(8)
///     .max_depth(6)
///     .max_features(MaxFeatures::Sqrt)
///     .seed(7)
///     .build();
/// assert_eq!(config.min_samples_leaf, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct ForestConfig {
    #[builder(default = 24)]
    pub n_trees: usize,
    #[builder(default = 12)]
    pub max_depth: usize,
    #[builder(default = 4)]
    pub min_samples_split: usize,
    #[builder(default = 2)]
    pub min_samples_leaf: usize,
    #[builder(default)]
    pub max_features: MaxFeatures,
    /// Bootstrap sample size per tree. `None` draws as many rows as the training set has.
    pub max_samples: Option<usize>,
    /// Tree `i` is seeded with `seed + i`, so fits are reproducible regardless of thread
    /// scheduling.
    #[builder(default = 42)]
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ForestConfig {
    /// Shallower trees with larger leaves; rainfall is sparse and noisy.
    pub fn precipitation() -> Self {
        Self::builder()
            .max_depth(10)
            .min_samples_split(8)
            .min_samples_leaf(4)
            .seed(7)
            .build()
    }

    /// Deep, decorrelated trees for the weather-code classifier.
    pub fn classifier() -> Self {
        Self::builder()
            .n_trees(32)
            .max_depth(14)
            .max_features(MaxFeatures::Sqrt)
            .seed(11)
            .build()
    }

    fn validate(&self, model: &str) -> Result<(), ModelError> {
        let invalid = |reason: &str| {
            Err(ModelError::InvalidForestConfig {
                model: model.to_string(),
                reason: reason.to_string(),
            })
        };
        if self.n_trees == 0 {
            return invalid("n_trees must be at least 1");
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf must be at least 1");
        }
        if self.min_samples_split < 2 {
            return invalid("min_samples_split must be at least 2");
        }
        if self.max_samples == Some(0) {
            return invalid("max_samples must be at least 1");
        }
        Ok(())
    }
}

/// A bagged ensemble of weighted CART trees.
///
/// Regression forests average the tree outputs; classification forests average the
/// per-class leaf probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    task: Task,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fits a forest on `x` (rows × features) with targets `y` and per-row `weights`.
    ///
    /// For classification, `y` holds class indices in `0..n_classes`.
    ///
    /// # Errors
    ///
    /// * [`ModelError::InvalidForestConfig`] for an unusable configuration.
    /// * [`ModelError::InvalidTrainingData`] if there are no rows or the inputs disagree in
    ///   length.
    pub fn fit(
        model: &str,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        weights: ArrayView1<f64>,
        task: Task,
        config: &ForestConfig,
    ) -> Result<Self, ModelError> {
        config.validate(model)?;
        let n_rows = x.nrows();
        if n_rows == 0 || x.ncols() == 0 {
            return Err(ModelError::InvalidTrainingData {
                model: model.to_string(),
                reason: format!("feature matrix has shape {:?}", x.dim()),
            });
        }
        if y.len() != n_rows || weights.len() != n_rows {
            return Err(ModelError::InvalidTrainingData {
                model: model.to_string(),
                reason: format!(
                    "{n_rows} feature rows, {} targets and {} weights",
                    y.len(),
                    weights.len()
                ),
            });
        }

        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features.resolve(x.ncols()),
        };
        let draws = config.max_samples.map_or(n_rows, |m| m.min(n_rows));

        let trees = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(i as u64));
                let samples: Vec<usize> = (0..draws).map(|_| rng.gen_range(0..n_rows)).collect();
                DecisionTree::fit(
                    x.view(),
                    y.view(),
                    weights.view(),
                    samples,
                    task,
                    &params,
                    &mut rng,
                )
            })
            .collect();

        Ok(Self {
            task,
            n_features: x.ncols(),
            trees,
        })
    }

    /// Averaged output for one feature row: one value for regression, class
    /// probabilities for classification.
    pub fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        let mut totals = vec![0.0; self.task.output_width()];
        for tree in &self.trees {
            for (total, value) in totals.iter_mut().zip(tree.predict(row)) {
                *total += value;
            }
        }
        let n = self.trees.len() as f64;
        totals.iter_mut().for_each(|total| *total /= n);
        totals
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn linear_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 7) as f64 });
        let y = Array1::from_shape_fn(n, |i| 2.0 * i as f64 + 1.0);
        (x, y)
    }

    fn small() -> ForestConfig {
        ForestConfig::builder().n_trees(8).max_depth(8).build()
    }

    #[test]
    fn test_regression_tracks_target() -> Result<(), ModelError> {
        let (x, y) = linear_data(200);
        let w = Array1::ones(200);
        let forest = RandomForest::fit("test", x.view(), y.view(), w.view(), Task::Regression, &small())?;
        assert_eq!(forest.n_trees(), 8);
        assert_eq!(forest.n_features(), 2);
        let prediction = forest.predict_row(&[100.0, 2.0])[0];
        assert!((prediction - 201.0).abs() < 15.0, "got {prediction}");
        Ok(())
    }

    #[test]
    fn test_fit_is_reproducible() -> Result<(), ModelError> {
        let (x, y) = linear_data(120);
        let w = Array1::ones(120);
        let config = ForestConfig::builder()
            .n_trees(6)
            .max_features(MaxFeatures::Sqrt)
            .max_samples(60)
            .build();
        let a = RandomForest::fit("a", x.view(), y.view(), w.view(), Task::Regression, &config)?;
        let b = RandomForest::fit("b", x.view(), y.view(), w.view(), Task::Regression, &config)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_classification_probabilities_sum_to_one() -> Result<(), ModelError> {
        let x = Array2::from_shape_fn((90, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(90, |i| (i / 30) as f64);
        let w = Array1::ones(90);
        let forest = RandomForest::fit(
            "classes",
            x.view(),
            y.view(),
            w.view(),
            Task::Classification { n_classes: 3 },
            &small(),
        )?;
        let probabilities = forest.predict_row(&[45.0]);
        assert_eq!(probabilities.len(), 3);
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probabilities[1] > 0.5);
        Ok(())
    }

    #[test]
    fn test_invalid_inputs() {
        let (x, y) = linear_data(10);
        let w = Array1::ones(10);
        let zero_trees = ForestConfig::builder().n_trees(0).build();
        assert!(matches!(
            RandomForest::fit("m", x.view(), y.view(), w.view(), Task::Regression, &zero_trees),
            Err(ModelError::InvalidForestConfig { model, .. }) if model == "m"
        ));

        let short = Array1::ones(3);
        assert!(matches!(
            RandomForest::fit("m", x.view(), y.view(), short.view(), Task::Regression, &small()),
            Err(ModelError::InvalidTrainingData { .. })
        ));

        let empty = Array2::<f64>::zeros((0, 2));
        let none = Array1::<f64>::zeros(0);
        assert!(matches!(
            RandomForest::fit("m", empty.view(), none.view(), none.view(), Task::Regression, &small()),
            Err(ModelError::InvalidTrainingData { .. })
        ));
    }
}
