use crate::features::engineer::{FeatureConfig, FeatureEngineer};
use crate::models::bundle::ModelBundle;
use crate::models::forest::ForestConfig;
use crate::models::precipitation::PrecipitationModel;
use crate::models::regression_ensemble::RegressionEnsemble;
use crate::models::trained_model::{ModelTarget, TrainedModel};
use crate::models::weather_code_classifier::WeatherCodeClassifier;
use crate::training::error::TrainingError;
use crate::training::training_set::{Holdout, Split, TrainingSetBuilder};
use crate::types::weather_record::WEATHER_CODE_COLUMN;
use crate::types::weather_table::WeatherTable;
use crate::utils::float_values;
use bon::Builder;
use chrono::{DateTime, Datelike, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Everything that shapes a training run.
///
/// # Examples
///
/// ```
/// use weathercast::{FeatureConfig, ForestConfig, Holdout, TrainingConfig};
///
/// let config = TrainingConfig::builder()
///     .features(FeatureConfig::builder().max_lag(2).decay(0.5).build())
///     .holdout(Holdout::YearsBeforeLatest(1))
///     .forest(ForestConfig::builder().n_trees(16).build())
///     .build();
/// assert_eq!(config.features.max_lag, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct TrainingConfig {
    #[builder(default)]
    pub features: FeatureConfig,
    /// Defaults to [`Holdout::YearsBeforeLatest`] with 5 years, so shorter histories need
    /// a smaller window or [`Holdout::Disabled`] to keep any training rows.
    #[builder(default)]
    pub holdout: Holdout,
    /// Hyperparameters of every regression ensemble member.
    #[builder(default)]
    pub forest: ForestConfig,
    #[builder(default = ForestConfig::precipitation())]
    pub precipitation_forest: ForestConfig,
    #[builder(default = ForestConfig::classifier())]
    pub classifier_forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Holdout score of one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModelScore {
    MeanAbsoluteError(f64),
    Accuracy(f64),
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Rows in the training split, before per-model dropping of incomplete rows.
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub cutoff: Option<DateTime<Utc>>,
    /// Year that received recency weight 1.
    pub center_year: i32,
    /// Holdout score per model name. Models without complete holdout rows are absent.
    pub scores: BTreeMap<String, ModelScore>,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub report: TrainingReport,
}

/// Trains every model on `table` and scores them on the chronological holdout.
///
/// The regression ensemble and the precipitation model are fit concurrently; the
/// classifier follows because it consumes the ensemble's predictions.
///
/// # Errors
///
/// * [`TrainingError::EmptyHistory`] if `table` has no rows.
/// * [`TrainingError::DataInsufficiency`] naming the first model left without complete
///   training rows.
/// * [`TrainingError::Feature`] for an invalid [`FeatureConfig`].
pub fn train(table: &WeatherTable, config: &TrainingConfig) -> Result<TrainingOutcome, TrainingError> {
    let latest = table.latest().ok_or(TrainingError::EmptyHistory)?.time;
    let center_year = config.features.center_year.unwrap_or_else(|| latest.year());
    let features = FeatureConfig {
        center_year: Some(center_year),
        ..config.features.clone()
    };
    let engineer = FeatureEngineer::new(features.clone())?;

    let start = Instant::now();
    let frame = engineer.engineer(table)?;
    let cutoff = config.holdout.cutoff(latest);
    let builder = TrainingSetBuilder::new(frame, cutoff)?;
    let train_rows = builder.frame(Split::Train).height();
    let holdout_rows = builder.frame(Split::Holdout).height();
    info!(
        "Training on {} rows, holding out {} rows (cutoff {:?}, center year {})",
        train_rows, holdout_rows, cutoff, center_year
    );

    let (ensemble, precipitation) = rayon::join(
        || RegressionEnsemble::fit(&builder, &features, &config.forest),
        || PrecipitationModel::fit(&builder, &features, &config.precipitation_forest),
    );
    let ensemble = ensemble?;
    let precipitation = precipitation?;
    let classifier =
        WeatherCodeClassifier::fit(&builder, &ensemble, &features, &config.classifier_forest)?;
    info!("Fitted all models in {:?}", start.elapsed());

    let scores = evaluate(&builder, &ensemble, &precipitation, &classifier)?;
    for (model, score) in &scores {
        info!("Holdout score of {model}: {score:?}");
    }
    if holdout_rows > 0 && scores.is_empty() {
        warn!("Holdout split has {holdout_rows} rows but none are complete; no scores computed");
    }

    let bundle = ModelBundle::new(features, ensemble, precipitation, classifier, latest);
    Ok(TrainingOutcome {
        bundle,
        report: TrainingReport {
            train_rows,
            holdout_rows,
            cutoff,
            center_year,
            scores,
        },
    })
}

fn evaluate(
    builder: &TrainingSetBuilder,
    ensemble: &RegressionEnsemble,
    precipitation: &PrecipitationModel,
    classifier: &WeatherCodeClassifier,
) -> Result<BTreeMap<String, ModelScore>, TrainingError> {
    let mut scores = BTreeMap::new();

    for model in ensemble.models().chain(std::iter::once(precipitation.model())) {
        if let Some(mae) = holdout_mae(builder, model)? {
            scores.insert(model.name(), ModelScore::MeanAbsoluteError(mae));
        }
    }

    let schema = classifier.model().schema();
    let frame = WeatherCodeClassifier::stacked_frame(builder, Split::Holdout, ensemble, schema)?;
    if frame.height() > 0 {
        let predicted = classifier.predict_frame(&frame)?;
        let observed = float_values(&frame, WEATHER_CODE_COLUMN).map_err(|source| {
            TrainingError::Polars {
                stage: "reading holdout weather codes".to_string(),
                source,
            }
        })?;
        let hits = predicted
            .iter()
            .zip(observed)
            .filter(|(p, o)| o.map(|o| o as i32) == Some(**p))
            .count();
        scores.insert(
            classifier.model().name(),
            ModelScore::Accuracy(hits as f64 / predicted.len() as f64),
        );
    }
    Ok(scores)
}

fn holdout_mae(builder: &TrainingSetBuilder, model: &TrainedModel) -> Result<Option<f64>, TrainingError> {
    let target = model.target();
    let Some(set) = builder.assemble_holdout(&model.name(), model.schema(), target.column())? else {
        return Ok(None);
    };
    let parameter = match target {
        ModelTarget::Parameter(parameter) => Some(parameter),
        ModelTarget::WeatherCode => None,
    };
    let total: f64 = model
        .predict_matrix(set.features())
        .iter()
        .zip(set.targets())
        .map(|(output, observed)| {
            let raw = output.first().copied().unwrap_or(f64::NAN);
            let predicted = parameter.map_or(raw, |p| p.clamp_to_range(raw));
            (predicted - observed).abs()
        })
        .sum();
    Ok(Some(total / set.len() as f64))
}
