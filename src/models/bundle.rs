use crate::features::engineer::FeatureConfig;
use crate::features::schema::FEATURE_SCHEMA_VERSION;
use crate::models::precipitation::PrecipitationModel;
use crate::models::regression_ensemble::RegressionEnsemble;
use crate::models::weather_code_classifier::WeatherCodeClassifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything a [`crate::Forecaster`] needs: the trained models and the feature
/// configuration they were trained with.
///
/// A bundle is immutable after training and is shared between forecasters through an
/// `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    schema_version: u32,
    features: FeatureConfig,
    ensemble: RegressionEnsemble,
    precipitation: PrecipitationModel,
    classifier: WeatherCodeClassifier,
    trained_through: DateTime<Utc>,
}

impl ModelBundle {
    pub(crate) fn new(
        features: FeatureConfig,
        ensemble: RegressionEnsemble,
        precipitation: PrecipitationModel,
        classifier: WeatherCodeClassifier,
        trained_through: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: FEATURE_SCHEMA_VERSION,
            features,
            ensemble,
            precipitation,
            classifier,
            trained_through,
        }
    }

    /// Feature layout version the bundle was built with.
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn features(&self) -> &FeatureConfig {
        &self.features
    }

    pub fn ensemble(&self) -> &RegressionEnsemble {
        &self.ensemble
    }

    pub fn precipitation(&self) -> &PrecipitationModel {
        &self.precipitation
    }

    pub fn classifier(&self) -> &WeatherCodeClassifier {
        &self.classifier
    }

    /// Timestamp of the latest observation seen during training.
    pub fn trained_through(&self) -> DateTime<Utc> {
        self.trained_through
    }
}
