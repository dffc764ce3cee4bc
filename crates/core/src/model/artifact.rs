use crate::features::FeatureRow;
use crate::model::Predictor;
use anyhow::{bail, ensure};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// On-disk model, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    Constant(ConstantModel),
}

impl ModelArtifact {
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            ModelArtifact::Linear(m) => m.validate(),
            ModelArtifact::Constant(m) => m.validate(),
        }
    }

    pub fn into_predictor(self) -> Arc<dyn Predictor> {
        match self {
            ModelArtifact::Linear(m) => Arc::new(m),
            ModelArtifact::Constant(m) => Arc::new(m),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: BTreeMap<String, f64>,
    #[serde(default)]
    pub feature_names_in: Option<Vec<String>>,
}

impl LinearModel {
    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.intercept.is_finite(), "intercept must be finite");
        for (name, coef) in &self.coefficients {
            ensure!(coef.is_finite(), "coefficient for {name:?} must be finite");
        }
        if let Some(names) = &self.feature_names_in {
            validate_feature_names(names)?;
            for name in names {
                ensure!(
                    self.coefficients.contains_key(name),
                    "declared feature {name:?} has no coefficient"
                );
            }
        }
        Ok(())
    }
}

impl Predictor for LinearModel {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn expected_columns(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    fn predict(&self, row: &FeatureRow) -> anyhow::Result<Vec<f64>> {
        if let Some(names) = &self.feature_names_in {
            check_schema(row, names)?;
        }

        let mut y = self.intercept;
        for (name, value) in row.iter() {
            let Some(coef) = self.coefficients.get(name) else {
                bail!("feature column {name:?} has no fitted coefficient");
            };
            y += coef * value.as_f64();
        }
        Ok(vec![y])
    }
}

/// Baseline regressor that ignores feature values.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstantModel {
    pub value: f64,
    #[serde(default)]
    pub feature_names_in: Option<Vec<String>>,
}

impl ConstantModel {
    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.value.is_finite(), "value must be finite");
        if let Some(names) = &self.feature_names_in {
            validate_feature_names(names)?;
        }
        Ok(())
    }
}

impl Predictor for ConstantModel {
    fn kind(&self) -> &'static str {
        "constant"
    }

    fn expected_columns(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    fn predict(&self, row: &FeatureRow) -> anyhow::Result<Vec<f64>> {
        if let Some(names) = &self.feature_names_in {
            check_schema(row, names)?;
        }
        Ok(vec![self.value])
    }
}

fn validate_feature_names(names: &[String]) -> anyhow::Result<()> {
    let mut seen = std::collections::BTreeSet::new();
    for name in names {
        ensure!(!name.trim().is_empty(), "feature names must be non-empty");
        ensure!(seen.insert(name.as_str()), "duplicate feature name {name:?}");
    }
    Ok(())
}

/// A fitted model rejects rows whose columns differ from the fit-time names.
fn check_schema(row: &FeatureRow, names: &[String]) -> anyhow::Result<()> {
    let unseen: Vec<&str> = row
        .column_names()
        .filter(|c| !names.iter().any(|n| n == c))
        .collect();
    let missing: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| !row.contains(n))
        .collect();

    if !unseen.is_empty() || !missing.is_empty() {
        bail!(
            "feature names should match those seen at fit time (unseen: {unseen:?}, missing: {missing:?})"
        );
    }
    Ok(())
}
