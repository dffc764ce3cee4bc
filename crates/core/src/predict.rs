use crate::domain::order::OrderInput;
use crate::features::{build_feature_row, undeclared_columns, FeatureRow};
use crate::model::ModelState;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::fmt;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub duration_days: f64,
    pub estimated_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionErrorKind {
    ModelUnavailable,
    PredictionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionError {
    pub kind: PredictionErrorKind,
    pub detail: String,
}

impl PredictionError {
    fn model_unavailable(state: &ModelState) -> Self {
        Self {
            kind: PredictionErrorKind::ModelUnavailable,
            detail: state.path().display().to_string(),
        }
    }

    fn failed(detail: impl Into<String>) -> Self {
        Self {
            kind: PredictionErrorKind::PredictionFailed,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for PredictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PredictionErrorKind::ModelUnavailable => write!(
                f,
                "Model file not found. Please ensure '{}' exists.",
                self.detail
            ),
            PredictionErrorKind::PredictionFailed => {
                write!(f, "Error making prediction: {}", self.detail)
            }
        }
    }
}

impl std::error::Error for PredictionError {}

pub type PredictionOutcome = Result<PredictionResult, PredictionError>;

/// `order_date` at midnight plus a fractional number of days, truncated back
/// to a calendar date.
pub fn estimated_delivery_date(order_date: NaiveDate, duration_days: f64) -> Option<NaiveDate> {
    if !duration_days.is_finite() {
        return None;
    }
    let millis = (duration_days * MILLIS_PER_DAY).round();
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    let delta = Duration::try_milliseconds(millis as i64)?;
    let start = order_date.and_hms_opt(0, 0, 0)?;
    start.checked_add_signed(delta).map(|dt| dt.date())
}

/// Feature row the loaded model would receive for `input`.
pub fn feature_row_for(state: &ModelState, input: &OrderInput) -> FeatureRow {
    let expected = state.predictor().and_then(|p| p.expected_columns());
    build_feature_row(input, expected)
}

/// Outcome of one prediction together with the row the model received.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// `None` when no model is loaded and nothing was sent.
    pub features: Option<FeatureRow>,
    pub outcome: PredictionOutcome,
}

/// Runs one order through the adapter and the model. Never panics on model
/// errors; every failure comes back as a [`PredictionError`].
pub fn predict_delivery(state: &ModelState, input: &OrderInput) -> PredictionOutcome {
    run_prediction(state, input).outcome
}

pub fn run_prediction(state: &ModelState, input: &OrderInput) -> Prediction {
    let Some(predictor) = state.predictor() else {
        tracing::warn!(path = %state.path().display(), "prediction requested without a loaded model");
        return Prediction {
            features: None,
            outcome: Err(PredictionError::model_unavailable(state)),
        };
    };

    let row = feature_row_for(state, input);
    if let Some(expected) = predictor.expected_columns() {
        let extra = undeclared_columns(&row, expected);
        if !extra.is_empty() {
            tracing::debug!(?extra, "feature row carries columns the model does not declare");
        }
    }

    let outcome = predictor
        .predict(&row)
        .map_err(|e| PredictionError::failed(format!("{e:#}")))
        .and_then(|output| {
            let duration_days = output
                .first()
                .copied()
                .ok_or_else(|| PredictionError::failed("model returned no output"))?;
            if !duration_days.is_finite() {
                return Err(PredictionError::failed(format!(
                    "model returned a non-finite duration ({duration_days})"
                )));
            }
            let estimated_date = estimated_delivery_date(input.order_date, duration_days)
                .ok_or_else(|| {
                    PredictionError::failed(format!(
                        "estimated delivery date is out of range ({duration_days} days after {})",
                        input.order_date
                    ))
                })?;
            Ok(PredictionResult {
                duration_days,
                estimated_date,
            })
        });

    match &outcome {
        Ok(result) => tracing::info!(
            product_category = %input.product_category,
            shipping_method = %input.shipping_method,
            customer_location = %input.customer_location,
            order_quantity = input.order_quantity,
            order_date = %input.order_date,
            duration_days = result.duration_days,
            estimated_date = %result.estimated_date,
            "prediction succeeded"
        ),
        Err(err) => tracing::warn!(error = %err, "prediction failed"),
    }

    Prediction {
        features: Some(row),
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{CustomerLocation, ProductCategory, ShippingMethod};
    use crate::model::Predictor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct FixedPredictor {
        value: Option<f64>,
        expected: Option<Vec<String>>,
        calls: AtomicUsize,
        last_row: Mutex<Option<FeatureRow>>,
    }

    impl FixedPredictor {
        fn new(value: f64) -> Self {
            Self {
                value: Some(value),
                expected: None,
                calls: AtomicUsize::new(0),
                last_row: Mutex::new(None),
            }
        }
    }

    impl Predictor for FixedPredictor {
        fn kind(&self) -> &'static str {
            "fixed"
        }

        fn expected_columns(&self) -> Option<&[String]> {
            self.expected.as_deref()
        }

        fn predict(&self, row: &FeatureRow) -> anyhow::Result<Vec<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_row.lock().unwrap() = Some(row.clone());
            Ok(self.value.into_iter().collect())
        }
    }

    struct FailingPredictor;

    impl Predictor for FailingPredictor {
        fn kind(&self) -> &'static str {
            "failing"
        }

        fn expected_columns(&self) -> Option<&[String]> {
            None
        }

        fn predict(&self, _row: &FeatureRow) -> anyhow::Result<Vec<f64>> {
            anyhow::bail!("could not convert string to float: 'Asia'")
        }
    }

    fn sample_order() -> OrderInput {
        OrderInput {
            product_category: ProductCategory::Electronics,
            shipping_method: ShippingMethod::Express,
            customer_location: CustomerLocation::Asia,
            order_quantity: 3,
            order_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        }
    }

    #[test]
    fn fractional_days_are_applied_from_midnight() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(
            estimated_delivery_date(d, 4.2),
            NaiveDate::from_ymd_opt(2024, 1, 14)
        );
        assert_eq!(
            estimated_delivery_date(d, 0.0),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
        assert_eq!(
            estimated_delivery_date(d, -0.5),
            NaiveDate::from_ymd_opt(2024, 1, 9)
        );
        assert_eq!(
            estimated_delivery_date(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(), 1.99),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(estimated_delivery_date(d, f64::NAN), None);
        assert_eq!(estimated_delivery_date(d, 1e300), None);
    }

    #[test]
    fn predicts_duration_and_date() {
        let state = ModelState::with_predictor("model.json", Arc::new(FixedPredictor::new(4.2)));
        let result = predict_delivery(&state, &sample_order()).unwrap();
        assert_eq!(result.duration_days, 4.2);
        assert_eq!(
            result.estimated_date,
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
        );
    }

    #[test]
    fn missing_model_short_circuits_every_time() {
        let dir = tempfile::tempdir().unwrap();
        let state = ModelState::load(dir.path().join("delivery_time_model.json"));
        for _ in 0..3 {
            let err = predict_delivery(&state, &sample_order()).unwrap_err();
            assert_eq!(err.kind, PredictionErrorKind::ModelUnavailable);
            assert!(err.to_string().starts_with("Model file not found."));
        }
    }

    #[test]
    fn predictor_error_becomes_prediction_failed() {
        let state = ModelState::with_predictor("model.json", Arc::new(FailingPredictor));
        let err = predict_delivery(&state, &sample_order()).unwrap_err();
        assert_eq!(err.kind, PredictionErrorKind::PredictionFailed);
        assert_eq!(
            err.to_string(),
            "Error making prediction: could not convert string to float: 'Asia'"
        );
    }

    #[test]
    fn empty_or_non_finite_output_is_a_failure() {
        let mut empty = FixedPredictor::new(0.0);
        empty.value = None;
        let state = ModelState::with_predictor("model.json", Arc::new(empty));
        let err = predict_delivery(&state, &sample_order()).unwrap_err();
        assert_eq!(err.kind, PredictionErrorKind::PredictionFailed);

        let state =
            ModelState::with_predictor("model.json", Arc::new(FixedPredictor::new(f64::INFINITY)));
        let err = predict_delivery(&state, &sample_order()).unwrap_err();
        assert!(err.detail.contains("non-finite"));
    }

    #[test]
    fn feature_row_is_aligned_to_declared_columns() {
        let mut predictor = FixedPredictor::new(1.0);
        predictor.expected = Some(vec![
            "order_quantity".to_string(),
            "shipping_method_Standard".to_string(),
        ]);
        let state = ModelState::with_predictor("model.json", Arc::new(predictor));
        let row = feature_row_for(&state, &sample_order());
        assert!(row.contains("shipping_method_Standard"));
        assert!(row.contains("shipping_method_Express"));
    }

    #[test]
    fn predictor_is_called_once_per_submission() {
        let predictor = Arc::new(FixedPredictor::new(2.0));
        let state = ModelState::with_predictor("model.json", predictor.clone());
        predict_delivery(&state, &sample_order()).unwrap();
        predict_delivery(&state, &sample_order()).unwrap();
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn returns_the_row_the_model_received() {
        let mut predictor = FixedPredictor::new(4.2);
        predictor.expected = Some(vec!["customer_location_Europe".to_string()]);
        let predictor = Arc::new(predictor);
        let state = ModelState::with_predictor("model.json", predictor.clone());

        let prediction = run_prediction(&state, &sample_order());
        let sent = predictor.last_row.lock().unwrap().clone();
        assert_eq!(prediction.features, sent);
        assert!(prediction
            .features
            .as_ref()
            .unwrap()
            .contains("customer_location_Europe"));
        assert!(prediction.outcome.is_ok());
    }

    #[test]
    fn no_row_is_built_without_a_model() {
        let dir = tempfile::tempdir().unwrap();
        let state = ModelState::load(dir.path().join("delivery_time_model.json"));
        let prediction = run_prediction(&state, &sample_order());
        assert!(prediction.features.is_none());
        assert_eq!(
            prediction.outcome.unwrap_err().kind,
            PredictionErrorKind::ModelUnavailable
        );
    }
}
