use crate::features::FeatureRow;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod artifact;

pub use artifact::ModelArtifact;

/// A trained regressor supplied from outside this system.
pub trait Predictor: Send + Sync {
    /// Short name of the model family, used in logs and `inspect-model`.
    fn kind(&self) -> &'static str;

    /// Columns the model was fitted on, if it declares them.
    fn expected_columns(&self) -> Option<&[String]>;

    fn predict(&self, row: &FeatureRow) -> anyhow::Result<Vec<f64>>;
}

pub fn load_predictor(path: &Path) -> anyhow::Result<Arc<dyn Predictor>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read model artifact {}", path.display()))?;
    let artifact = serde_json::from_str::<ModelArtifact>(&text)
        .with_context(|| format!("failed to deserialize model artifact {}", path.display()))?;
    artifact
        .validate()
        .with_context(|| format!("invalid model artifact {}", path.display()))?;
    Ok(artifact.into_predictor())
}

/// Process-wide model handle, loaded once at startup and shared read-only.
#[derive(Clone)]
pub struct ModelState {
    path: PathBuf,
    predictor: Option<Arc<dyn Predictor>>,
    load_error: Option<String>,
}

impl ModelState {
    /// Loads the artifact at `path`. A failure is recorded, not returned, so
    /// callers keep running without a predictor.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match load_predictor(&path) {
            Ok(predictor) => {
                tracing::info!(
                    path = %path.display(),
                    kind = predictor.kind(),
                    expected_columns = predictor.expected_columns().map(<[String]>::len),
                    "model loaded"
                );
                Self {
                    path,
                    predictor: Some(predictor),
                    load_error: None,
                }
            }
            Err(err) => {
                tracing::error!(path = %path.display(), error = %format!("{err:#}"), "model load failed");
                Self {
                    path,
                    predictor: None,
                    load_error: Some(format!("{err:#}")),
                }
            }
        }
    }

    pub fn with_predictor(path: impl Into<PathBuf>, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            path: path.into(),
            predictor: Some(predictor),
            load_error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn predictor(&self) -> Option<&dyn Predictor> {
        self.predictor.as_deref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.predictor.is_some()
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelState")
            .field("path", &self.path)
            .field("kind", &self.predictor.as_ref().map(|p| p.kind()))
            .field("load_error", &self.load_error)
            .finish()
    }
}
