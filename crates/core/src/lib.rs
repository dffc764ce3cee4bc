pub mod domain;
pub mod features;
pub mod model;
pub mod predict;
pub mod render;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    pub const DEFAULT_MODEL_PATH: &str = "delivery_time_model.json";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub model_path: PathBuf,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let model_path = match std::env::var("MODEL_PATH") {
                Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
                Ok(_) | Err(std::env::VarError::NotPresent) => PathBuf::from(DEFAULT_MODEL_PATH),
                Err(e) => return Err(e).context("MODEL_PATH is not valid unicode"),
            };

            Ok(Self {
                model_path,
                sentry_dsn: std::env::var("SENTRY_DSN").ok().filter(|s| !s.trim().is_empty()),
            })
        }
    }
}
