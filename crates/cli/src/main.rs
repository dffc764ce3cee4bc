use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timelytics_core::domain::order::{CustomerLocation, OrderInput, ProductCategory, ShippingMethod};
use timelytics_core::model::ModelState;
use timelytics_core::features::FeatureRow;
use timelytics_core::predict::{run_prediction, PredictionOutcome};
use timelytics_core::render;

#[derive(Debug, Parser)]
#[command(name = "timelytics_cli")]
struct Cli {
    /// Model artifact path. Defaults to MODEL_PATH or delivery_time_model.json.
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Estimate delivery time for one order.
    Predict(PredictArgs),
    /// Show what the configured model artifact declares.
    InspectModel,
}

#[derive(Debug, clap::Args)]
struct PredictArgs {
    /// One of: Electronics, Clothing, Books, Home Goods, Sports.
    #[arg(long)]
    product_category: ProductCategory,

    /// One of: Standard, Express, Overnight.
    #[arg(long)]
    shipping_method: ShippingMethod,

    /// One of: North America, Europe, Asia, Australia, South America.
    #[arg(long)]
    customer_location: CustomerLocation,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
    order_quantity: i64,

    /// Order date (YYYY-MM-DD). Defaults to today's local date.
    #[arg(long)]
    order_date: Option<String>,

    /// Print the result (and the feature row sent to the model) as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = timelytics_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Cli::parse();
    let model_path = args.model_path.unwrap_or(settings.model_path);
    let model = ModelState::load(model_path);

    let mut stdout = std::io::stdout().lock();
    match args.command {
        Command::Predict(predict) => run_predict(&model, predict, &mut stdout),
        Command::InspectModel => inspect_model(&model, &mut stdout),
    }
}

fn run_predict(model: &ModelState, args: PredictArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let order_date = resolve_order_date(args.order_date.as_deref())?;
    let input = OrderInput::try_new(
        args.product_category,
        args.shipping_method,
        args.customer_location,
        args.order_quantity,
        order_date,
    )?;

    let prediction = run_prediction(model, &input);

    if args.json {
        let body = outcome_json(&prediction.outcome, prediction.features.as_ref());
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
    } else {
        for line in render::outcome_lines(&prediction.outcome) {
            writeln!(out, "{line}")?;
        }
    }

    if let Err(err) = prediction.outcome {
        sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
        anyhow::bail!(err);
    }
    Ok(())
}

/// `features` is the exact row sent to the model, `null` when none was sent.
fn outcome_json(outcome: &PredictionOutcome, row: Option<&FeatureRow>) -> serde_json::Value {
    match outcome {
        Ok(result) => serde_json::json!({
            "status": "success",
            "duration_days": result.duration_days,
            "duration_display": render::format_duration(result.duration_days),
            "estimated_date": render::format_date(result.estimated_date),
            "features": row,
        }),
        Err(err) => serde_json::json!({
            "status": "error",
            "error_kind": err.kind,
            "message": err.to_string(),
            "features": row,
        }),
    }
}

fn inspect_model(model: &ModelState, out: &mut impl Write) -> anyhow::Result<()> {
    let predictor = model.predictor().with_context(|| {
        format!(
            "model unavailable at {}: {}",
            model.path().display(),
            model.load_error().unwrap_or("unknown error")
        )
    })?;

    writeln!(out, "path: {}", model.path().display())?;
    writeln!(out, "kind: {}", predictor.kind())?;
    match predictor.expected_columns() {
        Some(cols) => {
            writeln!(out, "expected columns ({}):", cols.len())?;
            for col in cols {
                writeln!(out, "  {col}")?;
            }
        }
        None => writeln!(out, "expected columns: not declared (feature rows are not aligned)")?,
    }
    Ok(())
}

fn init_sentry(settings: &timelytics_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn resolve_order_date(order_date_arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    if let Some(s) = order_date_arg {
        return chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --order-date {s:?} (expected YYYY-MM-DD)"));
    }
    Ok(chrono::Local::now().date_naive())
}
