use axum::{
    extract::{rejection::JsonRejection, Form, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timelytics_core::domain::order::RawOrder;
use timelytics_core::model::ModelState;
use timelytics_core::predict::{predict_delivery, PredictionError, PredictionErrorKind};
use timelytics_core::render::{self, PageMessage, PageView};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = timelytics_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let model = ModelState::load(&settings.model_path);
    if let Some(err) = model.load_error() {
        sentry_anyhow::capture_anyhow(&anyhow::anyhow!("model load failed: {err}"));
        tracing::error!(
            path = %model.path().display(),
            "starting without a model; predictions will report the model as unavailable"
        );
    }

    let state = AppState { model };
    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_json))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    model: ModelState,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn page(state: &AppState, form: &RawOrder, message: Option<&PageMessage>) -> Html<String> {
    Html(render::render_page(&PageView {
        form,
        model_error: state.model.load_error(),
        message,
    }))
}

async fn index(State(state): State<AppState>) -> Html<String> {
    page(&state, &RawOrder::defaults(today()), None)
}

async fn predict_form(State(state): State<AppState>, Form(form): Form<RawOrder>) -> Html<String> {
    let message = match form.parse() {
        Ok(input) => PageMessage::Outcome(predict_delivery(&state.model, &input)),
        Err(e) => {
            tracing::info!(error = %e, "rejected form submission");
            PageMessage::InvalidInput(e.to_string())
        }
    };
    page(&state, &form, Some(&message))
}

/// Quantity and date stay loosely typed so malformed values reach
/// `RawOrder::parse` and come back as `invalid_input`.
#[derive(Debug, Deserialize)]
struct PredictRequest {
    #[serde(default)]
    product_category: String,
    #[serde(default)]
    shipping_method: String,
    #[serde(default)]
    customer_location: String,
    #[serde(default)]
    order_quantity: Option<serde_json::Value>,
    #[serde(default)]
    order_date: Option<String>,
}

impl PredictRequest {
    fn into_raw_order(self) -> RawOrder {
        let order_quantity = match self.order_quantity {
            None | Some(serde_json::Value::Null) => {
                timelytics_core::domain::order::MIN_ORDER_QUANTITY.to_string()
            }
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
        };
        RawOrder {
            product_category: self.product_category,
            shipping_method: self.shipping_method,
            customer_location: self.customer_location,
            order_quantity,
            order_date: self
                .order_date
                .unwrap_or_else(|| render::format_date(today())),
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    duration_days: f64,
    estimated_date: NaiveDate,
    duration_display: String,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error_kind: &'static str,
    message: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn invalid_input(message: String) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error_kind: "invalid_input",
            message,
        }),
    )
}

fn prediction_error_response(err: PredictionError) -> (StatusCode, Json<ApiError>) {
    let (status, error_kind) = match err.kind {
        PredictionErrorKind::ModelUnavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable")
        }
        PredictionErrorKind::PredictionFailed => {
            (StatusCode::UNPROCESSABLE_ENTITY, "prediction_failed")
        }
    };
    (
        status,
        Json(ApiError {
            error_kind,
            message: err.to_string(),
        }),
    )
}

async fn predict_json(
    State(state): State<AppState>,
    req: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<PredictResponse> {
    let Json(req) = req.map_err(|e| invalid_input(e.body_text()))?;
    let input = req
        .into_raw_order()
        .parse()
        .map_err(|e| invalid_input(e.to_string()))?;

    let result = predict_delivery(&state.model, &input).map_err(prediction_error_response)?;

    Ok(Json(PredictResponse {
        duration_days: result.duration_days,
        estimated_date: result.estimated_date,
        duration_display: render::format_duration(result.duration_days),
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
