use crate::domain::order::{CustomerLocation, ProductCategory, RawOrder, ShippingMethod};
use crate::predict::{PredictionErrorKind, PredictionOutcome, PredictionResult};
use std::fmt::Write;

pub const TITLE: &str = "Timelytics: Order to Delivery Time Prediction";
pub const SUBTITLE: &str = "Enter order details to predict the expected delivery time";
pub const SUBMIT_LABEL: &str = "Predict Delivery Time";

pub const HOW_TO_USE: [&str; 6] = [
    "Select the product category from the dropdown",
    "Choose the shipping method",
    "Select the customer location",
    "Enter the order quantity",
    "Pick the order date",
    "Click 'Predict Delivery Time' to get the estimation",
];

pub const DISCLAIMER: &str =
    "Note: This prediction is based on historical data and may vary due to external factors.";

pub fn format_duration(duration_days: f64) -> String {
    format!("{duration_days:.1} days")
}

pub fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Plain-text lines for a prediction outcome.
pub fn outcome_lines(outcome: &PredictionOutcome) -> Vec<String> {
    match outcome {
        Ok(PredictionResult {
            duration_days,
            estimated_date,
        }) => vec![
            "Prediction Successful!".to_string(),
            format!("Estimated Delivery Time: {}", format_duration(*duration_days)),
            format!("Estimated Delivery Date: {}", format_date(*estimated_date)),
        ],
        Err(err) => vec![err.to_string()],
    }
}

/// What the page shows below the form.
#[derive(Debug, Clone)]
pub enum PageMessage {
    Outcome(PredictionOutcome),
    InvalidInput(String),
}

/// Everything needed to render the single page.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub form: &'a RawOrder,
    /// Set when the model failed to load at startup.
    pub model_error: Option<&'a str>,
    pub message: Option<&'a PageMessage>,
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn select(out: &mut String, name: &str, label: &str, options: &[&str], selected: &str) {
    let _ = write!(
        out,
        "<label for=\"{name}\">{label}</label>\n<select id=\"{name}\" name=\"{name}\">\n"
    );
    for opt in options {
        let opt = escape_html(opt);
        let sel = if opt == escape_html(selected) { " selected" } else { "" };
        let _ = writeln!(out, "<option value=\"{opt}\"{sel}>{opt}</option>");
    }
    out.push_str("</select>\n");
}

fn labels<T: Copy>(all: &[T], label: fn(T) -> &'static str) -> Vec<&'static str> {
    all.iter().copied().map(label).collect()
}

fn message_html(out: &mut String, message: &PageMessage) {
    match message {
        PageMessage::Outcome(Ok(result)) => {
            out.push_str("<div class=\"success\">Prediction Successful!</div>\n");
            let _ = writeln!(
                out,
                "<p>Estimated Delivery Time: {}</p>",
                format_duration(result.duration_days)
            );
            let _ = writeln!(
                out,
                "<p>Estimated Delivery Date: {}</p>",
                format_date(result.estimated_date)
            );
        }
        PageMessage::Outcome(Err(err)) => {
            let class = match err.kind {
                PredictionErrorKind::ModelUnavailable => "error model-unavailable",
                PredictionErrorKind::PredictionFailed => "error prediction-failed",
            };
            let _ = writeln!(
                out,
                "<div class=\"{class}\">{}</div>",
                escape_html(&err.to_string())
            );
        }
        PageMessage::InvalidInput(msg) => {
            let _ = writeln!(
                out,
                "<div class=\"error invalid-input\">Invalid input: {}</div>",
                escape_html(msg)
            );
        }
    }
}

const STYLE: &str = "body{font-family:sans-serif;max-width:46rem;margin:2rem auto;padding:0 1rem}\
.columns{display:flex;gap:2rem}.columns>div{flex:1}\
label{display:block;margin-top:.75rem}select,input{width:100%;padding:.3rem}\
button{margin-top:1rem;padding:.5rem 1rem}\
.success{background:#e6f4ea;color:#1e4620;padding:.75rem;margin-top:1rem}\
.error{background:#fdecea;color:#611a15;padding:.75rem;margin-top:1rem}";

pub fn render_page(view: &PageView<'_>) -> String {
    let form = view.form;
    let mut out = String::with_capacity(4096);

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <h1>{TITLE}</h1>\n<p>{SUBTITLE}</p>\n"
    );

    if let Some(err) = view.model_error {
        let _ = writeln!(
            out,
            "<div class=\"error model-unavailable\">Model file not found. Please ensure the model file exists. ({})</div>",
            escape_html(err)
        );
    }

    out.push_str("<form method=\"post\" action=\"/predict\">\n<div class=\"columns\">\n<div>\n");
    select(
        &mut out,
        ProductCategory::FIELD,
        "Product Category",
        &labels(ProductCategory::ALL, ProductCategory::label),
        &form.product_category,
    );
    select(
        &mut out,
        ShippingMethod::FIELD,
        "Shipping Method",
        &labels(ShippingMethod::ALL, ShippingMethod::label),
        &form.shipping_method,
    );
    out.push_str("</div>\n<div>\n");
    select(
        &mut out,
        CustomerLocation::FIELD,
        "Customer Location",
        &labels(CustomerLocation::ALL, CustomerLocation::label),
        &form.customer_location,
    );
    let _ = write!(
        out,
        "<label for=\"order_date\">Order Date</label>\n\
         <input type=\"date\" id=\"order_date\" name=\"order_date\" value=\"{}\" required>\n",
        escape_html(&form.order_date)
    );
    out.push_str("</div>\n</div>\n");
    let _ = write!(
        out,
        "<label for=\"order_quantity\">Order Quantity</label>\n\
         <input type=\"number\" id=\"order_quantity\" name=\"order_quantity\" min=\"1\" step=\"1\" value=\"{}\" required>\n\
         <button type=\"submit\">{SUBMIT_LABEL}</button>\n</form>\n",
        escape_html(&form.order_quantity)
    );

    if let Some(message) = view.message {
        message_html(&mut out, message);
    }

    out.push_str("<h3>How to Use</h3>\n<ol>\n");
    for step in HOW_TO_USE {
        let _ = writeln!(out, "<li>{}</li>", escape_html(step));
    }
    let _ = write!(out, "</ol>\n<p><em>{DISCLAIMER}</em></p>\n</body>\n</html>\n");

    out
}
