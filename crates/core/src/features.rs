use crate::domain::order::{CustomerLocation, OrderInput, ProductCategory, ShippingMethod};
use chrono::Datelike;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const ORDER_QUANTITY: &str = "order_quantity";
pub const ORDER_DAY: &str = "order_day";
pub const ORDER_MONTH: &str = "order_month";
pub const ORDER_YEAR: &str = "order_year";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Indicator(bool),
    Number(f64),
}

impl FeatureValue {
    pub fn as_f64(self) -> f64 {
        match self {
            FeatureValue::Indicator(true) => 1.0,
            FeatureValue::Indicator(false) => 0.0,
            FeatureValue::Number(n) => n,
        }
    }
}

/// Single-row feature table, columns kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    columns: Vec<(String, FeatureValue)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing an existing column in place.
    pub fn insert(&mut self, name: impl Into<String>, value: FeatureValue) {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.columns.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureValue)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

pub fn indicator_column(field: &str, value: &str) -> String {
    format!("{field}_{value}")
}

/// Builds the feature row for one order.
///
/// Only the observed value of each categorical field gets an indicator
/// column. When `expected_columns` is given, every expected column missing
/// from the row is appended with value 0. Columns the model did not declare
/// are left in place.
pub fn build_feature_row(input: &OrderInput, expected_columns: Option<&[String]>) -> FeatureRow {
    let mut row = FeatureRow::new();

    row.insert(
        ORDER_QUANTITY,
        FeatureValue::Number(f64::from(input.order_quantity)),
    );
    row.insert(ORDER_DAY, FeatureValue::Number(f64::from(input.order_date.day())));
    row.insert(
        ORDER_MONTH,
        FeatureValue::Number(f64::from(input.order_date.month())),
    );
    row.insert(ORDER_YEAR, FeatureValue::Number(f64::from(input.order_date.year())));

    row.insert(
        indicator_column(ProductCategory::FIELD, input.product_category.label()),
        FeatureValue::Indicator(true),
    );
    row.insert(
        indicator_column(ShippingMethod::FIELD, input.shipping_method.label()),
        FeatureValue::Indicator(true),
    );
    row.insert(
        indicator_column(CustomerLocation::FIELD, input.customer_location.label()),
        FeatureValue::Indicator(true),
    );

    if let Some(expected) = expected_columns {
        align_to_expected(&mut row, expected);
    }

    row
}

pub fn align_to_expected(row: &mut FeatureRow, expected: &[String]) {
    for col in expected {
        if !row.contains(col) {
            row.insert(col.clone(), FeatureValue::Number(0.0));
        }
    }
}

/// Columns present in `row` that the model does not declare.
pub fn undeclared_columns<'a>(row: &'a FeatureRow, expected: &[String]) -> Vec<&'a str> {
    row.column_names()
        .filter(|c| !expected.iter().any(|e| e == c))
        .collect()
}
