use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $label:tt),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Form field name, also the prefix of the indicator column.
            pub const FIELD: &'static str = $field;

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = OrderInputError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label() == s)
                    .ok_or_else(|| OrderInputError::UnknownValue {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

labelled_enum!(
    ProductCategory, "product_category" {
        Electronics => "Electronics",
        Clothing => "Clothing",
        Books => "Books",
        HomeGoods => "Home Goods",
        Sports => "Sports",
    }
);

labelled_enum!(
    ShippingMethod, "shipping_method" {
        Standard => "Standard",
        Express => "Express",
        Overnight => "Overnight",
    }
);

labelled_enum!(
    CustomerLocation, "customer_location" {
        NorthAmerica => "North America",
        Europe => "Europe",
        Asia => "Asia",
        Australia => "Australia",
        SouthAmerica => "South America",
    }
);

pub const MIN_ORDER_QUANTITY: i64 = 1;

/// One submitted order. Lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInput {
    pub product_category: ProductCategory,
    pub shipping_method: ShippingMethod,
    pub customer_location: CustomerLocation,
    pub order_quantity: u32,
    pub order_date: NaiveDate,
}

impl OrderInput {
    pub fn try_new(
        product_category: ProductCategory,
        shipping_method: ShippingMethod,
        customer_location: CustomerLocation,
        order_quantity: i64,
        order_date: NaiveDate,
    ) -> Result<Self, OrderInputError> {
        if order_quantity < MIN_ORDER_QUANTITY {
            return Err(OrderInputError::QuantityBelowMinimum(order_quantity));
        }
        let order_quantity = u32::try_from(order_quantity)
            .map_err(|_| OrderInputError::InvalidQuantity(order_quantity.to_string()))?;

        Ok(Self {
            product_category,
            shipping_method,
            customer_location,
            order_quantity,
            order_date,
        })
    }
}

/// Raw, untyped order fields as submitted by a form or JSON client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOrder {
    pub product_category: String,
    pub shipping_method: String,
    pub customer_location: String,
    pub order_quantity: String,
    pub order_date: String,
}

impl RawOrder {
    /// Defaults shown on a fresh form.
    pub fn defaults(today: NaiveDate) -> Self {
        Self {
            product_category: ProductCategory::ALL[0].label().to_string(),
            shipping_method: ShippingMethod::ALL[0].label().to_string(),
            customer_location: CustomerLocation::ALL[0].label().to_string(),
            order_quantity: MIN_ORDER_QUANTITY.to_string(),
            order_date: today.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn parse(&self) -> Result<OrderInput, OrderInputError> {
        let quantity_str = self.order_quantity.trim();
        let order_quantity = quantity_str
            .parse::<i64>()
            .map_err(|_| OrderInputError::InvalidQuantity(quantity_str.to_string()))?;

        let date_str = self.order_date.trim();
        let order_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| OrderInputError::InvalidDate(date_str.to_string()))?;

        OrderInput::try_new(
            self.product_category.parse()?,
            self.shipping_method.parse()?,
            self.customer_location.parse()?,
            order_quantity,
            order_date,
        )
    }
}

impl From<&OrderInput> for RawOrder {
    fn from(input: &OrderInput) -> Self {
        Self {
            product_category: input.product_category.label().to_string(),
            shipping_method: input.shipping_method.label().to_string(),
            customer_location: input.customer_location.label().to_string(),
            order_quantity: input.order_quantity.to_string(),
            order_date: input.order_date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderInputError {
    UnknownValue { field: &'static str, value: String },
    InvalidQuantity(String),
    QuantityBelowMinimum(i64),
    InvalidDate(String),
}

impl fmt::Display for OrderInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderInputError::UnknownValue { field, value } => {
                write!(f, "unknown {field}: {value:?}")
            }
            OrderInputError::InvalidQuantity(v) => {
                write!(f, "order quantity must be a whole number (got {v:?})")
            }
            OrderInputError::QuantityBelowMinimum(q) => {
                write!(f, "order quantity must be at least {MIN_ORDER_QUANTITY} (got {q})")
            }
            OrderInputError::InvalidDate(v) => {
                write!(f, "order date must be YYYY-MM-DD (got {v:?})")
            }
        }
    }
}

impl std::error::Error for OrderInputError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(quantity: &str) -> RawOrder {
        RawOrder {
            product_category: "Home Goods".to_string(),
            shipping_method: "Overnight".to_string(),
            customer_location: "South America".to_string(),
            order_quantity: quantity.to_string(),
            order_date: "2024-02-29".to_string(),
        }
    }

    #[test]
    fn labels_round_trip_through_from_str() {
        for c in ProductCategory::ALL {
            assert_eq!(c.label().parse::<ProductCategory>().unwrap(), *c);
        }
        for s in ShippingMethod::ALL {
            assert_eq!(s.label().parse::<ShippingMethod>().unwrap(), *s);
        }
        for l in CustomerLocation::ALL {
            assert_eq!(l.label().parse::<CustomerLocation>().unwrap(), *l);
        }
        assert_eq!(ProductCategory::ALL.len(), 5);
        assert_eq!(ShippingMethod::ALL.len(), 3);
        assert_eq!(CustomerLocation::ALL.len(), 5);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "Groceries".parse::<ProductCategory>().unwrap_err();
        assert_eq!(
            err,
            OrderInputError::UnknownValue {
                field: "product_category",
                value: "Groceries".to_string(),
            }
        );
    }

    #[test]
    fn minimum_quantity_is_accepted() {
        let input = raw("1").parse().unwrap();
        assert_eq!(input.order_quantity, 1);
        assert_eq!(input.product_category, ProductCategory::HomeGoods);
        assert_eq!(input.customer_location, CustomerLocation::SouthAmerica);
        assert_eq!(input.order_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        assert_eq!(
            raw("0").parse().unwrap_err(),
            OrderInputError::QuantityBelowMinimum(0)
        );
        assert_eq!(
            raw("-4").parse().unwrap_err(),
            OrderInputError::QuantityBelowMinimum(-4)
        );
    }

    #[test]
    fn non_numeric_quantity_and_bad_date_are_rejected() {
        assert!(matches!(
            raw("2.5").parse(),
            Err(OrderInputError::InvalidQuantity(_))
        ));

        let mut bad_date = raw("1");
        bad_date.order_date = "2024-13-01".to_string();
        assert!(matches!(
            bad_date.parse(),
            Err(OrderInputError::InvalidDate(_))
        ));
    }

    #[test]
    fn defaults_parse_into_a_valid_order() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 27).unwrap();
        let input = RawOrder::defaults(today).parse().unwrap();
        assert_eq!(input.product_category, ProductCategory::Electronics);
        assert_eq!(input.shipping_method, ShippingMethod::Standard);
        assert_eq!(input.customer_location, CustomerLocation::NorthAmerica);
        assert_eq!(input.order_quantity, 1);
        assert_eq!(input.order_date, today);
    }
}
