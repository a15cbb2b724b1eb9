//! Per-row semantic validation for catalog uploads.
//!
//! Each raw row becomes either a normalized [`CatalogRow`] or a single
//! [`RowError`]: validation is short-circuit, the first violated rule wins.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use super::csv::RawRow;

static SKU_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid sku regex"));

pub const MAX_SKU_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 255;
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

pub const PRICE_ALIASES: &[&str] = &["price_dollars", "price", "cost_dollars", "cost"];
pub const STOCK_ALIASES: &[&str] = &["initial_stock", "stock", "on_hand"];
pub const THRESHOLD_ALIASES: &[&str] = &["low_stock_threshold", "reorder_point"];
pub const WEIGHT_ALIASES: &[&str] = &["weight_grams", "weight"];

/// A validated, normalized catalog row ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    /// Trimmed SKU as uploaded; persistence upper-cases it.
    pub sku: String,
    pub name: String,
    /// Unit price in dollars; converted to cents at persistence time.
    pub price_dollars: Decimal,
    pub description: Option<String>,
    pub category: Option<String>,
    pub initial_stock: i32,
    pub low_stock_threshold: i32,
    pub weight_grams: Option<i32>,
    pub min_order_qty: Option<i32>,
    pub max_order_qty: Option<i32>,
    pub active: bool,
    pub requires_coa: bool,
    pub tags: Vec<String>,
}

/// A human-readable reason the row was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError(pub String);

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn err(message: impl Into<String>) -> RowError {
    RowError(message.into())
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_non_negative_int(value: &str, what: &str) -> Result<i32, RowError> {
    value
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or_else(|| err(format!("Invalid {what} '{value}': must be a non-negative integer")))
}

fn parse_positive_int(value: &str, what: &str) -> Result<i32, RowError> {
    value
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| err(format!("Invalid {what} '{value}': must be a positive integer")))
}

fn parse_min_one_int(value: &str, what: &str) -> Result<i32, RowError> {
    value
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| err(format!("Invalid {what} '{value}': must be an integer of 1 or more")))
}

/// `active` defaults to true; only explicit negative tokens disable it.
fn parse_active_token(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "0" | "no" | "inactive"
    )
}

/// `requires_coa` defaults to false; only explicit positive tokens enable it.
fn parse_requires_coa_token(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_tags(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate one raw row. `row_index` is the 1-based data row number and is
/// only used for instrumentation; the error text stands on its own.
pub fn validate_row(row: &RawRow, _row_index: usize) -> Result<CatalogRow, RowError> {
    // 1. SKU
    let sku = row.get("sku").trim().to_string();
    if sku.is_empty() {
        return Err(err("SKU is required"));
    }
    if sku.chars().count() > MAX_SKU_LEN {
        return Err(err(format!("SKU must be {MAX_SKU_LEN} characters or fewer")));
    }
    if !SKU_PATTERN.is_match(&sku) {
        return Err(err(
            "SKU may only contain letters, numbers, hyphens, and underscores",
        ));
    }

    // 2. Name
    let name = row.get("name").trim().to_string();
    if name.is_empty() {
        return Err(err("Product name is required"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(err(format!(
            "Product name must be {MAX_NAME_LEN} characters or fewer"
        )));
    }

    // 3. Price (first non-empty alias wins)
    let raw_price = row
        .first_of(PRICE_ALIASES)
        .ok_or_else(|| err("Price is required"))?;
    let price_dollars = raw_price
        .trim()
        .parse::<Decimal>()
        .ok()
        .filter(|p| !p.is_sign_negative())
        .ok_or_else(|| {
            err(format!(
                "Invalid price '{raw_price}': must be a non-negative number"
            ))
        })?;

    // 4. Initial stock
    let initial_stock = match row.first_of(STOCK_ALIASES) {
        Some(v) => parse_non_negative_int(v, "initial stock")?,
        None => 0,
    };

    // 5. Low stock threshold
    let low_stock_threshold = match row.first_of(THRESHOLD_ALIASES) {
        Some(v) => parse_non_negative_int(v, "low stock threshold")?,
        None => DEFAULT_LOW_STOCK_THRESHOLD,
    };

    // 6. Weight
    let weight_grams = match row.first_of(WEIGHT_ALIASES) {
        Some(v) => Some(parse_positive_int(v, "weight")?),
        None => None,
    };

    // 7. Min/max order quantity
    let min_order_qty = match optional(row.get("min_order_qty")) {
        Some(v) => Some(parse_min_one_int(&v, "minimum order quantity")?),
        None => None,
    };
    let max_order_qty = match optional(row.get("max_order_qty")) {
        Some(v) => Some(parse_min_one_int(&v, "maximum order quantity")?),
        None => None,
    };

    let active = match optional(row.get("active")) {
        Some(v) => parse_active_token(&v),
        None => true,
    };
    let requires_coa = match optional(row.get("requires_coa")) {
        Some(v) => parse_requires_coa_token(&v),
        None => false,
    };

    Ok(CatalogRow {
        sku,
        name,
        price_dollars,
        description: optional(row.get("description")),
        category: optional(row.get("category")),
        initial_stock,
        low_stock_threshold,
        weight_grams,
        min_order_qty,
        max_order_qty,
        active,
        requires_coa,
        tags: parse_tags(row.get("tags")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn raw(pairs: &[(&str, &str)]) -> RawRow {
        RawRow::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn minimal(sku: &str, name: &str, price: &str) -> RawRow {
        raw(&[("sku", sku), ("name", name), ("price_dollars", price)])
    }

    #[test]
    fn minimal_valid_row_gets_defaults() {
        let row = validate_row(&minimal("BPC-157-5MG", "BPC-157 5mg", "24.99"), 1).unwrap();
        assert_eq!(row.sku, "BPC-157-5MG");
        assert_eq!(row.price_dollars, "24.99".parse::<Decimal>().unwrap());
        assert_eq!(row.initial_stock, 0);
        assert_eq!(row.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
        assert!(row.active);
        assert!(!row.requires_coa);
        assert!(row.tags.is_empty());
    }

    #[test]
    fn sku_is_validated_first_and_pattern_error_names_allowed_chars() {
        let e = validate_row(&minimal("", "Widget", "1.00"), 1).unwrap_err();
        assert_eq!(e.0, "SKU is required");

        let e = validate_row(&minimal("BAD SKU!", "Widget", "9.99"), 1).unwrap_err();
        assert!(e.0.contains("letters, numbers, hyphens"));

        let long = "X".repeat(51);
        let e = validate_row(&minimal(&long, "Widget", "1.00"), 1).unwrap_err();
        assert!(e.0.contains("50 characters"));
    }

    #[test]
    fn sku_length_counts_characters_not_bytes() {
        // 30 characters but over 50 bytes: short enough, so the pattern
        // rule is the one that rejects it.
        let multibyte = "µ".repeat(30);
        let e = validate_row(&minimal(&multibyte, "Widget", "1.00"), 1).unwrap_err();
        assert!(e.0.contains("letters, numbers, hyphens"));

        let too_long = "µ".repeat(51);
        let e = validate_row(&minimal(&too_long, "Widget", "1.00"), 1).unwrap_err();
        assert!(e.0.contains("50 characters"));
    }

    #[test]
    fn name_required_and_bounded() {
        let e = validate_row(&minimal("A-1", "", "1.00"), 1).unwrap_err();
        assert_eq!(e.0, "Product name is required");

        let long = "n".repeat(256);
        let e = validate_row(&minimal("A-1", &long, "1.00"), 1).unwrap_err();
        assert!(e.0.contains("255 characters"));
    }

    #[test]
    fn price_aliases_first_non_empty_wins() {
        let row = raw(&[
            ("sku", "A-1"),
            ("name", "Widget"),
            ("price_dollars", ""),
            ("cost", "3.50"),
        ]);
        let parsed = validate_row(&row, 1).unwrap();
        assert_eq!(parsed.price_dollars, "3.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn price_zero_is_valid_negative_and_garbage_are_not() {
        assert!(validate_row(&minimal("A-1", "Widget", "0"), 1).is_ok());

        let e = validate_row(&minimal("A-1", "Widget", "-1"), 1).unwrap_err();
        assert!(e.0.contains("'-1'"));

        let e = validate_row(&minimal("A-1", "Widget", "abc"), 1).unwrap_err();
        assert!(e.0.contains("'abc'"));
    }

    #[test]
    fn missing_price_is_required_error() {
        let e = validate_row(&raw(&[("sku", "A-1"), ("name", "Widget")]), 1).unwrap_err();
        assert_eq!(e.0, "Price is required");
    }

    #[test]
    fn stock_aliases_and_bounds() {
        let row = raw(&[
            ("sku", "A-1"),
            ("name", "Widget"),
            ("price", "1.00"),
            ("on_hand", "42"),
        ]);
        assert_eq!(validate_row(&row, 1).unwrap().initial_stock, 42);

        let row = raw(&[
            ("sku", "A-1"),
            ("name", "Widget"),
            ("price", "1.00"),
            ("initial_stock", "-5"),
        ]);
        assert!(validate_row(&row, 1).is_err());
    }

    #[test]
    fn weight_must_be_strictly_positive() {
        let row = raw(&[
            ("sku", "A-1"),
            ("name", "Widget"),
            ("price", "1.00"),
            ("weight_grams", "0"),
        ]);
        let e = validate_row(&row, 1).unwrap_err();
        assert!(e.0.contains("positive integer"));
    }

    #[test]
    fn order_quantity_bounds() {
        let row = raw(&[
            ("sku", "A-1"),
            ("name", "Widget"),
            ("price", "1.00"),
            ("min_order_qty", "0"),
        ]);
        assert!(validate_row(&row, 1).is_err());

        let row = raw(&[
            ("sku", "A-1"),
            ("name", "Widget"),
            ("price", "1.00"),
            ("min_order_qty", "1"),
            ("max_order_qty", "10"),
        ]);
        let parsed = validate_row(&row, 1).unwrap();
        assert_eq!(parsed.min_order_qty, Some(1));
        assert_eq!(parsed.max_order_qty, Some(10));
    }

    #[test]
    fn boolean_tokens() {
        for token in ["false", "0", "no", "inactive", "FALSE", " No "] {
            assert!(!parse_active_token(token), "token {token:?}");
        }
        for token in ["true", "yes", "anything", ""] {
            assert!(parse_active_token(token), "token {token:?}");
        }

        for token in ["true", "1", "yes", "TRUE", " Yes "] {
            assert!(parse_requires_coa_token(token), "token {token:?}");
        }
        for token in ["false", "0", "no", "anything", ""] {
            assert!(!parse_requires_coa_token(token), "token {token:?}");
        }
    }

    #[test]
    fn tags_split_on_semicolons_dropping_empties() {
        let row = raw(&[
            ("sku", "A-1"),
            ("name", "Widget"),
            ("price", "1.00"),
            ("tags", "peptide; research ;;"),
        ]);
        assert_eq!(validate_row(&row, 1).unwrap().tags, vec!["peptide", "research"]);
    }

    #[test]
    fn validation_short_circuits_on_first_failure() {
        // Both the SKU and the price are invalid; only the SKU is reported.
        let e = validate_row(&minimal("BAD SKU!", "Widget", "abc"), 1).unwrap_err();
        assert!(e.0.contains("letters, numbers, hyphens"));
    }
}
