//! Bulk catalog import: CSV parsing, per-row validation, upsert
//! orchestration, and the structured result report.
//!
//! Consistency model: last write wins per SKU, no transaction across rows.
//! A row failure never aborts the batch; only batch-shape problems (empty
//! file, missing columns, too many rows) reject the whole upload.

pub mod csv;
pub mod row;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::audit::AuditService;
use crate::services::catalog::{CatalogService, ProductUpsert};
use crate::services::inventory::InventoryService;

use self::row::{validate_row, CatalogRow};

/// Hard cap on data rows per upload.
pub const MAX_IMPORT_ROWS: usize = 500;

/// Outcome of a single data row, in file order. `row` is the 1-based file
/// line number: the header is line 1, so data row N is reported as N+1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowResult {
    pub row: usize,
    pub sku: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total: usize,
    pub created: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub results: Vec<RowResult>,
}

/// Whole-batch rejection: nothing was processed.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("CSV file is empty")]
    Empty,

    #[error("CSV is missing required columns: {0}")]
    MissingColumns(String),

    #[error("CSV has {0} data rows, the maximum is {MAX_IMPORT_ROWS}")]
    TooManyRows(usize),
}

/// Converts a dollar amount to integer cents, rounding half away from zero.
/// `None` when the value overflows i64 cents.
fn dollars_to_cents(dollars: Decimal) -> Option<i64> {
    (dollars * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

fn failed(row: usize, sku: &str, error: String) -> RowResult {
    RowResult {
        row,
        sku: if sku.is_empty() { "?" } else { sku }.to_string(),
        success: false,
        error: Some(error),
    }
}

#[derive(Clone)]
pub struct CsvImportService {
    catalog: Arc<CatalogService>,
    inventory: Arc<InventoryService>,
    audit: Arc<AuditService>,
    event_sender: EventSender,
}

impl CsvImportService {
    pub fn new(
        catalog: Arc<CatalogService>,
        inventory: Arc<InventoryService>,
        audit: Arc<AuditService>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            catalog,
            inventory,
            audit,
            event_sender,
        }
    }

    /// Imports a catalog CSV. Rows are processed strictly in file order,
    /// one awaited persistence call per row.
    #[instrument(skip(self, content), fields(file_name = %file_name))]
    pub async fn import(
        &self,
        file_name: &str,
        content: &str,
        actor: &str,
    ) -> Result<ImportReport, ImportError> {
        let doc = csv::parse_document(content).ok_or(ImportError::Empty)?;

        let missing: Vec<&str> = ["sku", "name"]
            .into_iter()
            .filter(|col| !doc.has_column(col))
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing.join(", ")));
        }

        if doc.rows.len() > MAX_IMPORT_ROWS {
            return Err(ImportError::TooManyRows(doc.rows.len()));
        }

        let mut results = Vec::with_capacity(doc.rows.len());
        let mut created = 0usize;

        for (i, raw) in doc.rows.iter().enumerate() {
            // Header occupies line 1.
            let line = i + 2;

            let parsed = match validate_row(raw, i + 1) {
                Ok(parsed) => parsed,
                Err(e) => {
                    results.push(failed(line, raw.get("sku").trim(), e.to_string()));
                    continue;
                }
            };

            match self.persist_row(&parsed).await {
                Ok(()) => {
                    created += 1;
                    results.push(RowResult {
                        row: line,
                        sku: parsed.sku.to_uppercase(),
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    // Row failures carry the concrete cause; the generic
                    // HTTP envelope wording is for whole-request errors only.
                    results.push(failed(line, &parsed.sku, e.to_string()));
                }
            }
        }

        let summary = ImportSummary {
            total: doc.rows.len(),
            created,
            failed: doc.rows.len() - created,
        };

        info!(
            total = summary.total,
            created = summary.created,
            failed = summary.failed,
            "CSV import finished"
        );

        // Fire-and-forget reporting; neither may fail the request.
        self.audit
            .record(
                actor,
                "products.import",
                "product",
                None,
                Some(serde_json::json!({
                    "file_name": file_name,
                    "total": summary.total,
                    "created": summary.created,
                    "failed": summary.failed,
                })),
            )
            .await;
        let _ = self
            .event_sender
            .send(Event::ProductsImported {
                file_name: file_name.to_string(),
                total: summary.total,
                created: summary.created,
                failed: summary.failed,
            })
            .await;

        Ok(ImportReport { summary, results })
    }

    /// Upserts the product and its 1:1 inventory record for one valid row.
    async fn persist_row(&self, parsed: &CatalogRow) -> Result<(), ServiceError> {
        let price_cents = dollars_to_cents(parsed.price_dollars).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Price '{}' is out of range",
                parsed.price_dollars
            ))
        })?;

        let tags = if parsed.tags.is_empty() {
            None
        } else {
            Some(parsed.tags.join(";"))
        };

        let (product, _was_insert) = self
            .catalog
            .upsert_by_sku(ProductUpsert {
                sku: parsed.sku.clone(),
                name: parsed.name.clone(),
                description: parsed.description.clone(),
                category: parsed.category.clone(),
                price_cents,
                weight_grams: parsed.weight_grams,
                min_order_qty: parsed.min_order_qty,
                max_order_qty: parsed.max_order_qty,
                is_active: parsed.active,
                requires_coa: parsed.requires_coa,
                tags,
            })
            .await?;

        self.inventory
            .upsert_for_product(product.id, parsed.initial_stock, parsed.low_stock_threshold)
            .await?;

        Ok(())
    }
}
