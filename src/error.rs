//! Typed failures raised by the indicator core.
//!
//! Parsing problems never show up here: unparseable dates and numbers are
//! absorbed as missing cells by the loader. What remains are the cases where a
//! computation cannot proceed because the input table lacks a column it needs.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndicatorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("None of the columns {candidates:?} were found. Available: {available:?}")]
    ColumnNotFound {
        candidates: Vec<String>,
        available: Vec<String>,
    },

    #[error("No identifiable supplier column among {candidates:?}. Available: {available:?}")]
    NoSupplierColumn {
        candidates: Vec<String>,
        available: Vec<String>,
    },

    #[error(
        "No usable total value column and no unit price × quantity pair. Available: {available:?}"
    )]
    NoTotalOrPriceQuantity { available: Vec<String> },
}

impl IndicatorError {
    pub fn column_not_found(candidates: Vec<String>, available: &[String]) -> Self {
        IndicatorError::ColumnNotFound {
            candidates,
            available: available.to_vec(),
        }
    }

    /// Every variant describes a column the caller's table does not provide.
    pub fn is_missing_column(&self) -> bool {
        matches!(
            self,
            IndicatorError::ColumnNotFound { .. }
                | IndicatorError::NoSupplierColumn { .. }
                | IndicatorError::NoTotalOrPriceQuantity { .. }
        )
    }

    /// Re-labels a resolution failure as the supplier-specific condition.
    pub fn into_supplier_error(self) -> Self {
        match self {
            IndicatorError::ColumnNotFound {
                candidates,
                available,
            } => IndicatorError::NoSupplierColumn {
                candidates,
                available,
            },
            other => other,
        }
    }
}
