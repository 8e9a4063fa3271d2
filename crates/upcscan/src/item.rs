//! Core record types for upcscan.
//!
//! This module defines the scanned item record persisted after a successful
//! lookup, and the retail barcode symbologies the scanner accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lookup::ProductRecord;

/// A persisted record of one barcode lookup result.
///
/// The barcode is the unique key: at most one record per id is kept in the
/// store. Product fields are stored exactly as the API returned them; the
/// "N/A" placeholder only exists in the rendered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedItem {
    /// The scanned barcode.
    pub id: String,

    /// Product title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Product brand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// Product description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When the lookup succeeded.
    pub timestamp: DateTime<Utc>,
}

impl ScannedItem {
    /// Build a record for `barcode` from the first product the API returned.
    ///
    /// The timestamp is set to now.
    #[must_use]
    pub fn from_product(barcode: &str, product: &ProductRecord) -> Self {
        Self {
            id: barcode.to_string(),
            title: product.title.clone(),
            brand: product.brand.clone(),
            description: product.description.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// A retail barcode symbology the decoder can be configured to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbology {
    /// EAN-13, the 13-digit international article number.
    #[serde(rename = "ean_13")]
    Ean13,
    /// EAN-8, the short 8-digit article number.
    #[serde(rename = "ean_8")]
    Ean8,
    /// UPC-A, the 12-digit North American product code.
    #[serde(rename = "upc_a")]
    UpcA,
    /// UPC-E, the zero-suppressed form of UPC-A.
    #[serde(rename = "upc_e")]
    UpcE,
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ean13 => write!(f, "EAN-13"),
            Self::Ean8 => write!(f, "EAN-8"),
            Self::UpcA => write!(f, "UPC-A"),
            Self::UpcE => write!(f, "UPC-E"),
        }
    }
}

impl Symbology {
    /// All supported symbologies, in default reader order.
    pub const ALL: [Self; 4] = [Self::Ean13, Self::Ean8, Self::UpcA, Self::UpcE];

    /// Check whether `code` is a well-formed barcode of this symbology.
    ///
    /// Checks length, digit content and the GS1 check digit. A 6-digit
    /// UPC-E body without number system or check digit is also accepted.
    #[must_use]
    pub fn accepts(self, code: &str) -> bool {
        let Some(digits) = parse_digits(code) else {
            return false;
        };

        match self {
            Self::Ean13 => digits.len() == 13 && has_valid_check_digit(&digits),
            Self::Ean8 => digits.len() == 8 && has_valid_check_digit(&digits),
            Self::UpcA => digits.len() == 12 && has_valid_check_digit(&digits),
            Self::UpcE => match digits.len() {
                6 => true,
                8 => expand_upc_e(&digits).is_some_and(|upc_a| has_valid_check_digit(&upc_a)),
                _ => false,
            },
        }
    }

    /// Find the first symbology in `readers` that accepts `code`.
    #[must_use]
    pub fn classify(code: &str, readers: &[Self]) -> Option<Self> {
        readers.iter().copied().find(|s| s.accepts(code))
    }
}

fn parse_digits(code: &str) -> Option<Vec<u32>> {
    if code.is_empty() {
        return None;
    }
    code.chars().map(|c| c.to_digit(10)).collect()
}

/// Validate the trailing GS1 check digit of `digits`.
fn has_valid_check_digit(digits: &[u32]) -> bool {
    let Some((&check, data)) = digits.split_last() else {
        return false;
    };
    gs1_check_digit(data) == check
}

/// Compute the GS1 mod-10 check digit (weights 3,1,3,... from the right).
fn gs1_check_digit(data: &[u32]) -> u32 {
    let sum: u32 = data
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d * 3 } else { d })
        .sum();
    (10 - sum % 10) % 10
}

/// Expand an 8-digit UPC-E code to its 12-digit UPC-A equivalent.
///
/// Returns `None` when the number system digit is not 0 or 1.
fn expand_upc_e(digits: &[u32]) -> Option<Vec<u32>> {
    let &[ns, d1, d2, d3, d4, d5, d6, check] = digits else {
        return None;
    };
    if ns > 1 {
        return None;
    }

    let body: [u32; 10] = match d6 {
        0..=2 => [d1, d2, d6, 0, 0, 0, 0, d3, d4, d5],
        3 => [d1, d2, d3, 0, 0, 0, 0, 0, d4, d5],
        4 => [d1, d2, d3, d4, 0, 0, 0, 0, 0, d5],
        _ => [d1, d2, d3, d4, d5, 0, 0, 0, 0, d6],
    };

    let mut upc_a = Vec::with_capacity(12);
    upc_a.push(ns);
    upc_a.extend_from_slice(&body);
    upc_a.push(check);
    Some(upc_a)
}
