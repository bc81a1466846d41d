use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StorageError};

/// A stored catalog document, one per distinct product name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub product: String,
    pub price: f64,
    pub times_changed: i64,
    pub request_time: i64, // Unix timestamp
}

impl ProductRecord {
    /// A record seen for the first time: the change counter starts at zero.
    pub fn first_sighting(candidate: &ProductCandidate, request_time: i64) -> Self {
        Self {
            product: candidate.product.clone(),
            price: candidate.price,
            times_changed: 0,
            request_time,
        }
    }
}

/// A validated price-list row waiting to be reconciled against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCandidate {
    pub product: String,
    pub price: f64,
}

impl ProductCandidate {
    pub fn new(product: impl Into<String>, price: f64) -> Self {
        Self {
            product: product.into(),
            price,
        }
    }
}

/// The field set written by a price update. All three fields move together.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub price: f64,
    pub times_changed: i64,
    pub request_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortColumn {
    Product,
    Price,
    TimesChanged,
    RequestTime,
}

impl SortColumn {
    /// Column name in the catalog table.
    pub fn sql_column(&self) -> &'static str {
        match self {
            SortColumn::Product => "product",
            SortColumn::Price => "price",
            SortColumn::TimesChanged => "times_changed",
            SortColumn::RequestTime => "request_time",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Product => "product",
            SortColumn::Price => "price",
            SortColumn::TimesChanged => "timesChanged",
            SortColumn::RequestTime => "requestTime",
        }
    }
}

impl FromStr for SortColumn {
    type Err = StorageError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "product" | "name" => Ok(SortColumn::Product),
            "price" => Ok(SortColumn::Price),
            "timeschanged" | "times_changed" | "timespricechanged" => {
                Ok(SortColumn::TimesChanged)
            }
            "requesttime" | "request_time" => Ok(SortColumn::RequestTime),
            other => Err(StorageError::InvalidArg(format!(
                "unknown sort column '{other}', expected one of product, price, timesChanged, requestTime"
            ))),
        }
    }
}

impl TryFrom<String> for SortColumn {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SortColumn> for String {
    fn from(value: SortColumn) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }

    pub fn sql_keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Document-store style order flag: `1` ascending, `-1` descending.
impl TryFrom<i32> for SortDirection {
    type Error = StorageError;

    fn try_from(order: i32) -> Result<Self> {
        match order {
            1 => Ok(SortDirection::Ascending),
            -1 => Ok(SortDirection::Descending),
            other => Err(StorageError::InvalidArg(format!(
                "sort order must be 1 or -1, got {other}"
            ))),
        }
    }
}

impl FromStr for SortDirection {
    type Err = StorageError;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Ok(order) = value.parse::<i32>() {
            return SortDirection::try_from(order);
        }
        match value.to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(SortDirection::Ascending),
            "descending" | "desc" => Ok(SortDirection::Descending),
            other => Err(StorageError::InvalidArg(format!(
                "unknown sort direction '{other}', expected ascending or descending"
            ))),
        }
    }
}

impl TryFrom<String> for SortDirection {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SortDirection> for String {
    fn from(value: SortDirection) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

/// One page request over the sorted catalog.
///
/// `page_number` is signed: negative values count pages from the end of the
/// result set. See [`crate::pager::select_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub sort: SortSpec,
    pub page_number: i64,
    pub page_size: i64,
}

impl PageSpec {
    pub fn new(sort: SortSpec, page_number: i64, page_size: i64) -> Result<Self> {
        if page_size <= 0 {
            return Err(StorageError::InvalidArg(format!(
                "page size must be positive, got {page_size}"
            )));
        }
        Ok(Self {
            sort,
            page_number,
            page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_column_aliases() {
        assert_eq!("product".parse::<SortColumn>().unwrap(), SortColumn::Product);
        assert_eq!("PRICE".parse::<SortColumn>().unwrap(), SortColumn::Price);
        assert_eq!(
            "timesChanged".parse::<SortColumn>().unwrap(),
            SortColumn::TimesChanged
        );
        assert_eq!(
            "timespricechanged".parse::<SortColumn>().unwrap(),
            SortColumn::TimesChanged
        );
        assert_eq!(
            "request_time".parse::<SortColumn>().unwrap(),
            SortColumn::RequestTime
        );
        assert!(matches!(
            "price; DROP TABLE products".parse::<SortColumn>(),
            Err(StorageError::InvalidArg(_))
        ));
    }

    #[test]
    fn test_sort_direction_accepts_names_and_order_flags() {
        assert_eq!(
            "ascending".parse::<SortDirection>().unwrap(),
            SortDirection::Ascending
        );
        assert_eq!("-1".parse::<SortDirection>().unwrap(), SortDirection::Descending);
        assert_eq!(SortDirection::try_from(1).unwrap(), SortDirection::Ascending);
        assert!(SortDirection::try_from(0).is_err());
        assert!("2".parse::<SortDirection>().is_err());
        assert_eq!(" DESC ".parse::<SortDirection>().unwrap(), SortDirection::Descending);
    }

    #[test]
    fn test_page_spec_rejects_non_positive_size() {
        let sort = SortSpec::new(SortColumn::Price, SortDirection::Ascending);
        assert!(PageSpec::new(sort, 1, 0).is_err());
        assert!(PageSpec::new(sort, 1, -5).is_err());
        assert!(PageSpec::new(sort, -3, 10).is_ok());
    }

    #[test]
    fn test_record_serializes_with_camel_case_fields() {
        let record = ProductRecord {
            product: "apple".to_string(),
            price: 1.5,
            times_changed: 2,
            request_time: 1_700_000_000,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["timesChanged"], 2);
        assert_eq!(value["requestTime"], 1_700_000_000);
        let back: ProductRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
