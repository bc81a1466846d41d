use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use pstorage::models::ProductCandidate;

use crate::error::{PriceListError, Result};

pub const DELIMITER: u8 = b';';
pub const EXPECTED_HEADER: [&str; 2] = ["PRODUCT NAME", "PRICE"];

/// Lazily yields validated rows of a `PRODUCT NAME;PRICE` table.
///
/// The header is checked when the reader is opened. Rows come out one at a
/// time in file order; after the first error the iterator is exhausted.
pub struct PriceListReader<R: Read> {
    records: StringRecordsIntoIter<R>,
    failed: bool,
}

impl PriceListReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read> PriceListReader<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut header = StringRecord::new();
        let found: Vec<String> = if reader.read_record(&mut header)? {
            header.iter().map(str::to_string).collect()
        } else {
            Vec::new()
        };
        validate_header(&found)?;
        log::debug!("Accepted price list header {:?}", found);

        Ok(Self {
            records: reader.into_records(),
            failed: false,
        })
    }
}

impl<R: Read> Iterator for PriceListReader<R> {
    type Item = Result<ProductCandidate>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let parsed = match self.records.next()? {
            Ok(record) => {
                let line = record.position().map(|pos| pos.line()).unwrap_or_default();
                parse_row(&record, line)
            }
            Err(err) => Err(PriceListError::Csv(err)),
        };
        self.failed = parsed.is_err();
        Some(parsed)
    }
}

fn validate_header(found: &[String]) -> Result<()> {
    let normalized: Vec<&str> = found
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            if idx == 0 {
                field.trim_start_matches('\u{feff}')
            } else {
                field.as_str()
            }
        })
        .collect();

    if normalized != EXPECTED_HEADER {
        return Err(PriceListError::InvalidHeader {
            found: found.to_vec(),
        });
    }
    Ok(())
}

fn parse_row(record: &StringRecord, line: u64) -> Result<ProductCandidate> {
    if record.len() != EXPECTED_HEADER.len() {
        return Err(PriceListError::InvalidRowStructure {
            line,
            fields: record.len(),
        });
    }

    let product = &record[0];
    if product.is_empty() {
        return Err(PriceListError::InvalidValue {
            line,
            reason: "product name is empty".to_string(),
        });
    }

    let raw_price = &record[1];
    let price: f64 = raw_price.parse().map_err(|err| PriceListError::InvalidValue {
        line,
        reason: format!("price '{raw_price}' is not a number: {err}"),
    })?;
    if !price.is_finite() || price < 0.0 {
        return Err(PriceListError::InvalidValue {
            line,
            reason: format!("price '{raw_price}' must be a finite, non-negative number"),
        });
    }

    Ok(ProductCandidate::new(product, price))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(input: &str) -> Result<Vec<Result<ProductCandidate>>> {
        Ok(PriceListReader::from_reader(input.as_bytes())?.collect())
    }

    #[test]
    fn test_rows_come_out_in_file_order() {
        let rows = read_all("PRODUCT NAME;PRICE\napple;1.5\nbanana;0.25\r\ncherry;10\n").unwrap();
        let rows: Vec<ProductCandidate> = rows.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(
            rows,
            vec![
                ProductCandidate::new("apple", 1.5),
                ProductCandidate::new("banana", 0.25),
                ProductCandidate::new("cherry", 10.0),
            ]
        );
    }

    #[test]
    fn test_header_only_table_is_empty() {
        assert!(read_all("PRODUCT NAME;PRICE\n").unwrap().is_empty());
    }

    #[test]
    fn test_wrong_header_fails_on_open() {
        let err = PriceListReader::from_reader("FOO;BAR\napple;1\n".as_bytes())
            .err()
            .unwrap();
        assert!(matches!(err, PriceListError::InvalidHeader { found } if found == ["FOO", "BAR"]));
    }

    #[test]
    fn test_header_must_match_exactly() {
        for input in [
            "",
            "PRODUCT NAME\n",
            "PRICE;PRODUCT NAME\n",
            "product name;price\n",
            "PRODUCT NAME;PRICE;EXTRA\n",
            "PRODUCT NAME,PRICE\n",
        ] {
            let result = PriceListReader::from_reader(input.as_bytes());
            assert!(
                matches!(result, Err(PriceListError::InvalidHeader { .. })),
                "header accepted for {input:?}"
            );
        }
    }

    #[test]
    fn test_bom_before_header_is_ignored() {
        let rows = read_all("\u{feff}PRODUCT NAME;PRICE\napple;1\n").unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_row_with_three_fields_stops_iteration() {
        let rows = read_all("PRODUCT NAME;PRICE\napple;1\nbanana;2;3\ncherry;4\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_ok());
        assert!(matches!(
            rows[1],
            Err(PriceListError::InvalidRowStructure { line: 3, fields: 3 })
        ));
    }

    #[test]
    fn test_invalid_values() {
        for (row, expected_line) in [
            ("apple;cheap", 2u64),
            ("apple;", 2),
            (";1.0", 2),
            ("apple;-1", 2),
            ("apple;NaN", 2),
            ("apple;inf", 2),
        ] {
            let rows = read_all(&format!("PRODUCT NAME;PRICE\n{row}\n")).unwrap();
            assert!(
                matches!(rows[0], Err(PriceListError::InvalidValue { line, .. }) if line == expected_line),
                "row {row:?} was accepted"
            );
        }
    }

    #[test]
    fn test_exponent_and_integer_prices_parse() {
        let rows = read_all("PRODUCT NAME;PRICE\na;1e2\nb;7\nc;0\n").unwrap();
        let prices: Vec<f64> = rows.into_iter().map(|r| r.unwrap().price).collect();
        assert_eq!(prices, vec![100.0, 7.0, 0.0]);
    }
}
