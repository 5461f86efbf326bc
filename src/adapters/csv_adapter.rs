//! CSV file price-store adapter.
//!
//! One `<SYMBOL>_<adjustment>.csv` per instrument, columns
//! date,open,high,low,close,volume,amount.

use crate::domain::bar::{Adjustment, PriceBar};
use crate::domain::error::RotraderError;
use crate::ports::data_port::PriceSeriesStore;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvPriceStore {
    base_path: PathBuf,
}

impl CsvPriceStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, adjustment: Adjustment) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, adjustment.as_str()))
    }

    fn read_all(
        &self,
        symbol: &str,
        adjustment: Adjustment,
    ) -> Result<Vec<PriceBar>, RotraderError> {
        let path = self.csv_path(symbol, adjustment);
        let content = fs::read_to_string(&path).map_err(|e| RotraderError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| RotraderError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date = NaiveDate::parse_from_str(field(&record, 0, "date")?, "%Y-%m-%d")
                .map_err(|e| RotraderError::DataSource {
                    reason: format!("invalid date in {}: {}", path.display(), e),
                })?;

            let open = parse_f64(&record, 1, "open")?;
            let high = parse_f64(&record, 2, "high")?;
            let low = parse_f64(&record, 3, "low")?;
            let close = parse_f64(&record, 4, "close")?;
            let volume: i64 =
                field(&record, 5, "volume")?
                    .parse()
                    .map_err(|e| RotraderError::DataSource {
                        reason: format!("invalid volume value: {e}"),
                    })?;
            // Amount is optional in older exports.
            let amount = match record.get(6) {
                Some(raw) if !raw.is_empty() => {
                    raw.parse().map_err(|e| RotraderError::DataSource {
                        reason: format!("invalid amount value: {e}"),
                    })?
                }
                _ => close * volume as f64,
            };

            bars.push(PriceBar {
                symbol: symbol.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume,
                amount,
            });
        }

        // The store contract: strictly ascending, unique per date.
        for window in bars.windows(2) {
            if window[1].date <= window[0].date {
                return Err(RotraderError::DataGap {
                    symbol: symbol.to_string(),
                    date: window[1].date,
                });
            }
        }

        Ok(bars)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    i: usize,
    name: &str,
) -> Result<&'r str, RotraderError> {
    record.get(i).ok_or_else(|| RotraderError::DataSource {
        reason: format!("missing {name} column"),
    })
}

fn parse_f64(record: &csv::StringRecord, i: usize, name: &str) -> Result<f64, RotraderError> {
    field(record, i, name)?
        .parse()
        .map_err(|e| RotraderError::DataSource {
            reason: format!("invalid {name} value: {e}"),
        })
}

impl PriceSeriesStore for CsvPriceStore {
    fn get_series(
        &self,
        symbol: &str,
        adjustment: Adjustment,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RotraderError> {
        let mut bars = self.read_all(symbol, adjustment)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RotraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| RotraderError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RotraderError::DataSource {
                reason: format!("directory entry error: {e}"),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(stem) = name_str.strip_suffix(".csv") {
                if let Some((symbol, _adjustment)) = stem.rsplit_once('_') {
                    if !symbols.contains(&symbol.to_string()) {
                        symbols.push(symbol.to_string());
                    }
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        adjustment: Adjustment,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotraderError> {
        let bars = match self.read_all(symbol, adjustment) {
            Ok(bars) => bars,
            Err(RotraderError::DataSource { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, bars.len()))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume,amount\n\
            2024-01-15,3.50,3.58,3.46,3.55,1200000,4230000\n\
            2024-01-16,3.55,3.61,3.52,3.60,1100000,3940000\n\
            2024-01-17,3.60,3.66,3.57,3.62,900000,3260000\n";

        fs::write(path.join("510300_unadjusted.csv"), csv_content).unwrap();
        fs::write(
            path.join("518880_unadjusted.csv"),
            "date,open,high,low,close,volume,amount\n",
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn get_series_returns_bars_in_range() {
        let (_dir, path) = setup_test_data();
        let store = CsvPriceStore::new(path);

        let bars = store
            .get_series(
                "510300",
                Adjustment::Unadjusted,
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
            )
            .unwrap();

        assert_eq!(bars.len(), 2);
        assert!((bars[0].close - 3.55).abs() < f64::EPSILON);
        assert!((bars[0].amount - 4_230_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn get_series_missing_file_is_source_error() {
        let (_dir, path) = setup_test_data();
        let store = CsvPriceStore::new(path);

        let result = store.get_series(
            "999999",
            Adjustment::Unadjusted,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        assert!(matches!(result, Err(RotraderError::DataSource { .. })));
    }

    #[test]
    fn out_of_order_dates_reported_as_gap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(
            path.join("510300_unadjusted.csv"),
            "date,open,high,low,close,volume,amount\n\
             2024-01-16,3.5,3.6,3.4,3.5,1000,3500\n\
             2024-01-15,3.5,3.6,3.4,3.5,1000,3500\n",
        )
        .unwrap();

        let store = CsvPriceStore::new(path);
        let result = store.get_series(
            "510300",
            Adjustment::Unadjusted,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        assert!(matches!(result, Err(RotraderError::DataGap { .. })));
    }

    #[test]
    fn duplicate_date_reported_as_gap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(
            path.join("510300_unadjusted.csv"),
            "date,open,high,low,close,volume,amount\n\
             2024-01-15,3.5,3.6,3.4,3.5,1000,3500\n\
             2024-01-15,3.5,3.6,3.4,3.5,1000,3500\n",
        )
        .unwrap();

        let store = CsvPriceStore::new(path);
        let result = store.get_series(
            "510300",
            Adjustment::Unadjusted,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        assert!(matches!(result, Err(RotraderError::DataGap { .. })));
    }

    #[test]
    fn missing_amount_column_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(
            path.join("510300_unadjusted.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-15,3.5,3.6,3.4,3.5,1000\n",
        )
        .unwrap();

        let store = CsvPriceStore::new(path);
        let bars = store
            .get_series(
                "510300",
                Adjustment::Unadjusted,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )
            .unwrap();
        assert!((bars[0].amount - 3500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn list_symbols_dedups_across_adjustments() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("510300_forward.csv"),
            "date,open,high,low,close,volume,amount\n",
        )
        .unwrap();
        let store = CsvPriceStore::new(path);

        let symbols = store.list_symbols().unwrap();
        assert_eq!(symbols, vec!["510300", "518880"]);
    }

    #[test]
    fn data_range_reports_bounds() {
        let (_dir, path) = setup_test_data();
        let store = CsvPriceStore::new(path);

        let range = store
            .get_data_range("510300", Adjustment::Unadjusted)
            .unwrap()
            .unwrap();
        assert_eq!(range.0, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(range.1, NaiveDate::from_ymd_opt(2024, 1, 17).unwrap());
        assert_eq!(range.2, 3);

        assert!(
            store
                .get_data_range("999999", Adjustment::Unadjusted)
                .unwrap()
                .is_none()
        );
    }
}
