//! SQLite price-store adapter over the upstream pipeline's `daily_prices`
//! table.

use crate::domain::bar::{Adjustment, PriceBar};
use crate::domain::error::RotraderError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSeriesStore;
use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub struct SqlitePriceStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqlitePriceStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, RotraderError> {
        let db_path =
            config
                .get_string("data", "path")
                .ok_or_else(|| RotraderError::ConfigMissing {
                    section: "data".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("data", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, RotraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), RotraderError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS daily_prices (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                amount REAL NOT NULL,
                price_type TEXT NOT NULL,
                PRIMARY KEY (symbol, date, price_type)
            );
            CREATE INDEX IF NOT EXISTS idx_daily_prices_symbol
                ON daily_prices(symbol, price_type);
            CREATE INDEX IF NOT EXISTS idx_daily_prices_date ON daily_prices(date);",
        )
        .map_err(|e: rusqlite::Error| RotraderError::DataSource {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    pub fn insert_bars(
        &self,
        bars: &[PriceBar],
        adjustment: Adjustment,
    ) -> Result<(), RotraderError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO daily_prices
                 (symbol, date, open, high, low, close, volume, amount, price_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    bar.symbol,
                    bar.date.format("%Y-%m-%d").to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    bar.amount,
                    adjustment.as_str()
                ],
            )
            .map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, RotraderError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })
    }
}

impl PriceSeriesStore for SqlitePriceStore {
    fn get_series(
        &self,
        symbol: &str,
        adjustment: Adjustment,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, RotraderError> {
        let conn = self.conn()?;

        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();

        let query = "SELECT symbol, date, open, high, low, close, volume, amount
                     FROM daily_prices
                     WHERE symbol = ?1 AND price_type = ?2
                       AND date >= ?3 AND date <= ?4
                     ORDER BY date ASC";

        let mut stmt =
            conn.prepare(query)
                .map_err(|e: rusqlite::Error| RotraderError::DataSource {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map(
                params![symbol, adjustment.as_str(), start_str, end_str],
                |row| {
                    let date_str: String = row.get(1)?;
                    let date =
                        NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                date_str.len(),
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?;
                    Ok(PriceBar {
                        symbol: row.get(0)?,
                        date,
                        open: row.get(2)?,
                        high: row.get(3)?,
                        low: row.get(4)?,
                        close: row.get(5)?,
                        volume: row.get(6)?,
                        amount: row.get(7)?,
                    })
                },
            )
            .map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?);
        }

        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RotraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM daily_prices ORDER BY symbol")
            .map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(row.map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?);
        }
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        adjustment: Adjustment,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, RotraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM daily_prices
                 WHERE symbol = ?1 AND price_type = ?2",
            )
            .map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;

        let row: (Option<String>, Option<String>, i64) = stmt
            .query_row(params![symbol, adjustment.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|e: rusqlite::Error| RotraderError::DataSource {
                reason: e.to_string(),
            })?;

        match row {
            (Some(min), Some(max), count) => {
                let parse = |s: &str| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                        RotraderError::DataSource {
                            reason: format!("invalid date in daily_prices: {e}"),
                        }
                    })
                };
                Ok(Some((parse(&min)?, parse(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
