//! Plain-text performance report adapter.

use std::fmt::Write as _;
use std::fs;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::RotraderError;
use crate::domain::metrics::Summary;
use crate::domain::order::OrderReason;
use crate::domain::params::StrategyParams;
use crate::ports::report_port::ReportPort;

pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn render(
        result: &BacktestResult,
        summary: &Summary,
        params: &StrategyParams,
    ) -> String {
        let ledger = &result.ledger;
        let mut out = String::new();

        let _ = writeln!(out, "Momentum Rotation Strategy - Performance Report");
        let _ = writeln!(out, "===============================================");
        let _ = writeln!(out);
        let _ = writeln!(out, "1. Overall Performance");
        let _ = writeln!(out, "----------------------");
        let _ = writeln!(out, "Initial Capital: {:.2}", ledger.initial_capital);
        let _ = writeln!(out, "Final Value: {:.2}", summary.final_equity);
        let _ = writeln!(out, "Total Return: {:.2}%", summary.total_return * 100.0);
        let _ = writeln!(
            out,
            "Annualized Return: {:.2}%",
            summary.annualized_return * 100.0
        );
        let _ = writeln!(
            out,
            "Volatility: {:.2}%",
            summary.annualized_volatility * 100.0
        );
        let _ = writeln!(out, "Sharpe Ratio: {:.2}", summary.sharpe_ratio);
        let _ = writeln!(out, "Maximum Drawdown: {:.2}%", summary.max_drawdown * 100.0);
        let _ = writeln!(out, "Win Rate: {:.1}%", summary.win_rate * 100.0);
        let _ = writeln!(out);

        let _ = writeln!(out, "2. Trade Analysis");
        let _ = writeln!(out, "-----------------");
        let count = |reason: OrderReason| {
            ledger.trades.iter().filter(|t| t.reason == reason).count()
        };
        let _ = writeln!(out, "Total Fills: {}", ledger.trades.len());
        let _ = writeln!(out, "Rebalance Fills: {}", count(OrderReason::Rebalance));
        let _ = writeln!(out, "Stop-Loss Exits: {}", count(OrderReason::StopLoss));
        let _ = writeln!(
            out,
            "Trailing-Stop Exits: {}",
            count(OrderReason::TrailingStop)
        );
        let _ = writeln!(out, "Realized PnL: {:.2}", ledger.realized_pnl);
        let _ = writeln!(out);

        let _ = writeln!(out, "3. Strategy Parameters");
        let _ = writeln!(out, "----------------------");
        let _ = writeln!(out, "Lookback Period: {} bars", params.lookback_period);
        let _ = writeln!(out, "Top N Holdings: {}", params.top_n_holdings);
        let _ = writeln!(out, "Position Size: {:.0}%", params.position_size * 100.0);
        let _ = writeln!(out, "Rebalance Frequency: {}", params.rebalance_freq);
        let _ = writeln!(
            out,
            "Max Position Size: {:.0}%",
            params.max_position_size * 100.0
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "4. Rebalance History");
        let _ = writeln!(out, "--------------------");
        let _ = writeln!(
            out,
            "Executed: {}  Skipped (insufficient history): {}",
            result.rebalances.len(),
            result.skipped.len()
        );
        for event in &result.rebalances {
            let picks: Vec<String> = event
                .targets
                .iter()
                .map(|t| format!("{} {:.1}%", t.symbol, t.weight * 100.0))
                .collect();
            let line = if picks.is_empty() {
                "all cash".to_string()
            } else {
                picks.join(", ")
            };
            let _ = writeln!(out, "{}: {}", event.date, line);
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "5. Final Positions");
        let _ = writeln!(out, "------------------");
        let mut positions: Vec<_> = ledger.positions.values().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        if positions.is_empty() {
            let _ = writeln!(out, "(none)");
        }
        for pos in positions {
            let _ = writeln!(
                out,
                "{}: {} shares @ avg cost {:.4}, value {:.2}",
                pos.symbol,
                pos.quantity,
                pos.avg_cost,
                pos.market_value()
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "6. Equity Curve");
        let _ = writeln!(out, "---------------");
        let _ = writeln!(out, "date,cash,holdings_value,total_equity");
        for snap in result.ledger.snapshots() {
            let _ = writeln!(
                out,
                "{},{:.2},{:.2},{:.2}",
                snap.date, snap.cash, snap.holdings_value, snap.total_equity
            );
        }

        out
    }
}

impl ReportPort for TextReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        summary: &Summary,
        params: &StrategyParams,
        output_path: &str,
    ) -> Result<(), RotraderError> {
        let content = Self::render(result, summary, params);
        fs::write(output_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::run_backtest;
    use crate::domain::bar::PriceBar;
    use crate::domain::schedule::Frequency;
    use crate::domain::series::{build_timeline, PriceSeries};
    use chrono::NaiveDate;

    fn sample_result() -> (BacktestResult, Summary, StrategyParams) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<PriceBar> = (0..10)
            .map(|i| {
                let close = 100.0 + i as f64;
                PriceBar {
                    symbol: "510300".into(),
                    date: start + chrono::Duration::days(i as i64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1000,
                    amount: close * 1000.0,
                }
            })
            .collect();
        let universe = vec![PriceSeries::new("510300".into(), bars)];
        let timeline = build_timeline(&universe);
        let params = StrategyParams {
            lookback_period: 2,
            top_n_holdings: 1,
            position_size: 0.9,
            max_position_size: 0.9,
            rebalance_freq: Frequency::Daily,
            stop_loss_pct: 0.0,
            trailing_stop_pct: 0.0,
            transaction_cost: 0.0,
            min_cash_buffer: 0.0,
            min_momentum_threshold: 0.0,
        };
        let result = run_backtest(&universe, &timeline, &params, 100_000.0).unwrap();
        let summary = Summary::compute(result.ledger.snapshots(), &result.rebalance_dates);
        (result, summary, params)
    }

    #[test]
    fn render_contains_all_sections() {
        let (result, summary, params) = sample_result();
        let report = TextReportAdapter::render(&result, &summary, &params);

        assert!(report.contains("1. Overall Performance"));
        assert!(report.contains("2. Trade Analysis"));
        assert!(report.contains("3. Strategy Parameters"));
        assert!(report.contains("4. Rebalance History"));
        assert!(report.contains("5. Final Positions"));
        assert!(report.contains("6. Equity Curve"));
        assert!(report.contains("510300"));
        assert!(report.contains("date,cash,holdings_value,total_equity"));
    }

    #[test]
    fn write_creates_file() {
        let (result, summary, params) = sample_result();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.txt");

        TextReportAdapter
            .write(&result, &summary, &params, path.to_str().unwrap())
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Momentum Rotation Strategy"));
    }
}
