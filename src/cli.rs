//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceStore;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::TextReportAdapter;
use crate::domain::backtest::run_backtest;
use crate::domain::bar::Adjustment;
use crate::domain::error::RotraderError;
use crate::domain::metrics::Summary;
use crate::domain::params::StrategyParams;
use crate::domain::schedule::Frequency;
use crate::domain::series::build_timeline;
use crate::domain::universe::{load_universe, parse_symbols, Instrument};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSeriesStore;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "rotrader", about = "Momentum rotation portfolio backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured universe (comma-separated)
        #[arg(long)]
        symbols: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Grid-search lookback and top-N over the configured universe
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate configuration and strategy parameters
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the price store
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for configured symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbols,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, symbols.as_deref())
            } else {
                run_backtest_command(&config, symbols.as_deref(), output.as_ref())
            }
        }
        Command::Optimize { config, output } => run_optimize(&config, output.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, symbols } => run_info(&config, symbols.as_deref()),
    }
}

/// Date range, capital, and price variant for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub adjustment: Adjustment,
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = RotraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_run_config(adapter: &dyn ConfigPort) -> Result<RunConfig, RotraderError> {
    let start_date = require_date(adapter, "start_date")?;
    let end_date = require_date(adapter, "end_date")?;
    if start_date >= end_date {
        return Err(RotraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "start_date".into(),
            reason: "start_date must be before end_date".into(),
        });
    }

    let adjustment = adapter
        .get_string("backtest", "adjustment")
        .unwrap_or_else(|| "unadjusted".to_string())
        .parse::<Adjustment>()
        .map_err(|reason| RotraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "adjustment".into(),
            reason,
        })?;

    let initial_capital = adapter.get_double("backtest", "initial_capital", 1_000_000.0);
    if initial_capital <= 0.0 {
        return Err(RotraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_capital".into(),
            reason: "initial_capital must be positive".into(),
        });
    }

    Ok(RunConfig {
        start_date,
        end_date,
        initial_capital,
        adjustment,
    })
}

fn require_date(adapter: &dyn ConfigPort, key: &str) -> Result<NaiveDate, RotraderError> {
    let value =
        adapter
            .get_string("backtest", key)
            .ok_or_else(|| RotraderError::ConfigMissing {
                section: "backtest".into(),
                key: key.into(),
            })?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| RotraderError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

pub fn build_strategy_params(adapter: &dyn ConfigPort) -> Result<StrategyParams, RotraderError> {
    let defaults = StrategyParams::default();

    let rebalance_freq = adapter
        .get_string("strategy", "rebalance_freq")
        .unwrap_or_else(|| defaults.rebalance_freq.to_string())
        .parse::<Frequency>()
        .map_err(|reason| RotraderError::ConfigInvalid {
            section: "strategy".into(),
            key: "rebalance_freq".into(),
            reason,
        })?;

    let params = StrategyParams {
        lookback_period: adapter.get_int(
            "strategy",
            "lookback_period",
            defaults.lookback_period as i64,
        ) as usize,
        top_n_holdings: adapter.get_int(
            "strategy",
            "top_n_holdings",
            defaults.top_n_holdings as i64,
        ) as usize,
        position_size: adapter.get_double("strategy", "position_size", defaults.position_size),
        rebalance_freq,
        max_position_size: adapter.get_double(
            "strategy",
            "max_position_size",
            defaults.max_position_size,
        ),
        stop_loss_pct: adapter.get_double("strategy", "stop_loss_pct", defaults.stop_loss_pct),
        trailing_stop_pct: adapter.get_double(
            "strategy",
            "trailing_stop_pct",
            defaults.trailing_stop_pct,
        ),
        min_momentum_threshold: adapter.get_double(
            "strategy",
            "min_momentum_threshold",
            defaults.min_momentum_threshold,
        ),
        transaction_cost: adapter.get_double(
            "strategy",
            "transaction_cost",
            defaults.transaction_cost,
        ),
        min_cash_buffer: adapter.get_double(
            "strategy",
            "min_cash_buffer",
            defaults.min_cash_buffer,
        ),
    };

    params.validate()?;
    Ok(params)
}

pub fn resolve_symbols(
    symbols_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, RotraderError> {
    let raw = match symbols_override {
        Some(s) => s.to_string(),
        None => config.get_string("universe", "symbols").ok_or_else(|| {
            RotraderError::ConfigMissing {
                section: "universe".into(),
                key: "symbols".into(),
            }
        })?,
    };
    parse_symbols(&raw).map_err(|e| RotraderError::ConfigInvalid {
        section: "universe".into(),
        key: "symbols".into(),
        reason: e.to_string(),
    })
}

/// Attach display names from the optional `[names]` section
/// (`<symbol> = <display name>`); symbols without one display as-is.
pub fn resolve_instruments(symbols: &[String], config: &dyn ConfigPort) -> Vec<Instrument> {
    symbols
        .iter()
        .map(|symbol| match config.get_string("names", symbol) {
            Some(name) => Instrument::with_name(symbol.clone(), name),
            None => Instrument::new(symbol.clone()),
        })
        .collect()
}

fn make_store(config: &dyn ConfigPort) -> Result<Box<dyn PriceSeriesStore>, RotraderError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "sqlite".to_string());

    match source.as_str() {
        "csv" => {
            let path =
                config
                    .get_string("data", "path")
                    .ok_or_else(|| RotraderError::ConfigMissing {
                        section: "data".into(),
                        key: "path".into(),
                    })?;
            Ok(Box::new(CsvPriceStore::new(PathBuf::from(path))))
        }
        "sqlite" => {
            #[cfg(feature = "sqlite")]
            {
                use crate::adapters::sqlite_adapter::SqlitePriceStore;
                Ok(Box::new(SqlitePriceStore::from_config(config)?))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(RotraderError::ConfigInvalid {
                    section: "data".into(),
                    key: "source".into(),
                    reason: "built without the sqlite feature".into(),
                })
            }
        }
        other => Err(RotraderError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unknown data source: {other}"),
        }),
    }
}

fn run_backtest_command(
    config_path: &PathBuf,
    symbols_override: Option<&str>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: load and validate configuration.
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (run_config, params, instruments) = match prepare(&adapter, symbols_override) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 2: open the price store and load the universe.
    let outcome = (|| -> Result<ExitCode, RotraderError> {
        let store = make_store(&adapter)?;
        eprintln!("Validating {} symbols...", instruments.len());
        let loaded = load_universe(
            store.as_ref(),
            &instruments,
            run_config.adjustment,
            run_config.start_date,
            run_config.end_date,
            params.lookback_period,
        )?;

        // Stage 3: simulate.
        let timeline = build_timeline(&loaded.series);
        eprintln!(
            "Running backtest: {} instruments, {} to {} ({} trading dates)",
            loaded.series.len(),
            run_config.start_date,
            run_config.end_date,
            timeline.len(),
        );
        let result = run_backtest(
            &loaded.series,
            &timeline,
            &params,
            run_config.initial_capital,
        )?;

        // Stage 4: summarize.
        let summary = Summary::compute(result.ledger.snapshots(), &result.rebalance_dates);

        eprintln!("\n=== Results ===");
        eprintln!("Total Return:     {:.2}%", summary.total_return * 100.0);
        eprintln!("Annualized:       {:.2}%", summary.annualized_return * 100.0);
        eprintln!(
            "Volatility:       {:.2}%",
            summary.annualized_volatility * 100.0
        );
        eprintln!("Sharpe Ratio:     {:.2}", summary.sharpe_ratio);
        eprintln!("Max Drawdown:     -{:.1}%", summary.max_drawdown * 100.0);
        eprintln!("Win Rate:         {:.1}%", summary.win_rate * 100.0);
        eprintln!(
            "Rebalances:       {} executed, {} skipped",
            result.rebalances.len(),
            result.skipped.len()
        );
        eprintln!("Fills:            {}", result.ledger.trades.len());

        // Stage 5: write the report.
        let output = output_path
            .cloned()
            .or_else(|| adapter.get_string("report", "output").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("report.txt"));
        TextReportAdapter.write(
            &result,
            &summary,
            &params,
            output.to_str().unwrap_or("report.txt"),
        )?;
        eprintln!("\nReport written to: {}", output.display());
        Ok(ExitCode::SUCCESS)
    })();

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn prepare(
    adapter: &dyn ConfigPort,
    symbols_override: Option<&str>,
) -> Result<(RunConfig, StrategyParams, Vec<Instrument>), RotraderError> {
    let run_config = build_run_config(adapter)?;
    let params = build_strategy_params(adapter)?;
    let symbols = resolve_symbols(symbols_override, adapter)?;
    let instruments = resolve_instruments(&symbols, adapter);
    Ok((run_config, params, instruments))
}

pub fn run_dry_run(config_path: &PathBuf, symbols_override: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (run_config, params, instruments) = match prepare(&adapter, symbols_override) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nBacktest window:");
    eprintln!("  {} to {}", run_config.start_date, run_config.end_date);
    eprintln!("  initial capital: {:.2}", run_config.initial_capital);
    eprintln!("  adjustment: {}", run_config.adjustment);

    eprintln!("\nStrategy:");
    eprintln!("  lookback_period: {}", params.lookback_period);
    eprintln!("  top_n_holdings: {}", params.top_n_holdings);
    eprintln!("  position_size: {:.2}", params.position_size);
    eprintln!("  rebalance_freq: {}", params.rebalance_freq);
    eprintln!("  max_position_size: {:.2}", params.max_position_size);
    eprintln!("  stop_loss_pct: {:.3}", params.stop_loss_pct);
    eprintln!("  trailing_stop_pct: {:.3}", params.trailing_stop_pct);

    eprintln!("\nUniverse:");
    for instrument in &instruments {
        if instrument.name == instrument.symbol {
            eprintln!("  {}", instrument.symbol);
        } else {
            eprintln!("  {} ({})", instrument.symbol, instrument.name);
        }
    }
    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

#[derive(Debug, Clone)]
struct GridPoint {
    lookback_period: usize,
    top_n_holdings: usize,
    summary: Summary,
}

fn run_optimize(config_path: &PathBuf, output_path: Option<&PathBuf>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let outcome = (|| -> Result<ExitCode, RotraderError> {
        let (run_config, base_params, instruments) = prepare(&adapter, None)?;

        let lookback_range =
            parse_usize_list(&adapter, "optimize", "lookback_range", "5,10,20,60,120")?;
        let top_n_range = parse_usize_list(&adapter, "optimize", "top_n_range", "1,2")?;

        let store = make_store(&adapter)?;
        let max_lookback = lookback_range.iter().copied().max().unwrap_or(1);
        let loaded = load_universe(
            store.as_ref(),
            &instruments,
            run_config.adjustment,
            run_config.start_date,
            run_config.end_date,
            max_lookback,
        )?;
        let timeline = build_timeline(&loaded.series);

        let grid: Vec<(usize, usize)> = lookback_range
            .iter()
            .flat_map(|&lb| top_n_range.iter().map(move |&n| (lb, n)))
            .collect();
        eprintln!(
            "Optimizing over {} parameter sets ({} trading dates each)",
            grid.len(),
            timeline.len()
        );

        // Runs are independent: one ledger each, parallel at the run level.
        let results: Vec<Result<GridPoint, RotraderError>> = grid
            .par_iter()
            .map(|&(lookback_period, top_n_holdings)| {
                let params = StrategyParams {
                    lookback_period,
                    top_n_holdings,
                    ..base_params.clone()
                };
                let result = run_backtest(
                    &loaded.series,
                    &timeline,
                    &params,
                    run_config.initial_capital,
                )?;
                Ok(GridPoint {
                    lookback_period,
                    top_n_holdings,
                    summary: Summary::compute(
                        result.ledger.snapshots(),
                        &result.rebalance_dates,
                    ),
                })
            })
            .collect();

        let mut points = Vec::with_capacity(results.len());
        for result in results {
            points.push(result?);
        }

        let Some(best) = points.iter().max_by(|a, b| {
            a.summary
                .sharpe_ratio
                .partial_cmp(&b.summary.sharpe_ratio)
                .unwrap_or(std::cmp::Ordering::Equal)
        }) else {
            return Err(RotraderError::ConfigInvalid {
                section: "optimize".into(),
                key: "lookback_range".into(),
                reason: "empty parameter grid".into(),
            });
        };

        eprintln!("\n=== Best Parameters (by Sharpe) ===");
        eprintln!("lookback_period: {}", best.lookback_period);
        eprintln!("top_n_holdings:  {}", best.top_n_holdings);
        eprintln!("Sharpe Ratio:    {:.2}", best.summary.sharpe_ratio);
        eprintln!("Total Return:    {:.2}%", best.summary.total_return * 100.0);
        eprintln!("Max Drawdown:    -{:.1}%", best.summary.max_drawdown * 100.0);

        let output = output_path
            .cloned()
            .unwrap_or_else(|| PathBuf::from("optimization_results.csv"));
        write_grid_csv(&points, &output)?;
        eprintln!("\nGrid results written to: {}", output.display());
        Ok(ExitCode::SUCCESS)
    })();

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn parse_usize_list(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: &str,
) -> Result<Vec<usize>, RotraderError> {
    let raw = adapter
        .get_string(section, key)
        .unwrap_or_else(|| default.to_string());
    let mut values = Vec::new();
    for token in raw.split(',') {
        let value = token
            .trim()
            .parse::<usize>()
            .map_err(|_| RotraderError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: format!("invalid integer: {token}"),
            })?;
        if value == 0 {
            return Err(RotraderError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: "values must be positive".into(),
            });
        }
        values.push(value);
    }
    Ok(values)
}

fn write_grid_csv(points: &[GridPoint], output: &PathBuf) -> Result<(), RotraderError> {
    let mut writer = csv::Writer::from_path(output).map_err(|e| RotraderError::Io(
        std::io::Error::other(e),
    ))?;
    writer
        .write_record([
            "lookback_period",
            "top_n_holdings",
            "sharpe_ratio",
            "total_return",
            "annualized_return",
            "max_drawdown",
            "volatility",
            "win_rate",
        ])
        .map_err(|e| RotraderError::Io(std::io::Error::other(e)))?;
    for p in points {
        writer
            .write_record([
                p.lookback_period.to_string(),
                p.top_n_holdings.to_string(),
                format!("{:.6}", p.summary.sharpe_ratio),
                format!("{:.6}", p.summary.total_return),
                format!("{:.6}", p.summary.annualized_return),
                format!("{:.6}", p.summary.max_drawdown),
                format!("{:.6}", p.summary.annualized_volatility),
                format!("{:.6}", p.summary.win_rate),
            ])
            .map_err(|e| RotraderError::Io(std::io::Error::other(e)))?;
    }
    writer
        .flush()
        .map_err(|e| RotraderError::Io(std::io::Error::other(e)))?;
    Ok(())
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match prepare(&adapter, None) {
        Ok((run_config, params, instruments)) => {
            eprintln!(
                "  window: {} to {}",
                run_config.start_date, run_config.end_date
            );
            eprintln!(
                "  strategy: lookback {}, top {}, {} rebalance",
                params.lookback_period, params.top_n_holdings, params.rebalance_freq
            );
            eprintln!("  universe: {} symbols", instruments.len());
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let outcome = (|| -> Result<ExitCode, RotraderError> {
        let store = make_store(&adapter)?;
        let symbols = store.list_symbols()?;
        if symbols.is_empty() {
            eprintln!("No symbols found");
        } else {
            for symbol in &symbols {
                println!("{symbol}");
            }
            eprintln!("{} symbols found", symbols.len());
        }
        Ok(ExitCode::SUCCESS)
    })();

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_info(config_path: &PathBuf, symbols_override: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let outcome = (|| -> Result<ExitCode, RotraderError> {
        let run_config = build_run_config(&adapter)?;
        let symbols = resolve_symbols(symbols_override, &adapter)?;
        let store = make_store(&adapter)?;

        for symbol in &symbols {
            match store.get_data_range(symbol, run_config.adjustment)? {
                Some((min_date, max_date, count)) => {
                    println!("{symbol}: {count} bars, {min_date} to {max_date}");
                }
                None => {
                    eprintln!("{symbol}: no data found");
                }
            }
        }
        Ok(ExitCode::SUCCESS)
    })();

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
