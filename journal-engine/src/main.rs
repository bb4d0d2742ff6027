use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use journal_engine::{
    generate_synthetic_trades, load_file, AnalyticsConfig, Formatter, JournalReport,
    JsonFileStore, ReportRequest, Trade, TradeRepository,
};

#[derive(Parser, Debug)]
#[command(name = "journal-engine")]
#[command(version = "0.1.0")]
#[command(about = "Trading journal analytics: P&L curves, monthly tables and trade metrics", long_about = None)]
struct Args {
    /// Trade file (CSV/JSON). If neither this nor a journal is given, uses a synthetic journal.
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// JSON journal store to report on
    #[arg(short, long)]
    journal: Option<PathBuf>,

    /// Import the data file's trades into the journal before reporting
    #[arg(long)]
    import: bool,

    /// Number of synthetic trades
    #[arg(short = 'n', long, default_value = "120")]
    trades: usize,

    /// Base price for synthetic trades
    #[arg(long, default_value = "100.0")]
    base_price: f64,

    /// Report to produce (summary, cumulative, monthly, calendar, metrics, all)
    #[arg(short, long, default_value = "all")]
    report: String,

    /// Monthly table breakdown (strategy, mistake, timeframe, tag, account, symbol, direction)
    #[arg(short, long, default_value = "strategy")]
    category: String,

    /// Limit the calendar to one month (YYYY-MM)
    #[arg(short, long)]
    month: Option<String>,

    /// Analytics config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Offset from UTC used to assign exits to calendar dates
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,

    /// Book partial exits together with the final exit
    #[arg(long)]
    no_split_partials: bool,

    /// Output format (json, text)
    #[arg(short, long, default_value = "json")]
    output: String,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Build analytics config
    let mut config = match &args.config {
        Some(path) => AnalyticsConfig::from_json_file(path)?,
        None => AnalyticsConfig::default(),
    };
    if let Some(minutes) = args.utc_offset_minutes {
        config = config.with_utc_offset_minutes(minutes);
    }
    if args.no_split_partials {
        config = config.with_split_partial_exits(false);
    }
    config.validate()?;

    let request = ReportRequest {
        kind: args.report.parse()?,
        dimension: args.category.parse()?,
        month: args.month.clone(),
    };

    let trades = load_trades(&args)?;
    log::info!("Running analytics over {} trades...", trades.len());

    let report = JournalReport::build(&trades, &config, &request)?;
    let excluded = report.excluded_trades();
    if excluded > 0 {
        log::warn!("{} trades left out of date-based analytics (open, undated or invalid)", excluded);
    }

    // Output result
    match args.output.as_str() {
        "json" => {
            let json = if args.pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", json);
        }
        "text" => {
            print_text_report(&report, &Formatter::new(&config));
        }
        _ => {
            log::warn!("Unknown output format: {}. Using text.", args.output);
            print_text_report(&report, &Formatter::new(&config));
        }
    }

    Ok(())
}

fn load_trades(args: &Args) -> Result<Vec<Trade>> {
    if let Some(journal) = &args.journal {
        let mut store = JsonFileStore::open(journal)
            .with_context(|| format!("opening journal {}", journal.display()))?;

        if args.import {
            let path = args
                .data_file
                .as_ref()
                .context("--import needs --data-file")?;
            let incoming = load_file(path)?;
            let total = incoming.len();
            let mut rejected = 0;
            for trade in incoming {
                let id = trade.id.clone();
                if let Err(e) = store.insert(trade) {
                    log::warn!("skipping trade {}: {}", id, e);
                    rejected += 1;
                }
            }
            log::info!(
                "Imported {} of {} trades into {}",
                total - rejected,
                total,
                journal.display()
            );
        }

        return Ok(store.list());
    }

    if let Some(path) = &args.data_file {
        log::info!("Loading trades from {:?}...", path);
        return Ok(load_file(path)?);
    }

    log::info!(
        "Generating {} synthetic trades (base price: ${:.2})...",
        args.trades,
        args.base_price
    );
    Ok(generate_synthetic_trades(args.trades, args.base_price))
}

fn print_text_report(report: &JournalReport, fmt: &Formatter) {
    println!();
    println!("================================================================");
    println!("  TRADING JOURNAL REPORT");
    println!("================================================================");

    if let Some(summary) = &report.summary {
        println!();
        println!("----------------------------------------------------------------");
        println!("  SUMMARY");
        println!("----------------------------------------------------------------");
        println!("  Closed Trades:    {:>14}", summary.total_trades);
        println!("  Open Trades:      {:>14}", summary.open_trades);
        println!("  Net P&L:          {:>14}", fmt.signed_currency(summary.total_pnl));
        println!("  Win Rate:         {:>14}", fmt.percent(summary.win_rate));
        println!(
            "  Winners/Losers:   {:>14}",
            format!("{}/{}", summary.winning_trades, summary.losing_trades)
        );
        println!("  Avg Win:          {:>14}", fmt.currency(summary.avg_win));
        println!("  Avg Loss:         {:>14}", fmt.currency(summary.avg_loss));
        println!("  Profit Factor:    {:>14}", fmt.ratio(summary.profit_factor));
        println!("  Expectancy:       {:>14}", fmt.signed_currency(summary.expectancy));
        println!("  Avg R:            {:>14}", fmt.r_multiple(summary.avg_r_multiple));
        println!("  Best Trade:       {:>14}", fmt.signed_currency(summary.best_trade));
        println!("  Worst Trade:      {:>14}", fmt.signed_currency(summary.worst_trade));
        println!("  Max Drawdown:     {:>14}", fmt.currency(summary.max_drawdown));
        println!("  Avg Hold:         {:>9.1} days", summary.avg_holding_days);
    }

    if let Some(series) = &report.cumulative {
        println!();
        println!("----------------------------------------------------------------");
        println!("  CUMULATIVE P&L (last 10 days)");
        println!("----------------------------------------------------------------");
        let skip = series.points.len().saturating_sub(10);
        for point in series.points.iter().skip(skip) {
            println!("  {:<14} {:>14}", point.label, fmt.signed_currency(point.total));
        }
        for strategy in &series.strategies {
            let value = series
                .points
                .last()
                .and_then(|p| p.strategies.get(strategy))
                .copied()
                .unwrap_or(0.0);
            println!("    {:<20} {:>14}", strategy, fmt.signed_currency(value));
        }
    }

    if let Some(monthly) = &report.monthly {
        println!();
        println!("----------------------------------------------------------------");
        println!("  MONTHLY PERFORMANCE");
        println!("----------------------------------------------------------------");
        for month in &monthly.months {
            let total = &month.monthly_total;
            println!(
                "  {:<16} {:>14} {:>9} {:>4} trades",
                month.label,
                fmt.signed_currency(total.total_dollar_value),
                fmt.r_multiple(Some(total.total_r)),
                total.count
            );
            for descriptor in &monthly.categories {
                match month.categories.get(&descriptor.id) {
                    Some(cell) if !cell.is_empty() => println!(
                        "    {:<18} {:>14} {:>9} {:>4}",
                        descriptor.label,
                        fmt.signed_currency(cell.total_dollar_value),
                        fmt.r_multiple(Some(cell.total_r)),
                        cell.count
                    ),
                    _ => println!("    {:<18} {:>14}", descriptor.label, "no data"),
                }
            }
        }
        let grand = &monthly.grand_total.total;
        println!(
            "  {:<16} {:>14} {:>9} {:>4} trades",
            "Total",
            fmt.signed_currency(grand.total_dollar_value),
            fmt.r_multiple(Some(grand.total_r)),
            grand.count
        );
    }

    if let Some(days) = &report.calendar {
        println!();
        println!("----------------------------------------------------------------");
        println!("  CALENDAR (last 10 days)");
        println!("----------------------------------------------------------------");
        let skip = days.len().saturating_sub(10);
        for day in days.iter().skip(skip) {
            println!(
                "  {} {:>14} {:>3} trades ({}W/{}L)",
                day.date,
                fmt.signed_currency(day.profit_loss),
                day.trade_count,
                day.winners,
                day.losers
            );
        }
    }

    if let Some(metrics) = &report.metrics {
        println!();
        println!("----------------------------------------------------------------");
        println!("  TRADE METRICS (last 5)");
        println!("----------------------------------------------------------------");
        for m in metrics.iter().rev().take(5) {
            let pnl = match m.profit_loss {
                Some(pnl) => fmt.signed_currency(pnl),
                None if m.provisional => "open".to_string(),
                None => "invalid".to_string(),
            };
            println!(
                "  {:<12} P&L: {:>14} | R: {:>8} | R:R {:>6}",
                m.trade_id,
                pnl,
                fmt.r_multiple(m.r_multiple),
                fmt.ratio(m.risk_reward_ratio)
            );
        }
    }

    println!();
    println!("================================================================");
}
