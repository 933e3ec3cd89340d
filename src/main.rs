use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use stock_dash::api::{HttpStockApi, StockApi};
use stock_dash::app::{Dashboard, LoadState, NotificationKind};
use stock_dash::chart::{ChartKind, DateRange};
use stock_dash::config::AppConfig;
use stock_dash::loader;
use stock_dash::models::{DataSource, RecordId, StockEntry};
use stock_dash::normalize::{parse_float, parse_int, to_float, to_int};
use stock_dash::table::{EditField, PageSize, SortConfig, SortDirection, SortKey};
use stock_dash::utils;

#[derive(Parser)]
#[command(name = "stock-dash", about = "Stock OHLCV dashboard client", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Backend data source (overrides config)
    #[arg(long, value_enum, global = true)]
    source: Option<DataSource>,

    /// Trade code to filter on (defaults to the first code the backend lists)
    #[arg(long, global = true, conflicts_with = "all")]
    code: Option<String>,

    /// Show every trade code
    #[arg(long, global = true)]
    all: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show the record table
    List {
        /// Substring match on trade code or date
        #[arg(short, long, default_value = "")]
        search: String,

        #[arg(long, value_enum, default_value = "date")]
        sort: SortKey,

        #[arg(long, value_enum, default_value = "asc")]
        direction: SortDirection,

        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// One of 5, 10, 25, 50
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Print the chart series
    Chart {
        #[arg(long, value_enum)]
        range: Option<DateRange>,

        #[arg(long, value_enum)]
        kind: Option<ChartKind>,
    },

    /// Summary statistics for the current selection
    Stats,

    /// List trade codes known to the backend
    Codes,

    /// Fetch one record straight from the backend
    Show { id: RecordId },

    /// Create a record
    Add {
        /// ISO date (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "trade-code")]
        trade_code: String,
        #[arg(long)]
        open: String,
        #[arg(long)]
        high: String,
        #[arg(long)]
        low: String,
        #[arg(long)]
        close: String,
        #[arg(long)]
        volume: String,
    },

    /// Edit the numeric fields of a record
    Edit {
        id: RecordId,
        #[arg(long)]
        open: Option<String>,
        #[arg(long)]
        high: Option<String>,
        #[arg(long)]
        low: Option<String>,
        #[arg(long)]
        close: Option<String>,
        #[arg(long)]
        volume: Option<String>,
    },

    /// Delete a record
    Delete {
        id: RecordId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Bulk-create records from a CSV file
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "stock_dash=info,warn",
        1 => "stock_dash=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let api = HttpStockApi::new(&config.api).context("Failed to set up backend client")?;
    let mut dash = Dashboard::new(api, &config);
    if let Some(source) = cli.source {
        dash.set_data_source(source);
    }
    if let Some(code) = &cli.code {
        dash.select_trade_code(code);
    }

    {
        let _t = utils::Timer::start("Load data");
        dash.refresh().await;
    }
    if cli.all {
        dash.select_trade_code("");
    }
    if let LoadState::Failed(msg) = dash.load_state() {
        bail!("{}", msg);
    }

    match cli.command {
        Command::List {
            search,
            sort,
            direction,
            page,
            page_size,
        } => {
            if let Some(n) = page_size {
                let size = PageSize::try_from(n).map_err(anyhow::Error::msg)?;
                dash.table.set_page_size(size);
            }
            dash.table.set_search(search);
            dash.table.set_sort(SortConfig {
                key: sort,
                direction,
            });
            dash.table.set_page(page);
            print_table(&dash);
        }

        Command::Chart { range, kind } => {
            if let Some(r) = range {
                dash.date_range = r;
            }
            if let Some(k) = kind {
                dash.chart_kind = k;
            }
            print_chart(&dash);
        }

        Command::Stats => {
            println!("─────────────────────────────────");
            println!("  {} — Summary", selection_label(&dash));
            println!("─────────────────────────────────");
            println!("{}", dash.chart_summary());
            if let Some(code) = dash.selected_trade_code() {
                match dash.api().fetch_statistics(code).await {
                    Ok(s) => {
                        println!("─────────────────────────────────");
                        println!("  Backend count  : {}", utils::fmt_number(s.count as i64));
                        println!(
                            "  Volatility     : {}",
                            s.volatility
                                .map(utils::fmt_price)
                                .unwrap_or_else(|| "N/A".into())
                        );
                    }
                    Err(e) => info!("Backend statistics unavailable: {}", e),
                }
            }
            println!("─────────────────────────────────");
        }

        Command::Codes => {
            // The backend list is empty when /api/trade_codes failed.
            let codes = if dash.trade_codes().is_empty() {
                dash.store().trade_codes()
            } else {
                dash.trade_codes().to_vec()
            };
            if codes.is_empty() {
                println!("No trade codes available.");
            } else {
                println!("{} trade codes:", codes.len());
                for c in &codes {
                    let marker = if Some(c.as_str()) == dash.selected_trade_code() {
                        "*"
                    } else {
                        " "
                    };
                    println!(" {} {}", marker, c);
                }
            }
        }

        Command::Show { id } => {
            let rec = dash.api().fetch_record(&id).await?;
            println!("{}", serde_json::to_string_pretty(&rec)?);
        }

        Command::Add {
            date,
            trade_code,
            open,
            high,
            low,
            close,
            volume,
        } => {
            let entry = StockEntry {
                date: date.unwrap_or_else(|| Local::now().date_naive().to_string()),
                trade_code: trade_code.trim().to_string(),
                open: parse_float(&open),
                high: parse_float(&high),
                low: parse_float(&low),
                close: parse_float(&close),
                volume: parse_int(&volume),
            };
            let created = dash.create(&entry).await;
            report(&mut dash)?;
            if let Ok(rec) = created {
                println!("id {}", rec.id.map(|i| i.to_string()).unwrap_or_default());
            }
        }

        Command::Edit {
            id,
            open,
            high,
            low,
            close,
            volume,
        } => {
            if !dash.begin_edit(&id) {
                bail!("No record with id {} in the current dataset", id);
            }
            let fields = [
                (EditField::Open, open),
                (EditField::High, high),
                (EditField::Low, low),
                (EditField::Close, close),
                (EditField::Volume, volume),
            ];
            for (field, value) in fields {
                if let Some(text) = value {
                    dash.table.edit_field(field, &text);
                }
            }
            dash.save_edit().await;
            report(&mut dash)?;
        }

        Command::Delete { id, yes } => {
            let request = dash.table.request_delete(id);
            dash.request_delete(request);
            let prompt = "Are you sure you want to delete this item? This action cannot be undone.";
            if !yes && !confirm(prompt)? {
                dash.cancel_delete();
                println!("Cancelled.");
                return Ok(());
            }
            loop {
                if dash.confirm_delete().await {
                    report(&mut dash)?;
                    break;
                }
                let message = dash
                    .pending_delete()
                    .and_then(|p| p.error.clone())
                    .unwrap_or_default();
                if yes {
                    dash.cancel_delete();
                    bail!("{}", message);
                }
                eprintln!("{}", message);
                if !confirm("Retry?")? {
                    dash.cancel_delete();
                    bail!("{}", message);
                }
            }
        }

        Command::Import { file } => {
            let _t = utils::Timer::start("CSV import");
            let entries = loader::load_entries(&file)?;
            let mut created = 0usize;
            let mut errors = 0usize;
            for entry in &entries {
                match dash.create(entry).await {
                    Ok(_) => created += 1,
                    Err(e) => {
                        warn!("{} {}: {}", entry.trade_code, entry.date, e);
                        errors += 1;
                    }
                }
                dash.dismiss_notification();
            }
            info!("Done: {} created, {} errors", created, errors);
        }
    }

    Ok(())
}

fn selection_label<A: StockApi>(dash: &Dashboard<A>) -> String {
    dash.selected_trade_code().unwrap_or("All trade codes").to_string()
}

/// Print and clear the current notification. Error notifications become the
/// command's error.
fn report<A: StockApi>(dash: &mut Dashboard<A>) -> Result<()> {
    let Some(n) = dash.notification().cloned() else {
        return Ok(());
    };
    dash.dismiss_notification();
    match n.kind {
        NotificationKind::Success => {
            println!("{}", n.message);
            Ok(())
        }
        NotificationKind::Error => bail!("{}", n.message),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn print_table<A: StockApi>(dash: &Dashboard<A>) {
    let rows = dash.table_rows();
    println!(
        "{:>6}  {:<10}  {:<10}  {:>10}  {:>10}  {:>10}  {:>10}  {:>14}",
        "id", "date", "code", "open", "high", "low", "close", "volume"
    );
    for r in &rows {
        println!(
            "{:>6}  {:<10}  {:<10}  {:>10}  {:>10}  {:>10}  {:>10}  {:>14}",
            r.id.as_ref().map(|i| i.to_string()).unwrap_or_default(),
            r.date,
            r.trade_code,
            utils::fmt_price(to_float(&r.open)),
            utils::fmt_price(to_float(&r.high)),
            utils::fmt_price(to_float(&r.low)),
            utils::fmt_price(to_float(&r.close)),
            utils::fmt_number(to_int(&r.volume)),
        );
    }
    println!(
        "Page {} of {} ({} per page, {})",
        dash.table.page(),
        dash.table_pages(),
        dash.table.page_size().get(),
        selection_label(dash)
    );
}

fn print_chart<A: StockApi>(dash: &Dashboard<A>) {
    let points = dash.chart_points(Local::now().date_naive());
    let columns = dash.chart_kind.columns();

    print!("{:<12}", "date");
    for c in columns {
        print!("{:>14}", c);
    }
    println!();
    for p in &points {
        print!("{:<12}", p.date);
        for c in columns {
            match p.column(c) {
                Some(v) if *c == "volume" => print!("{:>14}", utils::fmt_number(v as i64)),
                Some(v) => print!("{:>14}", utils::fmt_price(v)),
                None => print!("{:>14}", "-"),
            }
        }
        println!();
    }
    println!("{} points ({})", points.len(), selection_label(dash));
}
