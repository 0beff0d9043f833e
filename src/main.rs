//! xlrange - writes a small outlined sales table through the configured engine.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use xlrange::config::{load_config, parse_engine};
use xlrange::host::MemoryHost;
use xlrange::{Axis, CellBlock, CellFormat, EngineKind, FormatRule, Outline, Session, Value};

fn print_usage() {
    eprintln!("Usage: xlrange [OPTIONS] [OUTPUT]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [OUTPUT]                  Workbook to save (default: xlrange-demo.xlsx)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>       Load settings from a TOML file");
    eprintln!("  -e, --engine <NAME>       script, automation or file");
    eprintln!("  -n, --cell-limit <N>      Maximum cells per backend write");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Set XLRANGE_LOG (e.g. XLRANGE_LOG=debug) for diagnostics.");
}

struct Args {
    config: Option<PathBuf>,
    engine: Option<String>,
    cell_limit: Option<usize>,
    output: PathBuf,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        config: None,
        engine: None,
        cell_limit: None,
        output: PathBuf::from("xlrange-demo.xlsx"),
    };
    let mut output_seen = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
                parsed.config = Some(PathBuf::from(&args[i]));
            }
            "-e" | "--engine" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --engine requires a value");
                    std::process::exit(1);
                }
                parsed.engine = Some(args[i].clone());
            }
            "-n" | "--cell-limit" => {
                i += 1;
                match args.get(i).and_then(|n| n.parse().ok()) {
                    Some(n) if n > 0 => parsed.cell_limit = Some(n),
                    _ => {
                        eprintln!("Error: --cell-limit requires a positive number");
                        std::process::exit(1);
                    }
                }
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if output_seen {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
                parsed.output = PathBuf::from(&args[i]);
                output_seen = true;
            }
        }
        i += 1;
    }
    parsed
}

fn sales_table() -> Result<CellBlock> {
    let row = |region: &str, city: &str, units: i64, sales: f64| {
        vec![Value::from(region), Value::from(city), Value::from(units), Value::from(sales)]
    };
    let rows = vec![
        vec![
            Value::from("Region"),
            Value::from("City"),
            Value::from("Units"),
            Value::from("Sales"),
        ],
        row("Total", "Total", 42, 10_450.0),
        row("East", "Total", 25, 6_200.0),
        row("East", "Boston", 10, 2_500.0),
        row("East", "Albany", 15, 3_700.0),
        row("West", "Total", 17, 4_250.0),
        row("West", "Denver", 9, 2_050.0),
        row("West", "Reno", 8, 2_200.0),
    ];
    Ok(CellBlock::new(rows)?.with_header_rows(1))
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = &args.engine {
        config.engine = parse_engine(name)?;
    }
    if let Some(limit) = args.cell_limit {
        config.cell_limit = limit;
    }

    let mut session = match config.engine {
        EngineKind::Automation => Session::with_host(config, Box::new(MemoryHost::new()))?,
        _ => Session::new(config)?,
    };

    let workbook = session.create_workbook().context("creating workbook")?;
    let sheet = workbook.first_sheet()?.clone();

    let mut table = sheet.arng("B2")?;
    session
        .write_table(&mut table, &sales_table()?, Some(&Outline::new(2, "Total")))
        .context("writing table")?;
    session.format(&table.row(1)?, &CellFormat::bold())?;
    let rules = [
        FormatRule::new("(?i)^sales$", CellFormat::number("#,##0.00"))?,
        FormatRule::new("(?i)^units$", CellFormat::number("0"))?,
    ];
    session.format_range(&table, &rules)?;
    session.autofit(&table, Axis::Columns)?;

    let saved = session
        .save_workbook_as(workbook.name(), &args.output)
        .with_context(|| format!("saving {}", args.output.display()))?;
    session.close_workbook(&saved)?;
    println!("Wrote {} to {}", table.address(), args.output.display());
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_env("XLRANGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(parse_args()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
