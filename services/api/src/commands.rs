use crate::infra::{build_service, parse_day, resolve_as_of};
use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use sla_incentives::config::AppConfig;
use sla_incentives::error::AppError;
use sla_incentives::service::SlaService;
use sla_incentives::telemetry::{self, LogOutput};
use sla_incentives::workflows::bonus::format_day_key;
use sla_incentives::workflows::ingest::EventSnapshot;
use sla_incentives::workflows::sla::{
    format_percentage, ExclusionStream, MonthlyAdjustment, SlaRun,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Site identifier, e.g. `embu` or `extrema`
    #[arg(long)]
    pub(crate) site: String,
    /// Orders CSV export
    #[arg(long, conflicts_with = "snapshot")]
    pub(crate) orders: Option<PathBuf>,
    /// Receipts CSV export
    #[arg(long, requires = "orders")]
    pub(crate) receipts: Option<PathBuf>,
    /// JSON snapshot holding `orders` and `receipts` arrays
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,
    /// Evaluation instant (defaults to now)
    #[arg(long)]
    pub(crate) as_of: Option<String>,
    /// Print a human-readable scorecard instead of the aggregate record
    #[arg(long)]
    pub(crate) text: bool,
    /// Pretty-print the JSON aggregate record
    #[arg(long)]
    pub(crate) pretty: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ExclusionCommand {
    /// Exclude an identifier from scoring
    Add(ExclusionArgs),
    /// Re-admit a previously excluded identifier
    Remove(ExclusionArgs),
    /// Print the exclusion lists for a site
    List(SiteArgs),
}

#[derive(Args, Debug)]
pub(crate) struct SiteArgs {
    #[arg(long)]
    pub(crate) site: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum StreamArg {
    Orders,
    Receipts,
}

impl From<StreamArg> for ExclusionStream {
    fn from(value: StreamArg) -> Self {
        match value {
            StreamArg::Orders => ExclusionStream::Orders,
            StreamArg::Receipts => ExclusionStream::Receipts,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ExclusionArgs {
    #[arg(long)]
    pub(crate) site: String,
    #[arg(long, value_enum)]
    pub(crate) stream: StreamArg,
    #[arg(long)]
    pub(crate) id: String,
}

#[derive(Args, Debug)]
pub(crate) struct AdjustArgs {
    #[arg(long)]
    pub(crate) site: String,
    /// Points subtracted from the receiving SLA
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub(crate) receiving: i32,
    /// Points subtracted from the picking SLA
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub(crate) picking: i32,
    /// Points subtracted from the shipping SLA
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub(crate) shipping: i32,
}

#[derive(Args, Debug)]
pub(crate) struct HeadcountArgs {
    #[arg(long)]
    pub(crate) site: String,
    /// Day the headcount applies to (DD-MM-YYYY)
    #[arg(long, value_parser = parse_day)]
    pub(crate) date: NaiveDate,
    #[arg(long)]
    pub(crate) operators: u32,
}

/// Loads configuration and logs to stderr so stdout carries only output.
fn command_service() -> Result<SlaService, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogOutput::Stderr)?;
    build_service(&config)
}

pub(crate) fn run_site(args: RunArgs) -> Result<(), AppError> {
    let service = command_service()?;
    let snapshot = load_snapshot(&args)?;
    let as_of = resolve_as_of(args.as_of.as_deref())?;
    let run = service.run(&args.site, &snapshot, as_of)?;

    if args.text {
        render_scorecard(&run);
        return Ok(());
    }
    print_json(&run.aggregate_record(), args.pretty)
}

fn load_snapshot(args: &RunArgs) -> Result<EventSnapshot, AppError> {
    match (&args.snapshot, &args.orders, &args.receipts) {
        (Some(path), _, _) => Ok(EventSnapshot::from_json_reader(std::fs::File::open(path)?)?),
        (None, Some(orders), Some(receipts)) => {
            Ok(EventSnapshot::from_csv_paths(orders, receipts)?)
        }
        (None, Some(orders), None) => Ok(EventSnapshot::from_csv_readers(
            std::fs::File::open(orders)?,
            std::io::empty(),
        )?),
        (None, None, _) => Err(AppError::InvalidRequest(
            "provide --snapshot or --orders [--receipts]".to_string(),
        )),
    }
}

pub(crate) fn run_exclusions(command: ExclusionCommand) -> Result<(), AppError> {
    let service = command_service()?;
    match command {
        ExclusionCommand::Add(args) => {
            let stream: ExclusionStream = args.stream.into();
            if service.add_exclusion(&args.site, stream, &args.id)? {
                println!("excluded {} '{}' at {}", stream.label(), args.id, args.site);
            } else {
                println!("{} '{}' was already excluded", stream.label(), args.id);
            }
            Ok(())
        }
        ExclusionCommand::Remove(args) => {
            let stream: ExclusionStream = args.stream.into();
            if service.remove_exclusion(&args.site, stream, &args.id)? {
                println!("re-admitted {} '{}' at {}", stream.label(), args.id, args.site);
            } else {
                println!("{} '{}' was not excluded", stream.label(), args.id);
            }
            Ok(())
        }
        ExclusionCommand::List(args) => print_json(&service.exclusions(&args.site)?, true),
    }
}

pub(crate) fn run_adjust(args: AdjustArgs) -> Result<(), AppError> {
    let service = command_service()?;
    let adjustment = service.set_adjustments(
        &args.site,
        MonthlyAdjustment {
            receiving: args.receiving,
            picking: args.picking,
            shipping: args.shipping,
        },
    )?;
    print_json(&adjustment, true)
}

pub(crate) fn run_headcount(args: HeadcountArgs) -> Result<(), AppError> {
    let service = command_service()?;
    let (previous, _) = service.set_headcount(&args.site, args.date, args.operators)?;
    let day = format_day_key(args.date);
    match previous {
        Some(previous) => println!(
            "{}: {day} headcount {previous} -> {}",
            args.site, args.operators
        ),
        None => println!("{}: {day} headcount {}", args.site, args.operators),
    }
    Ok(())
}

pub(crate) fn run_sites() -> Result<(), AppError> {
    let service = command_service()?;
    for id in service.settings().site_ids() {
        let policy = service.site(id)?;
        println!(
            "{:<10} {:<20} {} ({})",
            policy.id,
            policy.name,
            policy.country,
            policy.bonus.label()
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), AppError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

fn render_scorecard(run: &SlaRun) {
    let card = &run.scorecard;
    println!(
        "{} {} as of {}",
        run.site,
        card.period,
        run.as_of.format("%d-%m-%Y %H:%M")
    );
    println!(
        "{:<8} {:>9} {:>9} {:>9} {:>9}",
        "week", "shipping", "receiving", "picking", "total"
    );
    for week in &card.weeks {
        println!(
            "{:<8} {:>9} {:>9} {:>9} {:>9}",
            week.bucket.number(),
            format_percentage(week.shipping),
            format_percentage(week.receiving),
            format_percentage(week.picking),
            format_percentage(week.composite),
        );
    }
    println!(
        "{:<8} {:>9} {:>9} {:>9} {:>9}",
        "month",
        format_percentage(card.totals.shipping),
        format_percentage(card.totals.receiving),
        format_percentage(card.totals.picking),
        format_percentage(card.month_composite),
    );

    let bonus = &run.bonus;
    if bonus.eligible {
        println!(
            "bonus: level {} factor {} unit {:.2} total {:.2}",
            bonus.level, bonus.factor, bonus.unit_value, bonus.amount
        );
    } else {
        println!("bonus: not eligible");
    }
    if let Some(average) = run.throughput.average {
        println!(
            "throughput: {average:.2} per operator/day, {} shipped this month",
            run.throughput.shipped_month
        );
    }

    let quality = &run.data_quality;
    println!(
        "orders: {} scored, {} excluded, {} not yet due, {} malformed",
        quality.orders.scored,
        quality.orders.excluded,
        quality.orders.not_due,
        quality.orders.malformed
    );
    if !quality.missing_headcount.is_empty() {
        let days: Vec<String> = quality
            .missing_headcount
            .iter()
            .map(|day| format_day_key(*day))
            .collect();
        println!("missing headcount: {}", days.join(", "));
    }
}
