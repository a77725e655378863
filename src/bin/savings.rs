//! CLI binary for recording savings and checking progress toward a goal.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, Table};
use owo_colors::OwoColorize;
use rust_decimal::prelude::ToPrimitive as _;
use savings_tracker::calendar::{self, CalendarCell, HeatLevel, WeekStart, YearMonth};
use savings_tracker::config::{CalendarZone, TrackerConfig};
use savings_tracker::error::SavingsError;
use savings_tracker::models::{
    Decimal, Goal, NaiveDate, Transaction, TransactionId, TransactionKind, TransactionPatch,
};
use savings_tracker::snapshot::Summary;
use savings_tracker::storage::{BlockingStorage, FileStorage};
use savings_tracker::tracker::BlockingSavingsTracker;

/// Width of the progress bar in characters.
const PROGRESS_WIDTH: usize = 30;

/// Savings tracker: record income and expenses against a savings goal.
#[derive(Debug, Parser)]
#[command(name = "savings", version, about)]
struct Cli {
    /// Override the storage directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// First column of the calendar: `sunday` or `monday`.
    #[arg(long, global = true, value_name = "DAY")]
    week_start: Option<WeekStart>,
    /// Day boundary: `local`, `utc` or an offset such as `+02:00`.
    #[arg(long, global = true, value_name = "ZONE")]
    zone: Option<CalendarZone>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Show balance, goal progress and totals.
    Status,
    /// Manage the savings goal.
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Record money saved.
    Income(EntryArgs),
    /// Record money spent from the savings.
    Expense(EntryArgs),
    /// Change the description, amount or direction of a transaction.
    Edit(EditArgs),
    /// Delete a transaction.
    Delete {
        /// Transaction ID as shown by `list`.
        id: String,
    },
    /// List all transactions, most recent first.
    List,
    /// List the transactions of one day.
    Day {
        /// Day to show (YYYY-MM-DD, default: today).
        #[arg(value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Show a month calendar shaded by activity.
    Calendar {
        /// Month to show (YYYY-MM, default: current month).
        month: Option<YearMonth>,
    },
}

/// Goal subcommands.
#[derive(Debug, Subcommand)]
enum GoalCommand {
    /// Set the goal, replacing any existing one.
    Set(GoalArgs),
    /// Change the existing goal.
    Update(GoalArgs),
    /// Show the current goal.
    Show,
}

/// Arguments for `goal set` and `goal update`.
#[derive(Debug, Args)]
struct GoalArgs {
    /// Goal name.
    name: String,
    /// Target amount.
    target: Decimal,
}

/// Arguments for `income` and `expense`.
#[derive(Debug, Args)]
struct EntryArgs {
    /// What the money was for.
    description: String,
    /// Positive amount.
    amount: Decimal,
    /// Day the transaction belongs to (YYYY-MM-DD, default: now).
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

/// Arguments for the `edit` subcommand.
#[derive(Debug, Args)]
struct EditArgs {
    /// Transaction ID as shown by `list`.
    id: String,
    /// New description.
    #[arg(long)]
    description: Option<String>,
    /// New positive amount.
    #[arg(long)]
    amount: Option<Decimal>,
    /// New direction: `income` or `expense`.
    #[arg(long, value_parser = parse_kind)]
    kind: Option<TransactionKind>,
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses a transaction direction for clap.
fn parse_kind(s: &str) -> Result<TransactionKind, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "income" | "in" => Ok(TransactionKind::Income),
        "expense" | "out" => Ok(TransactionKind::Expense),
        other => Err(format!("unknown kind `{other}` (expected income or expense)")),
    }
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => return report("invalid configuration", &err),
    };

    let storage = match FileStorage::from_config(&config) {
        Ok(storage) => storage,
        Err(err) => return report("failed to initialize storage", &err),
    };

    let tracker = match BlockingSavingsTracker::builder()
        .storage(storage)
        .config(config)
        .build()
    {
        Ok(tracker) => tracker,
        Err(err) => return report("failed to build tracker", &err),
    };

    dispatch(&tracker, cli.command)
}

/// Merges environment configuration with command-line overrides.
fn load_config(cli: &Cli) -> savings_tracker::error::Result<TrackerConfig> {
    let mut config = TrackerConfig::from_env()?;
    if let Some(dir) = cli.data_dir.as_ref() {
        config = config.data_dir(dir.clone());
    }
    if let Some(week_start) = cli.week_start {
        config = config.week_start(week_start);
    }
    if let Some(zone) = cli.zone {
        config = config.zone(zone);
    }
    Ok(config)
}

/// Prints an error to stderr and returns a failure exit code.
fn report(context: &str, err: &SavingsError) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch<S: BlockingStorage>(
    tracker: &BlockingSavingsTracker<S>,
    command: Command,
) -> io::Result<ExitCode> {
    match command {
        Command::Status => cmd_status(tracker),
        Command::Goal(GoalCommand::Set(args)) => cmd_goal_write(tracker, &args, false),
        Command::Goal(GoalCommand::Update(args)) => cmd_goal_write(tracker, &args, true),
        Command::Goal(GoalCommand::Show) => cmd_goal_show(tracker),
        Command::Income(args) => cmd_add(tracker, args, TransactionKind::Income),
        Command::Expense(args) => cmd_add(tracker, args, TransactionKind::Expense),
        Command::Edit(args) => cmd_edit(tracker, args),
        Command::Delete { id } => cmd_delete(tracker, id),
        Command::List => cmd_list(tracker),
        Command::Day { date } => cmd_day(tracker, date),
        Command::Calendar { month } => cmd_calendar(tracker, month),
    }
}

/// Executes the `status` subcommand.
fn cmd_status<S: BlockingStorage>(tracker: &BlockingSavingsTracker<S>) -> io::Result<ExitCode> {
    match tracker.summary() {
        Ok(summary) => {
            print_summary(&summary)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to compute summary", &err),
    }
}

/// Executes `goal set` or `goal update`.
fn cmd_goal_write<S: BlockingStorage>(
    tracker: &BlockingSavingsTracker<S>,
    args: &GoalArgs,
    update: bool,
) -> io::Result<ExitCode> {
    let result = if update {
        tracker.update_goal(&args.name, args.target)
    } else {
        tracker.set_goal(&args.name, args.target)
    };
    match result {
        Ok(goal) => {
            let mut out = io::stdout().lock();
            writeln!(
                out,
                "{} {} {}",
                "Goal saved:".green().bold(),
                goal.name,
                format_args!("(target {:.2})", goal.target_amount).dimmed()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(SavingsError::GoalNotSet) => {
            let mut err = io::stderr().lock();
            writeln!(err, "{} no goal is set yet", "error:".red().bold())?;
            writeln!(
                err,
                "  {} use `savings goal set <NAME> <TARGET>` first",
                "hint:".cyan()
            )?;
            Ok(ExitCode::FAILURE)
        }
        Err(err) => report("failed to save goal", &err),
    }
}

/// Executes `goal show`.
fn cmd_goal_show<S: BlockingStorage>(tracker: &BlockingSavingsTracker<S>) -> io::Result<ExitCode> {
    match tracker.goal() {
        Ok(goal) => {
            print_goal(goal.as_ref())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to read goal", &err),
    }
}

/// Executes `income` or `expense`.
fn cmd_add<S: BlockingStorage>(
    tracker: &BlockingSavingsTracker<S>,
    args: EntryArgs,
    kind: TransactionKind,
) -> io::Result<ExitCode> {
    let at = args
        .date
        .map_or_else(Utc::now, |date| tracker.config().zone.midday(date));
    let result = match kind {
        TransactionKind::Income => tracker.add_income(args.description, args.amount, at),
        TransactionKind::Expense => tracker.add_expense(args.description, args.amount, at),
    };
    match result {
        Ok(id) => {
            let label = match kind {
                TransactionKind::Income => "Income recorded:",
                TransactionKind::Expense => "Expense recorded:",
            };
            writeln!(io::stdout().lock(), "{} {id}", label.green().bold())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to record transaction", &err),
    }
}

/// Executes the `edit` subcommand.
fn cmd_edit<S: BlockingStorage>(
    tracker: &BlockingSavingsTracker<S>,
    args: EditArgs,
) -> io::Result<ExitCode> {
    if args.description.is_none() && args.amount.is_none() && args.kind.is_none() {
        writeln!(
            io::stderr().lock(),
            "{} edit requires at least --description, --amount or --kind",
            "error:".red().bold()
        )?;
        return Ok(ExitCode::FAILURE);
    }
    let patch = TransactionPatch {
        description: args.description,
        amount: args.amount,
        kind: args.kind,
    };
    let id = TransactionId::new(args.id);
    match tracker.update_transaction(&id, patch) {
        Ok(()) => {
            writeln!(io::stdout().lock(), "{} {id}", "Updated:".green().bold())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to update transaction", &err),
    }
}

/// Executes the `delete` subcommand.
fn cmd_delete<S: BlockingStorage>(
    tracker: &BlockingSavingsTracker<S>,
    id: String,
) -> io::Result<ExitCode> {
    let id = TransactionId::new(id);
    match tracker.delete_transaction(&id) {
        Ok(()) => {
            writeln!(io::stdout().lock(), "{} {id}", "Deleted:".green().bold())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to delete transaction", &err),
    }
}

/// Executes the `list` subcommand.
fn cmd_list<S: BlockingStorage>(tracker: &BlockingSavingsTracker<S>) -> io::Result<ExitCode> {
    match tracker.transactions() {
        Ok(txs) => {
            print_transactions_table("Transactions", &txs, &tracker.config().zone)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to read transactions", &err),
    }
}

/// Executes the `day` subcommand.
fn cmd_day<S: BlockingStorage>(
    tracker: &BlockingSavingsTracker<S>,
    date: Option<NaiveDate>,
) -> io::Result<ExitCode> {
    let date = date.unwrap_or_else(|| tracker.config().zone.today());
    match tracker.day(date) {
        Ok(txs) => {
            let title = format!("Transactions on {date}");
            print_transactions_table(&title, &txs, &tracker.config().zone)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to read transactions", &err),
    }
}

/// Executes the `calendar` subcommand.
fn cmd_calendar<S: BlockingStorage>(
    tracker: &BlockingSavingsTracker<S>,
    month: Option<YearMonth>,
) -> io::Result<ExitCode> {
    let month = month.unwrap_or_else(|| YearMonth::of(tracker.config().zone.today()));
    match tracker.calendar(month) {
        Ok(grid) => {
            print_calendar(month, &grid, tracker.config().week_start)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report("failed to build calendar", &err),
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Colors a signed amount: green for money in, red for money out.
fn amount_cell(amount: Decimal) -> Cell {
    let color = if amount.is_sign_negative() {
        Color::Red
    } else {
        Color::Green
    };
    Cell::new(format!("{amount:.2}"))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// Renders a textual progress bar for a percentage in `0..=100`.
fn progress_bar(progress: Decimal, width: usize) -> String {
    let filled = (progress * Decimal::from(width) / Decimal::ONE_HUNDRED)
        .round()
        .to_usize()
        .unwrap_or(0)
        .min(width);
    format!(
        "[{}{}]",
        "#".repeat(filled),
        ".".repeat(width.saturating_sub(filled))
    )
}

/// Prints the goal line, or a hint when no goal is set.
fn print_goal(goal: Option<&Goal>) -> io::Result<()> {
    let mut out = io::stdout().lock();
    match goal {
        Some(goal) => writeln!(
            out,
            "{} {} {}",
            "Goal:".bold(),
            goal.name,
            format_args!("(target {:.2})", goal.target_amount).dimmed()
        ),
        None => writeln!(
            out,
            "{}",
            "No goal set. Use `savings goal set <NAME> <TARGET>`.".dimmed()
        ),
    }
}

/// Prints balance, progress and totals.
fn print_summary(summary: &Summary) -> io::Result<()> {
    print_goal(summary.goal.as_ref())?;
    let mut out = io::stdout().lock();
    writeln!(out)?;
    writeln!(
        out,
        "  {} {}",
        "Progress:".bold(),
        format_args!(
            "{} {:.1}%",
            progress_bar(summary.progress, PROGRESS_WIDTH),
            summary.progress
        )
        .green()
    )?;

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Figure").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
    ]);
    _ = table.add_row(vec![Cell::new("Balance"), amount_cell(summary.balance)]);
    _ = table.add_row(vec![Cell::new("Income"), amount_cell(summary.totals.income)]);
    _ = table.add_row(vec![Cell::new("Expense"), amount_cell(summary.totals.expense)]);
    if let Some(remaining) = summary.remaining {
        _ = table.add_row(vec![
            Cell::new("Remaining"),
            Cell::new(format!("{remaining:.2}")).set_alignment(CellAlignment::Right),
        ]);
    }

    writeln!(out)?;
    writeln!(out, "{table}")?;
    writeln!(
        out,
        "{}",
        format_args!("{} transaction(s)", summary.transaction_count).dimmed()
    )?;
    Ok(())
}

/// Prints transactions in a table.
fn print_transactions_table(
    title: &str,
    txs: &[Transaction],
    zone: &CalendarZone,
) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if txs.is_empty() {
        writeln!(out, "{}", "No transactions found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Description").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("ID").fg(Color::Cyan),
    ]);

    for tx in txs {
        let date_cell = tx.date.as_ref().map_or_else(
            || Cell::new("undated").fg(Color::DarkGrey),
            |date| Cell::new(zone.date_of(date)),
        );
        _ = table.add_row(vec![
            date_cell,
            Cell::new(&tx.description),
            amount_cell(tx.amount),
            Cell::new(&tx.id).fg(Color::DarkGrey),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        title.green().bold(),
        format_args!("({})", txs.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Maps a heat level to a cell color.
const fn heat_color(level: HeatLevel) -> Option<Color> {
    match level {
        HeatLevel::None => None,
        HeatLevel::Low => Some(Color::DarkGreen),
        HeatLevel::Medium => Some(Color::Green),
        HeatLevel::High => Some(Color::Yellow),
    }
}

/// Prints a month grid, one row per week.
fn print_calendar(month: YearMonth, grid: &[CalendarCell], week_start: WeekStart) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let scale = calendar::activity_scale(grid);

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(
        week_start
            .headers()
            .iter()
            .map(|day| Cell::new(day).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );

    for week in calendar::weeks(grid) {
        let row: Vec<Cell> = week
            .iter()
            .map(|cell| match *cell {
                CalendarCell::Padding => Cell::new(""),
                CalendarCell::Day { day, .. } => {
                    let shaded = Cell::new(day).set_alignment(CellAlignment::Right);
                    match heat_color(cell.heat_level(scale)) {
                        Some(color) => shaded.fg(color),
                        None => shaded.fg(Color::DarkGrey),
                    }
                }
            })
            .collect();
        _ = table.add_row(row);
    }

    writeln!(
        out,
        "{}",
        month.first_day().format("%B %Y").to_string().green().bold()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // Last-resort error output; if stderr itself failed there is
            // nothing left to do.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
