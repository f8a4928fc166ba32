use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use hrmrec_common::period::parse_date;
use hrmrec_common::{LeavePolicy, Period};
use hrmrec_plugins::importers::{
    ImportReport, ImportStrategy, Importer, MonthlyLedgerStrategy, OpeningBalanceStrategy, UsageReportStrategy,
    WritePolicy,
};
use hrmrec_plugins::reconcile::Reconciler;
use hrmrec_plugins::reports::{DiscrepancyExport, FinanceReconciliation, Headcount, MonthlySummary, write_balances_csv};
use hrmrec_plugins::roster::RosterLoader;
use hrmrec_runtime::ledger::Ledger;
use hrmrec_runtime::source::{CsvSource, Encoding};
use hrmrec_runtime::store::SqliteDataStore;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hrmrec")]
#[command(about = "Reconciles HRM and VIP leave balances")]
struct Cli {
    #[arg(long, env = "HRMREC_DATABASE_URL", default_value = "sqlite://hrmrec.db", global = true)]
    database_url: String,
    /// JSON leave policy; built-in defaults when absent
    #[arg(long, env = "HRMREC_POLICY", global = true)]
    policy: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tables
    Migrate,
    /// Delete every employee and balance
    Reset,
    /// Load the employee roster
    LoadEmployees {
        #[command(flatten)]
        input: Input,
        /// Empty the database first
        #[arg(long)]
        reset: bool,
    },
    /// Load an HRM leave-entitlement usage report for one month
    LoadUsage {
        #[command(flatten)]
        input: Input,
        #[command(flatten)]
        month: Month,
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Load a VIP monthly balance export
    LoadVip {
        #[command(flatten)]
        input: Input,
        #[command(flatten)]
        month: Month,
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Load the HRM leave list for one month (annual leave only)
    LoadHrmMonthly {
        #[command(flatten)]
        input: Input,
        #[command(flatten)]
        month: Month,
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Load opening balances observed on a given date
    LoadOpening {
        #[command(flatten)]
        input: Input,
        #[arg(long, value_parser = date_arg)]
        balance_date: NaiveDate,
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },
    /// Export HRM against VIP discrepancies for one month
    Export {
        #[command(flatten)]
        month: Month,
        #[command(flatten)]
        output: Output,
    },
    /// Month-by-month summary of both ledgers
    Summary {
        #[arg(long, value_parser = date_arg)]
        from: NaiveDate,
        #[arg(long, value_parser = date_arg)]
        to: NaiveDate,
        #[command(flatten)]
        output: Output,
    },
    /// Employees joined, terminated and active per month
    Headcount {
        #[arg(long, value_parser = date_arg)]
        from: NaiveDate,
        #[arg(long, default_value_t = 12)]
        months: u32,
        #[command(flatten)]
        output: Output,
    },
    /// Balances carried forward from the opening balances
    Balances {
        #[arg(long, value_parser = date_arg)]
        reference: NaiveDate,
        #[command(flatten)]
        output: Output,
    },
    /// Match a finance ledger against the VIP balances of one month
    Finance {
        #[command(flatten)]
        input: Input,
        #[command(flatten)]
        month: Month,
        #[command(flatten)]
        output: Output,
    },
}

#[derive(Args)]
struct Input {
    file: PathBuf,
    #[arg(long, default_value = "utf-8")]
    encoding: Encoding,
}

#[derive(Args)]
struct Month {
    #[arg(long)]
    year: i32,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: u32,
}

impl Month {
    fn period(&self) -> anyhow::Result<Period> {
        Ok(Period::month(self.year, self.month)?)
    }
}

#[derive(Args)]
struct Output {
    /// Write the CSV here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Output {
    fn writer(&self) -> anyhow::Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
            )),
            None => Box::new(io::stdout().lock()),
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Replace,
    Accumulate,
    Upsert,
    InsertOnly,
}

impl Mode {
    fn policy(mode: Option<Mode>, period: Period) -> Option<WritePolicy> {
        mode.map(|m| match m {
            Mode::Replace => WritePolicy::ReplacePeriod(period),
            Mode::Accumulate => WritePolicy::Accumulate,
            Mode::Upsert => WritePolicy::UpsertByKey,
            Mode::InsertOnly => WritePolicy::InsertOnly,
        })
    }
}

fn date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).map_err(|e| e.to_string())
}

fn open_source(input: &Input) -> anyhow::Result<CsvSource> {
    CsvSource::from_path(&input.file, input.encoding).with_context(|| format!("cannot read {}", input.file.display()))
}

fn load_policy(path: Option<&Path>) -> anyhow::Result<LeavePolicy> {
    match path {
        Some(path) => Ok(LeavePolicy::from_file(path)?),
        None => Ok(LeavePolicy::default()),
    }
}

async fn open_ledger(url: &str) -> anyhow::Result<Ledger> {
    let store = SqliteDataStore::connect(url)
        .await
        .map_err(|e| anyhow!("cannot open {}: {}", url, e))?;
    store.migrate().await.map_err(|e| anyhow!("migration failed: {}", e))?;
    Ok(Ledger::new(Arc::new(store)))
}

async fn import<S: ImportStrategy>(strategy: &S, input: &Input, policy: Option<WritePolicy>) -> anyhow::Result<()> {
    let mut source = open_source(input)?;
    let report = Importer::run(strategy, &mut source, policy).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!("{}", report);
    for issue in &report.skipped {
        println!("  line {} ({}): {}", issue.line, issue.identity, issue.reason);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let policy = load_policy(cli.policy.as_deref())?;
    let ledger = open_ledger(&cli.database_url).await?;

    match cli.command {
        Commands::Migrate => info!("database at {} is up to date", cli.database_url),
        Commands::Reset => {
            let removed = ledger.reset().await?;
            info!("removed {} records", removed);
        }
        Commands::LoadEmployees { input, reset } => {
            let mut source = open_source(&input)?;
            let report = RosterLoader::new(ledger).load(&mut source, reset).await?;
            print_report(&report);
        }
        Commands::LoadUsage { input, month, mode } => {
            let period = month.period()?;
            let strategy = UsageReportStrategy::new(ledger, period);
            import(&strategy, &input, Mode::policy(mode, period)).await?;
        }
        Commands::LoadVip { input, month, mode } => {
            let period = month.period()?;
            let strategy = MonthlyLedgerStrategy::vip(ledger, period);
            import(&strategy, &input, Mode::policy(mode, period)).await?;
        }
        Commands::LoadHrmMonthly { input, month, mode } => {
            let period = month.period()?;
            let strategy = MonthlyLedgerStrategy::hrm(ledger, period, policy);
            import(&strategy, &input, Mode::policy(mode, period)).await?;
        }
        Commands::LoadOpening {
            input,
            balance_date,
            mode,
        } => {
            let strategy = OpeningBalanceStrategy::new(ledger, balance_date);
            let period = Period::new(balance_date, balance_date);
            import(&strategy, &input, Mode::policy(mode, period)).await?;
        }
        Commands::Export { month, output } => {
            let export = DiscrepancyExport::build(&ledger, &policy, month.period()?).await?;
            export.write_csv(output.writer()?)?;
            info!("total={}", export.total);
        }
        Commands::Summary { from, to, output } => {
            let reconciler = Reconciler::new(ledger, policy);
            let summary = MonthlySummary::build(&reconciler, from, to).await?;
            summary.write_csv(output.writer()?)?;
        }
        Commands::Headcount { from, months, output } => {
            let headcount = Headcount::build(&ledger, from, months).await?;
            headcount.write_csv(output.writer()?)?;
            info!("{} employees on record", headcount.total);
        }
        Commands::Balances { reference, output } => {
            let reconciler = Reconciler::new(ledger, policy);
            let balances = reconciler.compute_balances(reference).await?;
            write_balances_csv(&balances, output.writer()?)?;
            info!("{} balances computed at {}", balances.len(), reference);
        }
        Commands::Finance { input, month, output } => {
            let mut source = open_source(&input)?;
            let report = FinanceReconciliation::build(&ledger, &mut source, month.period()?).await?;
            report.write_csv(output.writer()?)?;
        }
    }
    Ok(())
}
