//! Balance importers.
//!
//! Each export format is an [`ImportStrategy`]; [`Importer::run`] drives any of
//! them over a [`RecordSource`] under a caller-chosen [`WritePolicy`].

use crate::errors::ImportError;
use async_trait::async_trait;
use hrmrec_common::Period;
use hrmrec_runtime::models::Employee;
use hrmrec_runtime::resolver::Resolution;
use hrmrec_runtime::source::{ColumnSchema, RecordSource, Row, RowError, SchemaReader};
use std::fmt;
use tracing::{debug, info, warn};

pub mod monthly;
pub mod opening;
pub mod usage;

pub use monthly::MonthlyLedgerStrategy;
pub use opening::OpeningBalanceStrategy;
pub use usage::UsageReportStrategy;

/// How an import run treats records already in the target ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Clear the ledger for exactly this period, then load. Rows repeating a key
    /// within the file add up.
    ReplacePeriod(Period),
    /// Add into an existing record for the same key.
    Accumulate,
    /// Overwrite an existing record for the same key.
    UpsertByKey,
    /// Skip a row whose key already has a record.
    InsertOnly,
}

/// What happens when a row meets an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Add,
    Overwrite,
    Reject,
}

impl WritePolicy {
    pub fn merge(&self) -> Merge {
        match self {
            WritePolicy::ReplacePeriod(_) | WritePolicy::Accumulate => Merge::Add,
            WritePolicy::UpsertByKey => Merge::Overwrite,
            WritePolicy::InsertOnly => Merge::Reject,
        }
    }
}

/// Outcome of writing one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
    Duplicate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueReason {
    Filtered(String),
    Unresolved(String),
    Ambiguous { attempted: String, candidates: Vec<String> },
    Malformed(String),
    Duplicate(String),
}

impl fmt::Display for IssueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueReason::Filtered(reason) => write!(f, "filtered: {}", reason),
            IssueReason::Unresolved(attempted) => write!(f, "no employee matches {}", attempted),
            IssueReason::Ambiguous { attempted, candidates } => {
                write!(f, "{} matches several employees: {}", attempted, candidates.join("; "))
            }
            IssueReason::Malformed(reason) => write!(f, "malformed: {}", reason),
            IssueReason::Duplicate(reason) => write!(f, "duplicate: {}", reason),
        }
    }
}

/// A skipped row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub line: usize,
    pub identity: String,
    pub reason: IssueReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub strategy: &'static str,
    pub rows_read: usize,
    pub imported: usize,
    pub skipped: Vec<RowIssue>,
    pub records_in_ledger: i64,
}

impl ImportReport {
    pub fn filtered(&self) -> usize {
        self.skipped
            .iter()
            .filter(|i| matches!(i.reason, IssueReason::Filtered(_)))
            .count()
    }

    fn skip(&mut self, row: &Row, reason: IssueReason) {
        match &reason {
            IssueReason::Filtered(_) => debug!("{} line {}: {}", self.strategy, row.line, reason),
            _ => warn!("{} line {} ({}): {}", self.strategy, row.line, row.summary(), reason),
        }
        self.skipped.push(RowIssue {
            line: row.line,
            identity: row.summary(),
            reason,
        });
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows read, {} imported, {} skipped ({} filtered), {} records in ledger",
            self.strategy,
            self.rows_read,
            self.imported,
            self.skipped.len(),
            self.filtered(),
            self.records_in_ledger
        )
    }
}

/// One export format. The runner calls, per row: `accepts`,
/// `compute_period_key`, `read_entry`, `resolve_employee`, then
/// `upsert_balance`. Everything before `upsert_balance` must be free of writes,
/// with the single exception of an employee synthesized by `resolve_employee`
/// once the row has parsed.
#[async_trait]
pub trait ImportStrategy: Send + Sync {
    /// The row's parsed contribution, not yet bound to an employee.
    type Entry: Send;

    fn name(&self) -> &'static str;
    fn schema(&self) -> &'static ColumnSchema;
    fn default_policy(&self) -> WritePolicy;

    /// `Err(reason)` filters the row out without counting it as a failure.
    fn accepts(&self, _row: &Row) -> Result<(), String> {
        Ok(())
    }

    fn compute_period_key(&self, row: &Row) -> Result<Period, RowError>;
    fn read_entry(&self, row: &Row, period: Period) -> Result<Self::Entry, RowError>;

    async fn resolve_employee(&self, row: &Row) -> Result<Resolution, ImportError>;
    async fn upsert_balance(
        &self,
        employee: &Employee,
        entry: Self::Entry,
        policy: &WritePolicy,
    ) -> Result<Upsert, ImportError>;
    async fn clear_period(&self, period: Period) -> Result<u64, ImportError>;
    async fn records_in_ledger(&self) -> Result<i64, ImportError>;
}

pub struct Importer;

impl Importer {
    /// Imports every row of `source`. The header is checked before anything is
    /// cleared, so a file of the wrong format leaves the ledger untouched.
    pub async fn run<S: ImportStrategy>(
        strategy: &S,
        source: &mut dyn RecordSource,
        policy: Option<WritePolicy>,
    ) -> Result<ImportReport, ImportError> {
        let policy = policy.unwrap_or_else(|| strategy.default_policy());
        let mut reader = SchemaReader::open(source, strategy.schema())?;
        let mut report = ImportReport {
            strategy: strategy.name(),
            ..Default::default()
        };

        if let WritePolicy::ReplacePeriod(period) = policy {
            let removed = strategy.clear_period(period).await?;
            info!("{}: cleared {} records for {}", strategy.name(), removed, period);
        }

        while let Some(row) = reader.next_row() {
            let row = row?;
            report.rows_read += 1;
            if let Some(reason) = Self::import_row(strategy, &row, &policy).await? {
                report.skip(&row, reason);
            } else {
                report.imported += 1;
            }
        }

        report.records_in_ledger = strategy.records_in_ledger().await?;
        info!("{}", report);
        Ok(report)
    }

    /// `Ok(None)` when the row was written, `Ok(Some(reason))` when it was
    /// skipped. `Err` aborts the run.
    async fn import_row<S: ImportStrategy>(
        strategy: &S,
        row: &Row,
        policy: &WritePolicy,
    ) -> Result<Option<IssueReason>, ImportError> {
        if let Err(reason) = strategy.accepts(row) {
            return Ok(Some(IssueReason::Filtered(reason)));
        }

        let parsed = strategy
            .compute_period_key(row)
            .and_then(|period| strategy.read_entry(row, period));
        let entry = match parsed {
            Ok(entry) => entry,
            Err(e) => return Ok(Some(IssueReason::Malformed(e.to_string()))),
        };

        let employee = match strategy.resolve_employee(row).await {
            Ok(Resolution::Found(employee)) => employee,
            Ok(Resolution::NotFound { attempted }) => return Ok(Some(IssueReason::Unresolved(attempted))),
            Ok(Resolution::Ambiguous { attempted, candidates }) => {
                return Ok(Some(IssueReason::Ambiguous { attempted, candidates }));
            }
            Err(e) => return Self::row_failure(e),
        };

        match strategy.upsert_balance(&employee, entry, policy).await {
            Ok(Upsert::Created | Upsert::Updated) => Ok(None),
            Ok(Upsert::Duplicate(reason)) => Ok(Some(IssueReason::Duplicate(reason))),
            Err(e) => Self::row_failure(e),
        }
    }

    fn row_failure(err: ImportError) -> Result<Option<IssueReason>, ImportError> {
        if err.is_row_level() {
            Ok(Some(IssueReason::Malformed(err.to_string())))
        } else if err.is_duplicate() {
            Ok(Some(IssueReason::Duplicate(err.to_string())))
        } else {
            Err(err)
        }
    }
}
