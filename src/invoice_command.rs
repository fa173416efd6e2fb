use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;

use crate::aggregate::aggregate;
use crate::datetime::{self, parse_date};
use crate::invoice::{Invoice, Itemization};
use crate::invoice_number::{next_invoice_number, RandomSource};
use crate::ledger::{Finalize, InvoiceSession};
use crate::period::{resolve_period, PeriodSpec};
use crate::state::AppState;
use crate::task_source::{read_all_tasks, TaskSource};
use crate::warning::Warning;

/// `--period`で指定できる期間の種類。
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ArgEnum)]
pub enum PeriodKind {
    Week,
    Month,
    LastMonth,
    Year,
    CustomDays,
    CustomRange,
}

/// クライアントの請求書を作成するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct InvoiceArgs {
    #[clap(short = 'c', long = "client", help = "Client id to invoice")]
    pub client: Option<String>,

    #[clap(
        short = 'p',
        long = "period",
        arg_enum,
        default_value = "month",
        help = "Billing period"
    )]
    pub period: PeriodKind,

    #[clap(long = "days", help = "Number of days for --period custom-days")]
    pub days: Option<u32>,

    #[clap(long = "start", help = "Start date (YYYY-MM-DD) for --period custom-range")]
    pub start: Option<String>,

    #[clap(long = "end", help = "End date (YYYY-MM-DD) for --period custom-range")]
    pub end: Option<String>,

    #[clap(
        short = 'd',
        long = "date",
        help = "Invoice date in the format YYYY-MM-DD, defaults to today",
        parse(try_from_str = parse_date),
    )]
    pub date: Option<NaiveDate>,

    #[clap(long = "itemize", help = "List top-level tasks under each project")]
    pub itemize: bool,

    #[clap(long = "finalize", help = "Record the invoice in the invoice history")]
    pub finalize: bool,
}

impl InvoiceArgs {
    fn period_spec(&self) -> PeriodSpec {
        match self.period {
            PeriodKind::Week => PeriodSpec::Week,
            PeriodKind::Month => PeriodSpec::Month,
            PeriodKind::LastMonth => PeriodSpec::LastMonth,
            PeriodKind::Year => PeriodSpec::Year,
            PeriodKind::CustomDays => PeriodSpec::CustomDays(self.days),
            PeriodKind::CustomRange => PeriodSpec::CustomRange {
                start: self.start.clone().unwrap_or_default(),
                end: self.end.clone().unwrap_or_default(),
            },
        }
    }

    fn itemization(&self) -> Itemization {
        if self.itemize {
            Itemization::Tasks
        } else {
            Itemization::ProjectTotals
        }
    }
}

/// `invoice`サブコマンドの結果。
pub struct InvoiceOutcome {
    pub invoice: Invoice,
    pub finalize: Option<Finalize>,
}

pub struct InvoiceCommand<'a, T: TaskSource, R: RandomSource> {
    task_source: &'a T,
    rng: R,
}

impl<'a, T: TaskSource, R: RandomSource> InvoiceCommand<'a, T, R> {
    /// 新しい`InvoiceCommand`を返す。
    ///
    /// # Arguments
    /// * `task_source` - タスクとプロジェクトの取得元
    /// * `rng` - 請求書番号の乱数の供給元
    pub fn new(task_source: &'a T, rng: R) -> Self {
        Self { task_source, rng }
    }

    /// `invoice`サブコマンドの処理を行う。
    ///
    /// クライアントに割り当てられたプロジェクトの作業時間を期間内で集計し、請求書を組み立てる。
    /// 組み立てた請求書は`session`のプレビューになり、`finalize`が指定された場合のみ履歴に追加される。
    /// 警告で中断した場合は`state`を変更しない。
    pub async fn run(
        &mut self,
        args: InvoiceArgs,
        state: &mut AppState,
        session: &mut InvoiceSession,
    ) -> Result<InvoiceOutcome> {
        let client_id = args
            .client
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(Warning::NoClientSelected)?;
        let client = state
            .find_client(client_id)
            .ok_or_else(|| Warning::ClientNotFound(client_id.to_string()))?
            .clone();
        let client_projects = state.client_project_ids(client_id);
        if client_projects.is_empty() {
            return Err(Warning::NoProjectsAssigned.into());
        }

        let now = datetime::now();
        let period = resolve_period(&args.period_spec(), now)?;
        info!("Start at: {}, End at: {}", period.start, period.end);

        let tasks = read_all_tasks(self.task_source).await?;
        let projects = self
            .task_source
            .read_projects()
            .await
            .context("Failed to read projects")?;

        let aggregation = aggregate(&tasks, &client_projects, &period);
        if aggregation.is_empty() {
            return Err(Warning::NothingToBill.into());
        }

        let number = next_invoice_number(state.issued_numbers(), now, &mut self.rng);
        let invoice = Invoice::build(
            number,
            args.date.unwrap_or_else(|| now.date_naive()),
            &aggregation,
            &client,
            &projects,
            &state.my_details,
            args.itemization(),
        );
        session.preview(invoice.to_record(now.to_utc()));
        info!("Preview ready for invoice #{}", invoice.number);

        let finalize = if args.finalize {
            Some(session.finalize(&mut state.generated_invoices))
        } else {
            None
        };

        Ok(InvoiceOutcome { invoice, finalize })
    }
}
