use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::aggregate::ProjectHours;
use crate::invoice::Invoice;
use crate::state::{Client, InvoiceRecord, MyDetails};
use crate::time_entry::Project;

const RULE_WIDTH: usize = 50;

/// Consoleに集計結果や請求書を表示するためのtrait。
pub trait ConsolePresenter {
    /// 請求書を表示する。
    fn show_invoice(&mut self, invoice: &Invoice) -> Result<()>;

    /// 発行済み請求書の一覧を表示する。
    fn show_invoices(&mut self, invoices: &[InvoiceRecord]) -> Result<()>;

    /// クライアントの一覧を割り当て済みプロジェクト数と共に表示する。
    fn show_clients(&mut self, clients: &[Client], assignments: &BTreeMap<String, String>) -> Result<()>;

    /// プロジェクトの割り当てを表示する。
    fn show_assignments(
        &mut self,
        assignments: &BTreeMap<String, String>,
        projects: &[Project],
        clients: &[Client],
    ) -> Result<()>;

    /// 自分の情報を表示する。
    fn show_details(&mut self, details: &MyDetails) -> Result<()>;

    /// 直近の作業時間サマリーを表示する。
    fn show_hours(&mut self, summary: &[ProjectHours], days: u32) -> Result<()>;
}

/// Markdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    fn show_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        let w = &mut self.writer;
        let details = &invoice.details;
        writeln!(w, "# {} #{}", details.invoice_title, invoice.number)?;
        writeln!(w)?;
        if !details.name.is_empty() {
            writeln!(w, "**{}**", details.name)?;
            for line in [&details.email, &details.phone, &details.address] {
                if !line.is_empty() {
                    writeln!(w, "{}", line)?;
                }
            }
            if let Some(url) = details.website_url() {
                writeln!(w, "{}", url)?;
            }
            if !details.tax_id.is_empty() {
                writeln!(w, "{}: {}", details.tax_id_label, details.tax_id)?;
            }
            writeln!(w)?;
        }
        writeln!(w, "- Bill to: {}", invoice.client.name)?;
        if !invoice.client.email.is_empty() {
            writeln!(w, "- Email: {}", invoice.client.email)?;
        }
        if !invoice.client.address.is_empty() {
            writeln!(w, "- Address: {}", invoice.client.address.replace('\n', ", "))?;
        }
        writeln!(w, "- Date: {}", invoice.date.format("%Y-%m-%d"))?;
        writeln!(w, "- Period: {}", invoice.period_label)?;
        writeln!(w)?;

        writeln!(w, "| Description | Hours | Rate | Amount |")?;
        writeln!(w, "|---|---:|---:|---:|")?;
        for line in &invoice.lines {
            writeln!(
                w,
                "| {} | {:.2} | ${:.2} | ${:.2} |",
                line.project_name, line.hours, line.rate, line.amount
            )
            .with_context(|| format!("Failed to write invoice line: {:?}", line))?;
            for task in &line.tasks {
                writeln!(w, "| &nbsp;&nbsp;• {} ({:.2}h) | | | |", task.title, task.hours)?;
            }
        }
        writeln!(w)?;
        writeln!(w, "- Total hours: {:.2}", invoice.total_hours)?;
        writeln!(w, "- Subtotal: ${:.2}", invoice.subtotal)?;
        if invoice.client.tax_enabled {
            writeln!(
                w,
                "- {} ({}%): ${:.2}",
                invoice.client.tax_name, invoice.client.tax_rate, invoice.tax_amount
            )?;
        }
        writeln!(w, "- **Total: ${:.2}**", invoice.total)?;
        if !details.bank_details.is_empty() {
            writeln!(w)?;
            writeln!(w, "Bank Details:")?;
            writeln!(w, "{}", details.bank_details)?;
        }
        writeln!(w)?;
        writeln!(w, "{}", details.invoice_message).context("Failed to write invoice")?;
        Ok(())
    }

    fn show_invoices(&mut self, invoices: &[InvoiceRecord]) -> Result<()> {
        if invoices.is_empty() {
            writeln!(self.writer, "No invoices generated yet.")?;
            return Ok(());
        }
        for (index, invoice) in invoices.iter().enumerate() {
            writeln!(
                self.writer,
                "- [{}] {} {} {} ({}): ${:.2}, created {}",
                index,
                invoice.number,
                invoice.client_name,
                invoice.date.format("%Y-%m-%d"),
                invoice.period,
                invoice.total,
                invoice.created_at.with_timezone(&Local).format("%Y-%m-%d"),
            )
            .with_context(|| format!("Failed to write invoice: {:?}", invoice))?;
        }
        Ok(())
    }

    fn show_clients(&mut self, clients: &[Client], assignments: &BTreeMap<String, String>) -> Result<()> {
        if clients.is_empty() {
            writeln!(self.writer, "No clients yet.")?;
            return Ok(());
        }
        for client in clients {
            let assigned = assignments.values().filter(|id| **id == client.id).count();
            let tax = if client.tax_enabled {
                format!(" +{}% {}", client.tax_rate, client.tax_name)
            } else {
                String::new()
            };
            writeln!(
                self.writer,
                "- {} ({}): ${:.2}/hr{}, {} project(s) assigned",
                client.name, client.id, client.hourly_rate, tax, assigned
            )
            .with_context(|| format!("Failed to write client: {}", client.id))?;
        }
        Ok(())
    }

    fn show_assignments(
        &mut self,
        assignments: &BTreeMap<String, String>,
        projects: &[Project],
        clients: &[Client],
    ) -> Result<()> {
        let mut shown = 0;
        for (project_id, client_id) in assignments {
            let project = projects.iter().find(|p| p.id == *project_id);
            let client = clients.iter().find(|c| c.id == *client_id);
            if let (Some(project), Some(client)) = (project, client) {
                writeln!(
                    self.writer,
                    "- {} -> {} (${:.2}/hr)",
                    project.title, client.name, client.hourly_rate
                )?;
                shown += 1;
            }
        }
        if shown == 0 {
            writeln!(self.writer, "No project assignments yet.")?;
        }
        Ok(())
    }

    fn show_details(&mut self, details: &MyDetails) -> Result<()> {
        let fields = [
            ("Name", &details.name),
            ("Email", &details.email),
            ("Phone", &details.phone),
            ("Address", &details.address),
            ("Website", &details.website),
            (details.tax_id_label.as_str(), &details.tax_id),
            ("Bank Details", &details.bank_details),
            ("Invoice Title", &details.invoice_title),
            ("Invoice Message", &details.invoice_message),
        ];
        for (label, value) in fields.iter().filter(|(_, value)| !value.is_empty()) {
            writeln!(self.writer, "- {}: {}", label, value)?;
        }
        Ok(())
    }

    fn show_hours(&mut self, summary: &[ProjectHours], days: u32) -> Result<()> {
        writeln!(self.writer, "## Hours Worked (Last {} Days)", days)?;
        writeln!(self.writer)?;
        if summary.is_empty() {
            writeln!(self.writer, "No time tracked in the last {} days.", days)?;
            return Ok(());
        }
        for row in summary {
            writeln!(self.writer, "- {}: **{:.2} hours**", row.name, row.hours)?;
        }
        let total: f64 = summary.iter().map(|row| row.hours).sum();
        writeln!(self.writer)?;
        writeln!(self.writer, "**Total: {:.2} hours**", total)?;
        Ok(())
    }
}

/// ダウンロード用の作業時間レポートのファイル名。
pub fn hours_report_filename(generated_at: DateTime<Local>) -> String {
    format!("hours-report-{}.txt", generated_at.format("%Y-%m-%d"))
}

/// プレーンテキストの作業時間レポートを書き出す。
///
/// `summary`は時間の降順に並んでいる前提。
pub fn write_hours_report<W: Write>(
    writer: &mut W,
    summary: &[ProjectHours],
    generated_at: DateTime<Local>,
    days: u32,
) -> Result<()> {
    writeln!(writer, "HOURS WORKED SUMMARY")?;
    writeln!(writer, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(writer)?;
    writeln!(writer, "Report Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(writer, "Period: Last {} Days", days)?;
    writeln!(writer)?;

    if summary.is_empty() {
        writeln!(writer, "No time tracked in the last {} days.", days)?;
        return Ok(());
    }

    writeln!(writer, "PROJECT BREAKDOWN:")?;
    writeln!(writer, "{}", "-".repeat(RULE_WIDTH))?;
    writeln!(writer)?;
    for row in summary {
        writeln!(writer, "{}: {:.2} hours", row.name, row.hours)
            .with_context(|| format!("Failed to write report line: {:?}", row))?;
    }
    let total: f64 = summary.iter().map(|row| row.hours).sum();
    writeln!(writer)?;
    writeln!(writer, "{}", "-".repeat(RULE_WIDTH))?;
    writeln!(writer, "TOTAL HOURS: {:.2}", total)?;
    Ok(())
}
