use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::aggregate::{Aggregation, TaskLine, UNKNOWN_PROJECT};
use crate::state::{Client, InvoiceRecord, MyDetails};
use crate::time_entry::Project;

/// 明細の粒度。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Itemization {
    /// プロジェクトごとの合計のみ
    ProjectTotals,
    /// プロジェクトの下に親タスクごとの時間を並べる
    Tasks,
}

/// 請求書の1行。
#[derive(Clone, Debug, PartialEq)]
pub struct InvoiceLine {
    pub project_name: String,
    pub hours: f64,
    pub rate: f64,
    pub amount: f64,
    pub tasks: Vec<TaskLine>,
}

/// 表示用に組み立てた請求書。
#[derive(Clone, Debug, PartialEq)]
pub struct Invoice {
    pub number: String,
    pub date: NaiveDate,
    pub period_label: String,
    pub details: MyDetails,
    pub client: Client,
    pub lines: Vec<InvoiceLine>,
    pub total_hours: f64,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
}

impl Invoice {
    /// 集計結果とクライアントの単価から請求書を組み立てる。
    ///
    /// 行は合計時間の降順に並ぶ。税はクライアントで有効な場合のみ小計に掛ける。
    pub fn build(
        number: String,
        date: NaiveDate,
        aggregation: &Aggregation,
        client: &Client,
        projects: &[Project],
        details: &MyDetails,
        itemization: Itemization,
    ) -> Self {
        let titles: HashMap<&str, &str> = projects
            .iter()
            .map(|project| (project.id.as_str(), project.title.as_str()))
            .collect();

        let lines: Vec<InvoiceLine> = aggregation
            .sorted_by_hours()
            .into_iter()
            .map(|bucket| InvoiceLine {
                project_name: titles
                    .get(bucket.project_id.as_str())
                    .copied()
                    .unwrap_or(UNKNOWN_PROJECT)
                    .to_string(),
                hours: bucket.hours,
                rate: client.hourly_rate,
                amount: bucket.hours * client.hourly_rate,
                tasks: match itemization {
                    Itemization::Tasks => bucket.tasks.clone(),
                    Itemization::ProjectTotals => Vec::new(),
                },
            })
            .collect();

        let total_hours = aggregation.total_hours();
        let subtotal: f64 = lines.iter().map(|line| line.amount).sum();
        let tax_amount = if client.tax_enabled {
            subtotal * client.tax_rate / 100.0
        } else {
            0.0
        };

        Self {
            number,
            date,
            period_label: aggregation.period_label.clone(),
            details: details.clone(),
            client: client.clone(),
            lines,
            total_hours,
            subtotal,
            tax_amount,
            total: subtotal + tax_amount,
        }
    }

    /// 履歴に保存する記録を作る。
    pub fn to_record(&self, created_at: DateTime<Utc>) -> InvoiceRecord {
        InvoiceRecord {
            number: self.number.clone(),
            client_id: self.client.id.clone(),
            client_name: self.client.name.clone(),
            date: self.date,
            period: self.period_label.clone(),
            total: self.total,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rstest::rstest;

    use super::{Invoice, Itemization};
    use crate::aggregate::{Aggregation, ProjectBucket, TaskLine};
    use crate::state::test_utils::client;
    use crate::state::MyDetails;
    use crate::time_entry::Project;

    fn aggregation() -> Aggregation {
        Aggregation {
            period_label: "February 2024".to_string(),
            projects: vec![
                ProjectBucket {
                    project_id: "P1".to_string(),
                    hours: 1.5,
                    tasks: vec![TaskLine {
                        task_id: "t1".to_string(),
                        title: "Design".to_string(),
                        hours: 1.0,
                    }],
                },
                ProjectBucket {
                    project_id: "P9".to_string(),
                    hours: 4.0,
                    tasks: vec![],
                },
            ],
        }
    }

    fn projects() -> Vec<Project> {
        vec![Project {
            id: "P1".to_string(),
            title: "Website".to_string(),
        }]
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[rstest]
    #[case::without_tax(false, 0.0, 110.0)]
    #[case::with_tax(true, 22.0, 132.0)]
    fn test_totals(#[case] tax_enabled: bool, #[case] tax: f64, #[case] total: f64) {
        let mut client = client("c1", 20.0);
        client.tax_enabled = tax_enabled;

        let invoice = Invoice::build(
            "INV-202403-00001".to_string(),
            date(),
            &aggregation(),
            &client,
            &projects(),
            &MyDetails::default(),
            Itemization::ProjectTotals,
        );

        assert_eq!(invoice.total_hours, 5.5);
        assert_eq!(invoice.subtotal, 110.0);
        assert!((invoice.tax_amount - tax).abs() < 1e-9);
        assert!((invoice.total - total).abs() < 1e-9);
    }

    #[test]
    fn test_lines_sorted_and_named() {
        let invoice = Invoice::build(
            "INV-202403-00001".to_string(),
            date(),
            &aggregation(),
            &client("c1", 10.0),
            &projects(),
            &MyDetails::default(),
            Itemization::Tasks,
        );

        let names: Vec<&str> = invoice.lines.iter().map(|l| l.project_name.as_str()).collect();
        assert_eq!(names, vec!["Unknown Project", "Website"]);
        assert_eq!(invoice.lines[1].tasks.len(), 1);
        assert_eq!(invoice.lines[1].amount, 15.0);
    }

    #[test]
    fn test_project_totals_hide_tasks() {
        let invoice = Invoice::build(
            "INV-202403-00001".to_string(),
            date(),
            &aggregation(),
            &client("c1", 10.0),
            &projects(),
            &MyDetails::default(),
            Itemization::ProjectTotals,
        );

        assert!(invoice.lines.iter().all(|line| line.tasks.is_empty()));
    }

    #[test]
    fn test_to_record() {
        let invoice = Invoice::build(
            "INV-202403-00077".to_string(),
            date(),
            &aggregation(),
            &client("c1", 10.0),
            &projects(),
            &MyDetails::default(),
            Itemization::ProjectTotals,
        );
        let created_at = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();

        let record = invoice.to_record(created_at);

        assert_eq!(record.number, "INV-202403-00077");
        assert_eq!(record.client_name, "Client c1");
        assert_eq!(record.period, "February 2024");
        assert_eq!(record.total, 55.0);
        assert_eq!(record.date, date());
    }
}
