use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::aggregate::{summarize_hours, ProjectHours};
use crate::console::{hours_report_filename, write_hours_report};
use crate::datetime;
use crate::period::DEFAULT_CUSTOM_DAYS;
use crate::task_source::{read_all_tasks, TaskSource};

/// 直近の作業時間をプロジェクトごとに表示するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct HoursArgs {
    #[clap(
        short = 'd',
        long = "days",
        default_value_t = DEFAULT_CUSTOM_DAYS,
        help = "Number of days to look back"
    )]
    pub days: u32,

    #[clap(long = "report", help = "Write a plain-text hours report file")]
    pub report: bool,

    #[clap(
        long = "out",
        default_value = ".",
        help = "Directory for the hours report file"
    )]
    pub out: PathBuf,
}

/// `hours`サブコマンドの結果。
pub struct HoursSummary {
    pub days: u32,
    pub rows: Vec<ProjectHours>,
    /// レポートを書き出した場合はそのパス
    pub report_path: Option<PathBuf>,
}

pub struct HoursCommand<'a, T: TaskSource> {
    task_source: &'a T,
}

impl<'a, T: TaskSource> HoursCommand<'a, T> {
    /// 新しい`HoursCommand`を返す。
    ///
    /// # Arguments
    /// * `task_source` - タスクとプロジェクトの取得元
    pub fn new(task_source: &'a T) -> Self {
        Self { task_source }
    }

    /// `hours`サブコマンドの処理を行う。
    ///
    /// 全てのタスクを対象に、直近`days`日の作業時間をプロジェクトごとに集計する。
    /// `report`が指定された場合はテキストのレポートも書き出す。
    pub async fn run(&self, args: HoursArgs) -> Result<HoursSummary> {
        let now = datetime::now();
        let tasks = read_all_tasks(self.task_source).await?;
        let projects = self
            .task_source
            .read_projects()
            .await
            .context("Failed to read projects")?;

        let days = if args.days == 0 { DEFAULT_CUSTOM_DAYS } else { args.days };
        let rows = summarize_hours(&tasks, &projects, now, days);
        info!("Summarized {} project(s) over {} days", rows.len(), days);

        let report_path = if args.report {
            let path = args.out.join(hours_report_filename(now));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create report: {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_hours_report(&mut writer, &rows, now, days)?;
            writer
                .flush()
                .with_context(|| format!("Failed to flush report: {}", path.display()))?;
            Some(path)
        } else {
            None
        };

        Ok(HoursSummary {
            days,
            rows,
            report_path,
        })
    }
}
