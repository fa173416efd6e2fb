use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use log::debug;

use crate::datetime::sub_local_days;
use crate::period::Period;
use crate::time_entry::{Project, TimeEntry};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// プロジェクトが割り当てられていないエントリーの集計キー。
pub const NO_PROJECT: &str = "No Project";
/// プロジェクト一覧に存在しないIDの表示名。
pub const UNKNOWN_PROJECT: &str = "Unknown Project";

/// 請求書の明細に載せるタスク1件。
#[derive(Clone, Debug, PartialEq)]
pub struct TaskLine {
    pub task_id: String,
    pub title: String,
    pub hours: f64,
}

/// プロジェクトごとの集計結果。
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectBucket {
    pub project_id: String,
    /// サブタスクを含む合計時間
    pub hours: f64,
    /// 親タスクのみ。入力順を維持する。
    pub tasks: Vec<TaskLine>,
}

/// 期間内の集計結果。`projects`は最初に現れた順に並ぶ。
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregation {
    pub period_label: String,
    pub projects: Vec<ProjectBucket>,
}

impl Aggregation {
    /// 請求対象の時間が無い場合は`true`を返す。
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn total_hours(&self) -> f64 {
        self.projects.iter().map(|bucket| bucket.hours).sum()
    }

    /// プロジェクトIDごとの合計時間。
    #[cfg(test)]
    pub fn project_hours(&self) -> HashMap<&str, f64> {
        self.projects
            .iter()
            .map(|bucket| (bucket.project_id.as_str(), bucket.hours))
            .collect()
    }

    /// プロジェクトIDごとの明細タスク。
    #[cfg(test)]
    pub fn project_tasks(&self) -> HashMap<&str, &[TaskLine]> {
        self.projects
            .iter()
            .map(|bucket| (bucket.project_id.as_str(), bucket.tasks.as_slice()))
            .collect()
    }

    /// 合計時間の降順に並べたプロジェクト。同じ時間の場合は出現順を維持する。
    pub fn sorted_by_hours(&self) -> Vec<&ProjectBucket> {
        let mut sorted: Vec<&ProjectBucket> = self.projects.iter().collect();
        sorted.sort_by(|a, b| b.hours.total_cmp(&a.hours));
        sorted
    }
}

/// クライアントのプロジェクトについて、期間内の作業時間を集計する。
///
/// 作業時間が0のもの、対象外のプロジェクトのもの、期間外のものは除外する。
/// サブタスクは合計時間には含めるが、明細には載せない。
///
/// # Arguments
///
/// * `entries` - 通常タスクとアーカイブ済みタスクを連結したもの
/// * `client_project_ids` - クライアントに割り当てられたプロジェクトID
/// * `period` - 解決済みの期間
pub fn aggregate(
    entries: &[TimeEntry],
    client_project_ids: &HashSet<String>,
    period: &Period,
) -> Aggregation {
    let mut projects: Vec<ProjectBucket> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        if entry.time_spent == 0 {
            continue;
        }
        let Some(project_id) = entry.project_id.as_deref() else {
            continue;
        };
        if !client_project_ids.contains(project_id) || !period.contains(&entry.effective_date()) {
            continue;
        }

        let hours = entry.time_spent as f64 / MILLIS_PER_HOUR;
        let position = *index.entry(project_id).or_insert_with(|| {
            projects.push(ProjectBucket {
                project_id: project_id.to_string(),
                hours: 0.0,
                tasks: Vec::new(),
            });
            projects.len() - 1
        });
        let bucket = &mut projects[position];
        bucket.hours += hours;
        if entry.parent_id.is_none() {
            bucket.tasks.push(TaskLine {
                task_id: entry.id.clone(),
                title: entry.title.clone(),
                hours,
            });
        }
    }

    Aggregation {
        period_label: period.label.clone(),
        projects,
    }
}

/// 作業時間サマリーの1行。
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectHours {
    pub name: String,
    pub hours: f64,
}

/// 直近`days`日の作業時間をプロジェクト名ごとに集計する。
///
/// クライアントに関係なく全てのタスクが対象。基準日時は`now`から暦日で`days`日前の同じ時刻で、
/// ちょうどのエントリーは含めない。結果は時間の降順で、同じ時間の場合は出現順を維持する。
pub fn summarize_hours<Tz: TimeZone>(
    entries: &[TimeEntry],
    projects: &[Project],
    now: DateTime<Tz>,
    days: u32,
) -> Vec<ProjectHours> {
    let cutoff = sub_local_days(&now, days);
    debug!("Summarizing hours after {}", cutoff.with_timezone(&Utc));
    let titles: HashMap<&str, &str> = projects
        .iter()
        .map(|project| (project.id.as_str(), project.title.as_str()))
        .collect();

    let mut summary: Vec<(Option<&str>, f64)> = Vec::new();
    for entry in entries {
        if entry.time_spent == 0 || entry.effective_date() <= cutoff {
            continue;
        }
        let key = entry.project_id.as_deref();
        let hours = entry.time_spent as f64 / MILLIS_PER_HOUR;
        match summary.iter_mut().find(|(id, _)| *id == key) {
            Some((_, total)) => *total += hours,
            None => summary.push((key, hours)),
        }
    }
    summary.sort_by(|a, b| b.1.total_cmp(&a.1));

    summary
        .into_iter()
        .map(|(project_id, hours)| {
            let name = match project_id {
                None => NO_PROJECT,
                Some(id) => titles.get(id).copied().unwrap_or(UNKNOWN_PROJECT),
            };
            ProjectHours {
                name: name.to_string(),
                hours,
            }
        })
        .collect()
}
