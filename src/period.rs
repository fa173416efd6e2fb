use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone};

use crate::datetime::{local_at, month_name, parse_date, sub_local_days};
use crate::warning::Warning;

/// `custom-days`で日数が指定されていない場合の既定値。
pub const DEFAULT_CUSTOM_DAYS: u32 = 30;

/// 請求対象期間の指定。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeriodSpec {
    Week,
    Month,
    LastMonth,
    Year,
    /// 直近n日。`None`または0は既定の30日として扱う。
    CustomDays(Option<u32>),
    /// `YYYY-MM-DD`形式の開始日と終了日(両端を含む)。
    CustomRange { start: String, end: String },
}

/// 解決済みの期間。`start`と`end`の両端を含む。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub label: String,
}

impl Period {
    /// 日時が期間内かどうかを返す。
    pub fn contains<Tz: chrono::TimeZone>(&self, datetime: &DateTime<Tz>) -> bool {
        self.start <= *datetime && *datetime <= self.end
    }
}

/// 期間指定と現在時刻から具体的な期間とラベルを求める。
///
/// 終了を持たない期間は`now`で終わる。`now`は呼び出し側で一度だけ取得した値を渡す。
///
/// # Arguments
///
/// * `spec` - 期間指定
/// * `now` - 解決の基準となる現在時刻
pub fn resolve_period(spec: &PeriodSpec, now: DateTime<Local>) -> Result<Period> {
    let today = now.date_naive();
    let period = match spec {
        PeriodSpec::Week => Period {
            start: week_start(&now),
            end: now,
            label: format!("Week {}", week_number(now)?),
        },
        PeriodSpec::Month => {
            let first = first_of_month(today.year(), today.month())?;
            Period {
                start: local_at(first, 0, 0, 0)?,
                end: now,
                label: format!("{} {}", month_name(today.month()), today.year()),
            }
        }
        PeriodSpec::LastMonth => {
            let (year, month) = match today.month() {
                1 => (today.year() - 1, 12),
                month => (today.year(), month - 1),
            };
            let first = first_of_month(year, month)?;
            let last = first_of_month(today.year(), today.month())?
                .pred_opt()
                .context("Failed to find last day of previous month")?;
            Period {
                start: local_at(first, 0, 0, 0)?,
                end: local_at(last, 23, 59, 59)?,
                label: format!("{} {}", month_name(month), year),
            }
        }
        PeriodSpec::Year => Period {
            start: local_at(first_of_month(today.year(), 1)?, 0, 0, 0)?,
            end: now,
            label: today.year().to_string(),
        },
        PeriodSpec::CustomDays(days) => {
            let days = days.filter(|days| *days > 0).unwrap_or(DEFAULT_CUSTOM_DAYS);
            Period {
                start: sub_local_days(&now, days),
                end: now,
                label: format!("Last {} days", days),
            }
        }
        PeriodSpec::CustomRange { start, end } => {
            if start.trim().is_empty() || end.trim().is_empty() {
                return Err(Warning::MissingCustomRange.into());
            }
            let start_date = parse_date(start).map_err(|_| Warning::InvalidDate(start.clone()))?;
            let end_date = parse_date(end).map_err(|_| Warning::InvalidDate(end.clone()))?;
            Period {
                start: local_at(start_date, 0, 0, 0)?,
                end: local_at(end_date, 23, 59, 59)?,
                label: format!("{} to {}", start, end),
            }
        }
    };

    Ok(period)
}

/// 直近の日曜日の、`now`と同じ時刻。`now`が日曜日ならそのまま返す。
fn week_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    sub_local_days(now, now.weekday().num_days_from_sunday())
}

/// 1月1日からの経過時間を7日単位で切り上げた週番号。
///
/// ISO 8601の週番号とは一致しない。過去に発行した請求書のラベルと揃えるためこの式を維持する。
fn week_number(now: DateTime<Local>) -> Result<i64> {
    let new_year = local_at(first_of_month(now.year(), 1)?, 0, 0, 0)?;
    let elapsed = (now - new_year).num_milliseconds() as f64;
    let week = Duration::days(7).num_milliseconds() as f64;
    Ok((elapsed / week).ceil() as i64)
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("Failed to build date {}-{:02}-01", year, month))
}
