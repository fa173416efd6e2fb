use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, Offset, TimeZone};

/// 夏時間の切り替えで存在しない時刻を解決する際に、切り替え前のオフセットを調べる幅。
const GAP_PROBE_HOURS: i64 = 3;

#[cfg(not(test))]
/// 現在のLocal時間を取得する。
///
/// 期間の解決では呼び出し側で一度だけ取得し、各エントリーの判定で再取得しない。
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// テスト時に利用するモック時間を取得する。
#[cfg(test)]
pub mod mock_datetime {
    use std::cell::RefCell;

    use super::DateTime;
    use super::Local;

    thread_local! {
        static MOCK_TIME: RefCell<Option<DateTime<Local>>> = RefCell::new(None);
    }

    /// モック時間を取得する。
    pub fn now() -> DateTime<Local> {
        MOCK_TIME.with(|cell| cell.borrow().as_ref().cloned().unwrap_or_else(Local::now))
    }

    /// モック時間を設定する。
    pub fn set_mock_time(time: DateTime<Local>) {
        MOCK_TIME.with(|cell| *cell.borrow_mut() = Some(time));
    }

    // 設定したモック時間をクリアする。
    pub fn clear_mock_time() {
        MOCK_TIME.with(|cell| *cell.borrow_mut() = None);
    }
}

#[cfg(test)]
pub use mock_datetime::now;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// 1始まりの月番号から英語の月名を返す。
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month as usize - 1) % 12]
}

/// Localタイムゾーンで指定日の指定時刻を返す。
///
/// 夏時間の切り替えで曖昧な時刻になる場合は早い方を採用する。
pub fn local_at(date: NaiveDate, hour: u32, min: u32, sec: u32) -> Result<DateTime<Local>> {
    let naive_datetime = date
        .and_hms_opt(hour, min, sec)
        .with_context(|| format!("Failed to set time {}:{}:{} on {}", hour, min, sec, date))?;
    Local
        .from_local_datetime(&naive_datetime)
        .earliest()
        .with_context(|| format!("Failed to convert to DateTime<Local>: {}", naive_datetime))
}

/// 暦の上で`days`日前の同じ時刻を返す。
///
/// 夏時間の切り替えをまたいでも時刻は維持する。重複する時刻は早い方、存在しない時刻は
/// 切り替え前のオフセットで解釈して切り替え後の時刻に進める。
pub fn sub_local_days<Tz: TimeZone>(datetime: &DateTime<Tz>, days: u32) -> DateTime<Tz> {
    let timezone = datetime.timezone();
    let naive = datetime.naive_local() - Duration::days(days as i64);
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(shifted) => shifted,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let before_gap = naive - Duration::hours(GAP_PROBE_HOURS);
            match timezone.from_local_datetime(&before_gap).earliest() {
                Some(probe) => {
                    let offset = probe.offset().fix().local_minus_utc() as i64;
                    timezone.from_utc_datetime(&(naive - Duration::seconds(offset)))
                }
                None => datetime.clone() - Duration::days(days as i64),
            }
        }
    }
}

/// `YYYY-MM-DD`形式の日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Local, NaiveDate, SecondsFormat, TimeZone, Timelike, Utc};
    use chrono_tz::America::New_York;
    use chrono_tz::Tz;
    use rstest::rstest;

    use super::{local_at, mock_datetime, month_name, parse_date, sub_local_days};

    fn new_york(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        New_York.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    /// 何も設定しない場合は、現在時間が取得できることを確認する。
    ///
    ///  - 現在時刻での比較を行なっているため、ミリ秒単位まで比較するとテストが失敗する可能性があり、秒単位で比較している。
    #[test]
    fn test_now() {
        mock_datetime::clear_mock_time();
        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// モック時間を設定した時に、その時間が取得できることを確認する。
    #[test]
    fn test_now_specific_datetime() {
        let datetime = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        mock_datetime::set_mock_time(datetime);

        assert_eq!(mock_datetime::now(), datetime);
        mock_datetime::clear_mock_time();
    }

    #[rstest]
    #[case(1, "January")]
    #[case(2, "February")]
    #[case(12, "December")]
    fn test_month_name(#[case] month: u32, #[case] expected: &str) {
        assert_eq!(month_name(month), expected);
    }

    #[test]
    fn test_local_at_end_of_day() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let end = local_at(date, 23, 59, 59).unwrap();

        assert_eq!(end.date_naive(), date);
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        assert_eq!(end.nanosecond(), 0);
    }

    #[rstest]
    #[case("2024-02-30")]
    #[case("02/01/2024")]
    #[case("")]
    fn test_parse_date_invalid(#[case] input: &str) {
        assert!(parse_date(input).is_err());
    }

    /// ニューヨークでは2024-03-10 02:00に夏時間が始まり、2024-11-03 02:00に終わる。
    #[rstest]
    #[case::no_transition(new_york(2024, 3, 20, 10, 0), 3, utc(2024, 3, 17, 14, 0))]
    #[case::across_spring_forward(new_york(2024, 3, 11, 12, 0), 1, utc(2024, 3, 10, 16, 0))]
    #[case::into_spring_gap(new_york(2024, 3, 13, 2, 30), 3, utc(2024, 3, 10, 7, 30))]
    #[case::into_repeated_hour(new_york(2024, 11, 6, 1, 30), 3, utc(2024, 11, 3, 5, 30))]
    #[case::zero_days(new_york(2024, 3, 13, 2, 30), 0, utc(2024, 3, 13, 6, 30))]
    fn test_sub_local_days(
        #[case] datetime: DateTime<Tz>,
        #[case] days: u32,
        #[case] expected: DateTime<Utc>,
    ) {
        assert_eq!(sub_local_days(&datetime, days), expected);
    }

    /// 存在しない時刻は切り替え後の時刻に進む。
    #[test]
    fn test_sub_local_days_gap_moves_forward() {
        let shifted = sub_local_days(&new_york(2024, 3, 13, 2, 30), 3);

        assert_eq!((shifted.hour(), shifted.minute()), (3, 30));
        assert_eq!(shifted.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
    }
}
