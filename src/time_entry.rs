use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

/// タスクに記録された作業時間。
///
/// 1タスクにつき1件。`parent_id`があればサブタスクを表す。
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// ミリ秒単位の作業時間
    #[serde(default)]
    pub time_spent: u64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub changed: Option<DateTime<Utc>>,
}

impl TimeEntry {
    /// 集計に利用する日時を返す。更新日時があればそれを、なければ作成日時を使う。
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.changed.unwrap_or(self.created)
    }
}

/// プロジェクト情報。
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub title: String,
}

/// エクスポートではエポックミリ秒とRFC3339文字列の両方が現れる。
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    fn into_datetime<E: serde::de::Error>(self) -> Result<DateTime<Utc>, E> {
        match self {
            RawTimestamp::Millis(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| E::custom(format!("timestamp out of range: {}", millis))),
            RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|datetime| datetime.to_utc())
                .map_err(|e| E::custom(format!("invalid timestamp '{}': {}", text, e))),
        }
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    RawTimestamp::deserialize(deserializer)?.into_datetime()
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawTimestamp>::deserialize(deserializer)?
        .map(RawTimestamp::into_datetime)
        .transpose()
}
