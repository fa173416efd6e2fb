use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::time_entry::{Project, TimeEntry};

/// タスクとプロジェクトを取得するためのtrait。
#[cfg_attr(test, automock)]
pub trait TaskSource {
    /// 通常のタスクを取得する。
    async fn read_tasks(&self) -> Result<Vec<TimeEntry>>;

    /// アーカイブ済みのタスクを取得する。
    async fn read_archived_tasks(&self) -> Result<Vec<TimeEntry>>;

    /// プロジェクト一覧を取得する。
    async fn read_projects(&self) -> Result<Vec<Project>>;
}

/// 通常のタスクとアーカイブ済みのタスクを連結して取得する。
pub async fn read_all_tasks<T: TaskSource>(source: &T) -> Result<Vec<TimeEntry>> {
    let mut tasks = source.read_tasks().await.context("Failed to read tasks")?;
    let archived = source
        .read_archived_tasks()
        .await
        .context("Failed to read archived tasks")?;
    info!("length of tasks: {}, archived: {}", tasks.len(), archived.len());
    tasks.extend(archived);
    Ok(tasks)
}

/// エクスポートファイルの構造。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TaskExport {
    tasks: Vec<TimeEntry>,
    archived_tasks: Vec<TimeEntry>,
    projects: Vec<Project>,
}

/// タスクトラッカーからエクスポートしたJSONファイルを読むためのクライアント。
///
/// ファイルは最初の取得時に一度だけ読み込み、以降は同じ内容を返す。
///
/// # Examples
///
/// ```
/// let source = JsonExportSource::new("export.json");
/// let projects = source.read_projects().await.unwrap();
/// ```
pub struct JsonExportSource {
    path: PathBuf,
    export: OnceCell<TaskExport>,
}

impl JsonExportSource {
    /// 新しい`JsonExportSource`を返す。
    ///
    /// # Arguments
    ///
    /// * `path` - エクスポートファイルのパス
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            export: OnceCell::new(),
        }
    }

    async fn export(&self) -> Result<&TaskExport> {
        self.export.get_or_try_init(|| self.read_export()).await
    }

    async fn read_export(&self) -> Result<TaskExport> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read task export at {}", self.path.display()))?;
        let export: TaskExport = serde_json::from_str(&data)
            .with_context(|| format!("Failed to deserialize task export at {}", self.path.display()))?;
        debug!("Loaded task export from {}", self.path.display());
        Ok(export)
    }
}

impl TaskSource for JsonExportSource {
    async fn read_tasks(&self) -> Result<Vec<TimeEntry>> {
        Ok(self.export().await?.tasks.clone())
    }

    async fn read_archived_tasks(&self) -> Result<Vec<TimeEntry>> {
        Ok(self.export().await?.archived_tasks.clone())
    }

    async fn read_projects(&self) -> Result<Vec<Project>> {
        Ok(self.export().await?.projects.clone())
    }
}
