use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};
#[cfg(test)]
use mockall::automock;
use tokio::time::{sleep, Duration, Instant};

use crate::state::AppState;

/// 連続した書き込みの最小間隔。
pub const MIN_PERSIST_INTERVAL: Duration = Duration::from_millis(1000);

/// 状態を保存するための外部ストレージ。
#[cfg_attr(test, automock)]
pub trait StateStore {
    /// 保存された状態を読み込む。未保存の場合は`None`。
    async fn load(&self) -> Result<Option<String>>;

    /// 状態を書き込む。
    async fn save(&self, data: &str) -> Result<()>;
}

/// 状態をJSONファイルとして保存する。
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStore {
    async fn load(&self) -> Result<Option<String>> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to check state file: {}", self.path.display()))?
        {
            debug!("No saved state at {}", self.path.display());
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        Ok(Some(data))
    }

    async fn save(&self, data: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        tokio::fs::write(&self.path, data)
            .await
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;
        Ok(())
    }
}

/// 書き込みの間隔を空けるストア。
///
/// 前回の書き込み完了から`min_interval`経っていなければ、残りの時間だけ待ってから書き込む。
/// 待ち行列は持たない。`&mut self`で呼び出しが直列化される。
pub struct ThrottledStore<S: StateStore> {
    inner: S,
    min_interval: Duration,
    last_persist_at: Option<Instant>,
}

impl<S: StateStore> ThrottledStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_interval(inner, MIN_PERSIST_INTERVAL)
    }

    pub fn with_interval(inner: S, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_persist_at: None,
        }
    }

    /// 保存された状態を読み込み、既定値を補った`AppState`を返す。
    pub async fn load_state(&self) -> Result<AppState> {
        let data = self.inner.load().await.context("Failed to load state")?;
        AppState::from_json(data.as_deref())
    }

    /// 状態を書き込む。前回の書き込みから間隔が短い場合は待つ。
    ///
    /// 失敗した場合は前回の書き込み時刻を更新しない。
    pub async fn save_state(&mut self, state: &AppState) -> Result<()> {
        let data = state.to_json()?;
        if let Some(last) = self.last_persist_at {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("Delaying save by {:?}", wait);
                sleep(wait).await;
            }
        }
        self.inner.save(&data).await.context("Failed to save state")?;
        self.last_persist_at = Some(Instant::now());
        info!("State saved");
        Ok(())
    }
}
