use std::path::PathBuf;

use anyhow::{Context, Result};

const APP_DIR: &str = "sp-invoice";
const STATE_FILE: &str = "state.json";

/// 実行時の設定。
///
/// コマンドライン引数、環境変数の順で解決し、状態ファイルはどちらも無ければデータディレクトリに置く。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub state_path: PathBuf,
    tasks_path: Option<PathBuf>,
}

impl Config {
    pub fn new(state_path: Option<PathBuf>, tasks_path: Option<PathBuf>) -> Result<Self> {
        let state_path = match state_path {
            Some(path) => path,
            None => default_state_path()?,
        };
        Ok(Self {
            state_path,
            tasks_path,
        })
    }

    /// タスクのエクスポートファイルのパス。未設定の場合はエラーを返す。
    pub fn tasks_path(&self) -> Result<&PathBuf> {
        self.tasks_path
            .as_ref()
            .context("--tasks or SP_INVOICE_TASKS must be set")
    }
}

fn default_state_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("Failed to locate the user data directory")?;
    Ok(data_dir.join(APP_DIR).join(STATE_FILE))
}
