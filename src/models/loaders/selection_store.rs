//! 班级/科目/学生选择的交接存储
//!
//! 以 TOML 文件代替浏览器 sessionStorage：写一次、读一次。

use crate::error::{AppError, AppResult, FileError};
use crate::models::SelectionContext;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// 选择交接存储
#[derive(Debug, Clone)]
pub struct SelectionStore {
    path: PathBuf,
}

impl SelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取选择；文件不存在视为"未选择"
    pub async fn load(&self) -> AppResult<Option<SelectionContext>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("选择文件不存在: {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(AppError::file_read_failed(self.display(), e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let selection: SelectionContext = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: self.display(),
            source,
        })?;

        Ok(Some(selection))
    }

    /// 保存选择（覆盖之前的内容）
    pub async fn save(&self, selection: &SelectionContext) -> AppResult<()> {
        let content = toml::to_string(selection).map_err(FileError::TomlSerializeFailed)?;
        fs::write(&self.path, content)
            .await
            .map_err(|e| AppError::file_write_failed(self.display(), e))?;
        debug!("选择已保存: {}", self.path.display());
        Ok(())
    }

    /// 读取后删除
    pub async fn take(&self) -> AppResult<Option<SelectionContext>> {
        let selection = self.load().await?;
        if selection.is_some() {
            fs::remove_file(&self.path).await.map_err(|source| FileError::DeleteFailed {
                path: self.display(),
                source,
            })?;
            info!("✓ 已读取并清除选择: {}", self.path.display());
        }
        Ok(selection)
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}
