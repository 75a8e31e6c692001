//! 警告写入服务 - 业务能力层
//!
//! 只负责"写 warn.txt"能力：记录每个上传会话的非致命问题，方便人工复查

use crate::error::{AppError, AppResult};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 警告写入服务
pub struct WarnWriter {
    warn_file_path: PathBuf,
}

impl WarnWriter {
    pub fn new() -> Self {
        Self::with_path("warn.txt")
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    /// 追加一个会话的全部警告，没有警告时不写
    pub async fn write(&self, file_name: &str, warnings: &[String]) -> AppResult<()> {
        if warnings.is_empty() {
            return Ok(());
        }

        debug!("写入警告: {} | {} 条", file_name, warnings.len());

        let content: String = warnings
            .iter()
            .map(|w| format!("文件 {} | {}\n", file_name, w))
            .collect();

        let path = self.warn_file_path.display().to_string();
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .await
            .map_err(|e| AppError::file_write_failed(&path, e))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| AppError::file_write_failed(&path, e))?;

        Ok(())
    }
}

impl Default for WarnWriter {
    fn default() -> Self {
        Self::new()
    }
}
