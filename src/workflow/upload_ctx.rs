//! 上传处理上下文
//!
//! 封装"我正在处理哪个学生哪个科目的哪份文件"这一信息

use crate::error::ValidationError;
use crate::models::{PipelineVariant, SelectionContext};
use std::fmt::Display;

/// 上传处理上下文
///
/// 由页面交接的选择校验而来，字段全部必填
#[derive(Debug, Clone)]
pub struct UploadCtx {
    /// 上传序号（仅用于日志显示）
    pub upload_index: usize,
    /// 源文件名
    pub file_name: String,
    pub class_id: String,
    pub subject_id: String,
    pub student_id: String,
    /// 该科目是否已有标准答案
    pub key_answer_available: bool,
    pub variant: PipelineVariant,
}

impl UploadCtx {
    /// 校验选择并创建上下文
    pub fn from_selection(
        selection: &SelectionContext,
        variant: PipelineVariant,
        upload_index: usize,
        file_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            upload_index,
            file_name: file_name.into(),
            class_id: required(selection.class_id.as_deref(), "班级")?,
            subject_id: required(selection.subject_id.as_deref(), "科目")?,
            student_id: required(selection.student_id.as_deref(), "学生")?,
            key_answer_available: selection.key_answer_available,
            variant,
        })
    }
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::MissingSelection { field }),
    }
}

impl Display for UploadCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[上传 {} 学生#{} 科目#{}]",
            self.upload_index, self.student_id, self.subject_id
        )
    }
}
