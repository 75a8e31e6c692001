//! 答卷记录服务 - 业务能力层
//!
//! 只负责"按学生+科目拿到答卷ID"能力：先创建，冲突时查询找回

use crate::clients::{CreateScriptOutcome, GradingBackend};
use crate::error::PipelineError;
use tracing::{info, warn};

/// 答卷记录服务
pub struct ScriptRegistry<'a> {
    backend: &'a dyn GradingBackend,
}

impl<'a> ScriptRegistry<'a> {
    pub fn new(backend: &'a dyn GradingBackend) -> Self {
        Self { backend }
    }

    /// 创建或找回答卷记录
    ///
    /// 同一 (学生, 科目) 重复调用返回同一个ID；冲突后找不到匹配记录是致命错误。
    pub async fn create_or_find(&self, student_id: &str, subject_id: &str) -> Result<String, PipelineError> {
        let outcome = self
            .backend
            .create_script(student_id, subject_id)
            .await
            .map_err(PipelineError::ScriptCreationFailed)?;

        match outcome {
            CreateScriptOutcome::Created { script_id } => {
                info!("✓ 已创建答卷记录: {}", script_id);
                Ok(script_id)
            }
            CreateScriptOutcome::Conflict { message } => {
                warn!("答卷记录已存在 ({})，查询现有记录...", message);
                self.find_existing(student_id, subject_id).await
            }
        }
    }

    async fn find_existing(&self, student_id: &str, subject_id: &str) -> Result<String, PipelineError> {
        let records = self
            .backend
            .find_scripts(student_id, subject_id)
            .await
            .map_err(PipelineError::ScriptCreationFailed)?;

        // 查询接口未必按参数过滤，这里再按ID精确匹配一次
        match records.into_iter().find(|r| r.matches(student_id, subject_id)) {
            Some(record) => {
                info!("✓ 找回已有答卷记录: {}", record.script_id);
                Ok(record.script_id)
            }
            None => Err(PipelineError::ScriptNotResolved {
                student_id: student_id.to_string(),
                subject_id: subject_id.to_string(),
            }),
        }
    }
}
