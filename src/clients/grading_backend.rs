//! 评分后端接口
//!
//! 流水线只通过这个 trait 访问外部服务；生产环境用 `HttpBackend`，
//! 测试用内存实现。

use crate::error::ApiResult;
use crate::models::{EnrichmentStage, JobStatus, PageImage, ScriptRecord, SecondaryJob, SourceFile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 转换接口返回的单页图片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedImage {
    pub data: String,
    pub filename: String,
    #[serde(default)]
    pub path: Option<String>,
}

impl ConvertedImage {
    /// 按返回顺序编号（从1开始）
    pub fn into_page(self, page_number: u32) -> PageImage {
        PageImage {
            page_number,
            data: self.data,
            filename: self.filename,
            path: self.path,
            compression: None,
        }
    }
}

/// 创建答卷记录的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateScriptOutcome {
    Created { script_id: String },
    /// 记录已存在（需要查询找回）
    Conflict { message: String },
}

/// 保存页面图片请求
#[derive(Debug, Clone, Serialize)]
pub struct SavePageImageRequest {
    pub script_id: String,
    pub page_number: u32,
    pub image_data: String,
    pub image_filename: String,
    pub image_path: String,
}

/// 启动后台任务请求
#[derive(Debug, Clone, Serialize)]
pub struct StartJobRequest {
    pub script_id: String,
    pub use_api: bool,
    pub force_process: bool,
}

/// 保存 OCR 结果请求
#[derive(Debug, Clone, Serialize)]
pub struct SaveOcrRequest {
    pub script_id: String,
    pub page_number: u32,
    pub ocr_json: Value,
    pub structured_json: Value,
    pub context: Value,
}

/// 评分后端
#[async_trait]
pub trait GradingBackend: Send + Sync {
    /// PDF 转图片，按页顺序返回
    async fn convert_pdf(&self, file: &SourceFile) -> ApiResult<Vec<ConvertedImage>>;

    /// 单页 OCR
    async fn extract_text(&self, image_data: &str) -> ApiResult<Value>;

    /// 创建答卷记录
    async fn create_script(&self, student_id: &str, subject_id: &str) -> ApiResult<CreateScriptOutcome>;

    /// 按学生/科目查询答卷记录
    async fn find_scripts(&self, student_id: &str, subject_id: &str) -> ApiResult<Vec<ScriptRecord>>;

    /// 保存单页图片
    async fn save_page_image(&self, request: &SavePageImageRequest) -> ApiResult<Value>;

    /// 启动后台任务
    async fn start_job(&self, job: SecondaryJob, request: &StartJobRequest) -> ApiResult<Value>;

    /// 查询后台任务状态
    async fn job_status(&self, job: SecondaryJob, script_id: &str) -> ApiResult<JobStatus>;

    /// 获取后台任务结果
    async fn job_result(&self, job: SecondaryJob, script_id: &str) -> ApiResult<Value>;

    /// 保存单页 OCR 结果及元数据
    async fn save_ocr(&self, request: &SaveOcrRequest) -> ApiResult<Value>;

    /// 调用增强链中的一个阶段
    async fn enrich(&self, stage: EnrichmentStage, subject_id: &str, script_id: &str) -> ApiResult<Value>;
}
