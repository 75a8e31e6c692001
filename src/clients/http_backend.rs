/// 评分后端 HTTP 客户端
///
/// 封装所有与外部评分服务相关的调用逻辑
use crate::clients::grading_backend::{
    ConvertedImage, CreateScriptOutcome, GradingBackend, SaveOcrRequest, SavePageImageRequest, StartJobRequest,
};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::infrastructure::HttpExecutor;
use crate::models::{CreatedScript, EnrichmentStage, JobStatus, ScriptRecord, SecondaryJob, SourceFile};
use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::debug;

/// 各服务的基础地址
#[derive(Debug, Clone)]
pub struct ServiceUrls {
    pub conversion: String,
    pub ocr: String,
    pub scripts: String,
    pub deep_ocr: String,
    pub math: String,
    pub mcq: String,
    pub enrichment: String,
}

impl ServiceUrls {
    pub fn from_config(config: &Config) -> Self {
        Self {
            conversion: trim_base(&config.conversion_api_url),
            ocr: trim_base(&config.ocr_api_url),
            scripts: trim_base(&config.scripts_api_url),
            deep_ocr: trim_base(&config.deep_ocr_api_url),
            math: trim_base(&config.math_api_url),
            mcq: trim_base(&config.mcq_api_url),
            enrichment: trim_base(&config.enrichment_api_url),
        }
    }

    fn job_base(&self, job: SecondaryJob) -> &str {
        match job {
            SecondaryJob::DeepOcr => &self.deep_ocr,
            SecondaryJob::MathConversion => &self.math,
            SecondaryJob::McqAnalysis => &self.mcq,
        }
    }
}

/// HTTP 评分后端
#[derive(Clone)]
pub struct HttpBackend {
    executor: HttpExecutor,
    urls: ServiceUrls,
}

#[derive(Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    images: Vec<ConvertedImage>,
}

impl HttpBackend {
    pub fn new(executor: HttpExecutor, urls: ServiceUrls) -> Self {
        Self { executor, urls }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(HttpExecutor::default(), ServiceUrls::from_config(config))
    }
}

#[async_trait]
impl GradingBackend for HttpBackend {
    async fn convert_pdf(&self, file: &SourceFile) -> ApiResult<Vec<ConvertedImage>> {
        let url = format!("{}/convert-pdf", self.urls.conversion);
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str("application/pdf")
            .map_err(|source| ApiError::RequestFailed {
                endpoint: url.clone(),
                source,
            })?;
        let form = Form::new().part("file", part);

        let value = self.executor.post_multipart(&url, form).await?;
        let response: ConvertResponse = HttpExecutor::decode(&url, value)?;
        debug!("转换得到 {} 页", response.images.len());
        Ok(response.images)
    }

    async fn extract_text(&self, image_data: &str) -> ApiResult<Value> {
        let url = format!("{}/extract-text", self.urls.ocr);
        self.executor.post_json(&url, &json!({ "image_data": image_data })).await
    }

    async fn create_script(&self, student_id: &str, subject_id: &str) -> ApiResult<CreateScriptOutcome> {
        let url = format!("{}/scripts", self.urls.scripts);
        let body = json!({ "student_id": student_id, "subject_id": subject_id });

        match self.executor.post_json(&url, &body).await {
            Ok(value) => {
                let created: CreatedScript = HttpExecutor::decode(&url, value)?;
                Ok(CreateScriptOutcome::Created {
                    script_id: created.script_id,
                })
            }
            Err(ApiError::BadResponse { status, message, .. }) if is_conflict(status, &message) => {
                Ok(CreateScriptOutcome::Conflict { message })
            }
            Err(e) => Err(e),
        }
    }

    async fn find_scripts(&self, student_id: &str, subject_id: &str) -> ApiResult<Vec<ScriptRecord>> {
        let url = format!("{}/scripts", self.urls.scripts);
        let value = self
            .executor
            .get_json(&url, &[("student_id", student_id), ("subject_id", subject_id)])
            .await?;

        // 有的版本直接返回数组，有的包在 { scripts: [...] } 里
        let list = match value {
            Value::Object(mut map) => map.remove("scripts").unwrap_or(Value::Array(Vec::new())),
            other => other,
        };
        HttpExecutor::decode(&url, list)
    }

    async fn save_page_image(&self, request: &SavePageImageRequest) -> ApiResult<Value> {
        let url = format!("{}/script-images", self.urls.scripts);
        self.executor.post_json(&url, request).await
    }

    async fn start_job(&self, job: SecondaryJob, request: &StartJobRequest) -> ApiResult<Value> {
        let url = format!("{}/process", self.urls.job_base(job));
        self.executor.post_json(&url, request).await
    }

    async fn job_status(&self, job: SecondaryJob, script_id: &str) -> ApiResult<JobStatus> {
        let url = format!("{}/status/{}", self.urls.job_base(job), script_id);
        let value = self.executor.get_json(&url, &[]).await?;
        Ok(JobStatus::from_response(&value))
    }

    async fn job_result(&self, job: SecondaryJob, script_id: &str) -> ApiResult<Value> {
        let url = format!("{}/result/{}", self.urls.job_base(job), script_id);
        self.executor.get_json(&url, &[]).await
    }

    async fn save_ocr(&self, request: &SaveOcrRequest) -> ApiResult<Value> {
        let url = format!("{}/ocr-results", self.urls.scripts);
        self.executor.post_json(&url, request).await
    }

    async fn enrich(&self, stage: EnrichmentStage, subject_id: &str, script_id: &str) -> ApiResult<Value> {
        let url = format!("{}/{}/{}/{}", self.urls.enrichment, stage.path(), subject_id, script_id);
        self.executor.get_json(&url, &[]).await
    }
}

/// 判断创建答卷时的"已存在"冲突
///
/// 优先看 409；旧版服务只返回 400 + "already exists" 文本。
pub fn is_conflict(status: u16, message: &str) -> bool {
    static ALREADY_EXISTS: OnceLock<Option<Regex>> = OnceLock::new();
    if status == 409 {
        return true;
    }
    ALREADY_EXISTS
        .get_or_init(|| Regex::new(r"(?i)already\s+exists").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(message))
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
