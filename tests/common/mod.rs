#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use transgrade_upload::clients::{
    ConvertedImage, CreateScriptOutcome, GradingBackend, SaveOcrRequest, SavePageImageRequest, StartJobRequest,
};
use transgrade_upload::error::{ApiError, ApiResult};
use transgrade_upload::models::{EnrichmentStage, JobStatus, ScriptRecord, SecondaryJob, SourceFile};
use transgrade_upload::services::{PollPolicy, Sleeper};
use transgrade_upload::{Config, SelectionContext, UploadFlow};

/// 内存评分后端
#[derive(Default)]
pub struct FakeBackend {
    pub pages: usize,
    pub fail_convert: bool,
    /// 转换请求永不返回
    pub hang_convert: bool,
    pub fail_ocr_page: Option<usize>,
    pub fail_image_pages: HashSet<u32>,
    pub fail_save_ocr: bool,
    pub fail_enrich: HashSet<EnrichmentStage>,
    pub fail_start_job: bool,
    /// 创建答卷时总是返回冲突
    pub always_conflict: bool,
    pub job_statuses: Mutex<VecDeque<JobStatus>>,
    pub scripts: Mutex<Vec<ScriptRecord>>,
    pub calls: Mutex<Vec<String>>,
    pub saved_ocr: Mutex<Vec<SaveOcrRequest>>,
    pub ocr_calls: Mutex<usize>,
}

impl FakeBackend {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// 已有答卷记录（创建时返回冲突）
    pub fn with_existing_script(self, script_id: &str, student_id: &str, subject_id: &str) -> Self {
        self.scripts.lock().unwrap().push(ScriptRecord {
            script_id: script_id.to_string(),
            student_id: Some(student_id.to_string()),
            subject_id: Some(subject_id.to_string()),
        });
        self
    }

    pub fn with_job_statuses(self, statuses: Vec<JobStatus>) -> Self {
        *self.job_statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl GradingBackend for FakeBackend {
    async fn convert_pdf(&self, file: &SourceFile) -> ApiResult<Vec<ConvertedImage>> {
        self.record(format!("convert {}", file.name));
        if self.hang_convert {
            std::future::pending::<()>().await;
        }
        if self.fail_convert {
            return Err(ApiError::bad_response("/convert-pdf", 500, "conversion service down"));
        }
        Ok((1..=self.pages)
            .map(|n| ConvertedImage {
                data: "QUFBQQ==".to_string(),
                filename: format!("page_{}.png", n),
                path: Some(format!("/tmp/page_{}.png", n)),
            })
            .collect())
    }

    async fn extract_text(&self, _image_data: &str) -> ApiResult<Value> {
        let page = {
            let mut calls = self.ocr_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        self.record(format!("ocr {}", page));
        if self.fail_ocr_page == Some(page) {
            return Err(ApiError::bad_response("/extract-text", 500, "ocr engine crashed"));
        }
        Ok(json!({ "text": format!("page {} text", page) }))
    }

    async fn create_script(&self, student_id: &str, subject_id: &str) -> ApiResult<CreateScriptOutcome> {
        self.record("create_script");
        let mut scripts = self.scripts.lock().unwrap();
        if self.always_conflict || scripts.iter().any(|s| s.matches(student_id, subject_id)) {
            return Ok(CreateScriptOutcome::Conflict {
                message: "Script already exists".to_string(),
            });
        }
        let script_id = format!("script-{}", scripts.len() + 1);
        scripts.push(ScriptRecord {
            script_id: script_id.clone(),
            student_id: Some(student_id.to_string()),
            subject_id: Some(subject_id.to_string()),
        });
        Ok(CreateScriptOutcome::Created { script_id })
    }

    async fn find_scripts(&self, _student_id: &str, _subject_id: &str) -> ApiResult<Vec<ScriptRecord>> {
        self.record("find_scripts");
        Ok(self.scripts.lock().unwrap().clone())
    }

    async fn save_page_image(&self, request: &SavePageImageRequest) -> ApiResult<Value> {
        self.record(format!("save_image {}", request.page_number));
        if self.fail_image_pages.contains(&request.page_number) {
            return Err(ApiError::bad_response("/script-images", 500, "disk full"));
        }
        Ok(json!({ "status": "ok" }))
    }

    async fn start_job(&self, job: SecondaryJob, request: &StartJobRequest) -> ApiResult<Value> {
        self.record(format!("start_job {} {}", job.name(), request.script_id));
        if self.fail_start_job {
            return Err(ApiError::bad_response("/process", 503, "busy"));
        }
        Ok(json!({ "status": "processing" }))
    }

    async fn job_status(&self, job: SecondaryJob, _script_id: &str) -> ApiResult<JobStatus> {
        self.record(format!("job_status {}", job.name()));
        Ok(self.job_statuses.lock().unwrap().pop_front().unwrap_or(JobStatus::Completed))
    }

    async fn job_result(&self, job: SecondaryJob, script_id: &str) -> ApiResult<Value> {
        self.record(format!("job_result {}", job.name()));
        Ok(json!({ "job": job.name(), "script_id": script_id, "blocks": 3 }))
    }

    async fn save_ocr(&self, request: &SaveOcrRequest) -> ApiResult<Value> {
        self.record(format!("save_ocr {}", request.page_number));
        if self.fail_save_ocr {
            return Err(ApiError::bad_response("/ocr-results", 500, "db error"));
        }
        self.saved_ocr.lock().unwrap().push(request.clone());
        Ok(json!({ "status": "saved" }))
    }

    async fn enrich(&self, stage: EnrichmentStage, subject_id: &str, script_id: &str) -> ApiResult<Value> {
        self.record(format!("enrich {}", stage.path()));
        if self.fail_enrich.contains(&stage) {
            return Err(ApiError::bad_response(format!("/{}", stage.path()), 500, "model timeout"));
        }
        Ok(json!({ "stage": stage.path(), "subject": subject_id, "script": script_id }))
    }
}

/// 不真正等待，只记录时长
#[derive(Default)]
pub struct InstantSleeper {
    pub slept: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

pub fn selection() -> SelectionContext {
    SelectionContext::new("10A", "MATH-101", "stu-42")
}

pub fn pdf(name: &str) -> SourceFile {
    SourceFile::new(name, b"%PDF-1.7\n%test document\n".to_vec())
}

/// 使用内存后端和虚拟时钟的流程
pub fn flow(backend: Arc<FakeBackend>, sleeper: Arc<InstantSleeper>) -> UploadFlow {
    UploadFlow::new(backend, &Config::default())
        .with_sleeper(sleeper)
        .with_poll_policy(PollPolicy::fixed(Duration::from_secs(5), 60))
}
