//! 上传处理流程 - 流程层
//!
//! 核心职责：定义"一份答卷"的完整处理流程
//!
//! 流程顺序（`PIPELINE`）：
//! 1. PDF 转图片（致命）
//! 2. 图片压缩（尽力）
//! 3. 创建/找回答卷记录（致命）
//! 4. 保存页面图片（尽力，逐页）
//! 5. OCR 识别（致命，逐页顺序执行）
//! 6. 后台深度处理 + 轮询（尽力）
//! 7. 保存 OCR 结果（致命）
//! 8. AI 增强链（尽力，每一步都执行）

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::clients::{GradingBackend, SaveOcrRequest, SavePageImageRequest, StartJobRequest};
use crate::config::Config;
use crate::error::{AppResult, PipelineError};
use crate::models::{CombinedOcr, EnrichmentStage, OcrResult, Stage, TERMINAL_STEP};
use crate::services::{ImageCompressor, JobPoller, PollPolicy, ScriptRegistry, Sleeper, TokioSleeper};
use crate::workflow::session::{StageOutput, StageResult, UploadSession};
use crate::workflow::upload_ctx::UploadCtx;

/// 阶段失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePolicy {
    /// 中止流程并记录错误
    Fatal,
    /// 记录警告后继续
    BestEffort,
}

/// 流水线中的一个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDef {
    pub stage: Stage,
    pub policy: StagePolicy,
}

/// 固定的阶段顺序与策略
pub const PIPELINE: [StageDef; 8] = [
    StageDef { stage: Stage::ConvertToImages, policy: StagePolicy::Fatal },
    StageDef { stage: Stage::Compress, policy: StagePolicy::BestEffort },
    StageDef { stage: Stage::PersistScript, policy: StagePolicy::Fatal },
    StageDef { stage: Stage::PersistImages, policy: StagePolicy::BestEffort },
    StageDef { stage: Stage::Ocr, policy: StagePolicy::Fatal },
    StageDef { stage: Stage::Secondary, policy: StagePolicy::BestEffort },
    StageDef { stage: Stage::PersistOcr, policy: StagePolicy::Fatal },
    StageDef { stage: Stage::Enrichment, policy: StagePolicy::BestEffort },
];

/// 后台任务启动参数
#[derive(Debug, Clone, Copy)]
struct JobOptions {
    use_api: bool,
    force_process: bool,
}

/// 上传处理流程
///
/// - 编排完整的上传处理流程
/// - 决定哪些阶段失败即中止、哪些失败后继续
/// - 不持有会话状态，每个阶段读快照、产出结果
pub struct UploadFlow {
    backend: Arc<dyn GradingBackend>,
    compressor: ImageCompressor,
    poller: JobPoller<Arc<dyn Sleeper>>,
    job_options: JobOptions,
    cancel: CancellationToken,
}

impl UploadFlow {
    /// 创建新的上传处理流程
    pub fn new(backend: Arc<dyn GradingBackend>, config: &Config) -> Self {
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
        Self {
            backend,
            compressor: ImageCompressor::new(config.size_threshold()),
            poller: JobPoller::with_sleeper(
                PollPolicy::fixed(config.poll_interval(), config.poll_max_attempts),
                sleeper,
            ),
            job_options: JobOptions {
                use_api: config.deep_ocr_use_api,
                force_process: config.deep_ocr_force_process,
            },
            cancel: CancellationToken::new(),
        }
    }

    /// 替换等待实现（测试用虚拟时钟）
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        let policy = self.poller.policy().clone();
        self.poller = JobPoller::with_sleeper(policy, sleeper);
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poller = JobPoller::with_sleeper(policy, self.poller_sleeper());
        self
    }

    pub fn with_compressor(mut self, compressor: ImageCompressor) -> Self {
        self.compressor = compressor;
        self
    }

    /// 轮询的取消令牌
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn poller_sleeper(&self) -> Arc<dyn Sleeper> {
        self.poller.sleeper().clone()
    }

    /// 执行完整流程
    ///
    /// 每个阶段开始前和流程结束时回调 `on_progress`，传入当前快照。
    pub async fn run<F>(&self, mut session: UploadSession, ctx: &UploadCtx, mut on_progress: F) -> UploadSession
    where
        F: FnMut(&UploadSession) + Send,
    {
        for def in PIPELINE.iter() {
            session = session.advance_to(def.stage.step());
            on_progress(&session);

            info!(
                "{} {} 步骤 {}/{}: {}",
                ctx,
                def.stage.icon(),
                def.stage.step(),
                PIPELINE.len(),
                def.stage.name()
            );

            match self.run_stage(def.stage, &session, ctx).await {
                Ok(result) => {
                    for warning in &result.warnings {
                        warn!("{} ⚠️ {}", ctx, warning);
                    }
                    session = session.apply(result);
                }
                Err(e) => match def.policy {
                    StagePolicy::Fatal => {
                        error!("{} ❌ {} 失败，流程中止: {}", ctx, def.stage.name(), e);
                        let session = session.fail(e.to_string());
                        on_progress(&session);
                        return session;
                    }
                    StagePolicy::BestEffort => {
                        warn!("{} ⚠️ {} 失败，继续后续步骤: {}", ctx, def.stage.name(), e);
                        session = session.warn(format!("{}: {}", def.stage.name(), e));
                    }
                },
            }
        }

        session = session.advance_to(TERMINAL_STEP);
        on_progress(&session);
        info!("{} ✅ 全部步骤完成", ctx);
        session
    }

    /// 执行单个阶段（只读快照）
    pub async fn run_stage(&self, stage: Stage, session: &UploadSession, ctx: &UploadCtx) -> AppResult<StageResult> {
        match stage {
            Stage::ConvertToImages => self.convert_to_images(session).await,
            Stage::Compress => self.compress_images(session).await,
            Stage::PersistScript => self.persist_script(ctx).await,
            Stage::PersistImages => self.persist_images(session).await,
            Stage::Ocr => self.extract_text(session, ctx).await,
            Stage::Secondary => self.run_secondary(session, ctx).await,
            Stage::PersistOcr => self.persist_ocr(session, ctx).await,
            Stage::Enrichment => self.enrich(session, ctx).await,
        }
    }

    // ========== 各阶段实现 ==========

    async fn convert_to_images(&self, session: &UploadSession) -> AppResult<StageResult> {
        let source = session.source().ok_or(PipelineError::MissingSource)?;

        let converted = self
            .backend
            .convert_pdf(source)
            .await
            .map_err(PipelineError::ConversionFailed)?;

        if converted.is_empty() {
            return Err(PipelineError::NoImages.into());
        }

        let images: Vec<_> = converted
            .into_iter()
            .enumerate()
            .map(|(index, image)| image.into_page(index as u32 + 1))
            .collect();

        info!("✓ PDF 转换完成，共 {} 页", images.len());
        Ok(StageResult::new(StageOutput::Images(images)))
    }

    async fn compress_images(&self, session: &UploadSession) -> AppResult<StageResult> {
        let images = session.images.clone();
        let oversized = images.iter().filter(|p| self.compressor.needs_compression(p)).count();
        if oversized == 0 {
            info!("✓ 所有页面均在 {} 字节以内，无需压缩", self.compressor.threshold());
            return Ok(StageResult::new(StageOutput::Compressed(images)));
        }

        // 重新编码是 CPU 密集操作，放到阻塞线程池
        let compressor = self.compressor.clone();
        let compressed = tokio::task::spawn_blocking(move || {
            images
                .into_iter()
                .map(|page| compressor.compress_page(page))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(PipelineError::TaskJoin)?;

        info!("✓ 压缩完成，处理了 {} 页", oversized);
        Ok(StageResult::new(StageOutput::Compressed(compressed)))
    }

    async fn persist_script(&self, ctx: &UploadCtx) -> AppResult<StageResult> {
        let script_id = ScriptRegistry::new(self.backend.as_ref())
            .create_or_find(&ctx.student_id, &ctx.subject_id)
            .await?;
        Ok(StageResult::new(StageOutput::Script(script_id)))
    }

    async fn persist_images(&self, session: &UploadSession) -> AppResult<StageResult> {
        let script_id = session.script_id.as_deref().ok_or(PipelineError::MissingScriptId)?;

        let mut saved = Vec::new();
        let mut warnings = Vec::new();

        for page in &session.images {
            let request = SavePageImageRequest {
                script_id: script_id.to_string(),
                page_number: page.page_number,
                image_data: page.data.clone(),
                image_filename: page.filename.clone(),
                image_path: page.image_path().to_string(),
            };

            match self.backend.save_page_image(&request).await {
                Ok(_) => saved.push(page.page_number),
                Err(e) => warnings.push(format!("第 {} 页图片保存失败: {}", page.page_number, e)),
            }
        }

        info!("✓ 已保存 {}/{} 页图片", saved.len(), session.images.len());
        Ok(StageResult::new(StageOutput::SavedImages(saved)).with_warnings(warnings))
    }

    async fn extract_text(&self, session: &UploadSession, ctx: &UploadCtx) -> AppResult<StageResult> {
        let total = session.images.len();
        let mut pages = Vec::with_capacity(total);

        // 逐页顺序请求，不并发、不重试
        for page in &session.images {
            info!("{} 🔍 OCR 第 {}/{} 页", ctx, page.page_number, total);
            let payload = self
                .backend
                .extract_text(&page.data)
                .await
                .map_err(|source| PipelineError::OcrFailed {
                    page_number: page.page_number,
                    source,
                })?;
            pages.push(OcrResult {
                page_number: page.page_number,
                payload,
            });
        }

        Ok(StageResult::new(StageOutput::Ocr(CombinedOcr::from_pages(pages))))
    }

    async fn run_secondary(&self, session: &UploadSession, ctx: &UploadCtx) -> AppResult<StageResult> {
        let script_id = session.script_id.as_deref().ok_or(PipelineError::MissingScriptId)?;
        let job = ctx.variant.secondary_job();

        let request = StartJobRequest {
            script_id: script_id.to_string(),
            use_api: self.job_options.use_api,
            force_process: self.job_options.force_process,
        };
        self.backend
            .start_job(job, &request)
            .await
            .map_err(|source| PipelineError::JobStartFailed { job: job.name(), source })?;

        info!("{} ⏳ 后台任务 {} 已启动，开始轮询", ctx, job.name());

        let backend = self.backend.as_ref();
        let outcome = self
            .poller
            .poll(move |_| backend.job_status(job, script_id), &self.cancel)
            .await;

        if !outcome.is_completed() {
            return Err(PipelineError::JobNotCompleted {
                job: job.name(),
                reason: outcome.describe(),
            }
            .into());
        }

        let result = backend.job_result(job, script_id).await.map_err(|e| PipelineError::JobNotCompleted {
            job: job.name(),
            reason: format!("获取结果失败: {}", e),
        })?;

        Ok(StageResult::new(StageOutput::Secondary(result)))
    }

    async fn persist_ocr(&self, session: &UploadSession, ctx: &UploadCtx) -> AppResult<StageResult> {
        let script_id = session.script_id.as_deref().ok_or(PipelineError::MissingScriptId)?;
        let ocr = session
            .ocr
            .as_ref()
            .filter(|ocr| !ocr.is_empty())
            .ok_or(PipelineError::MissingOcrResults)?;

        let context = json!({
            "student_id": ctx.student_id,
            "subject_id": ctx.subject_id,
            "class_id": ctx.class_id,
            "key_answer_available": ctx.key_answer_available,
            "variant": ctx.variant.name(),
            "file_name": ctx.file_name,
            "processed_at": chrono::Utc::now().to_rfc3339(),
        });

        let mut saved = Vec::with_capacity(ocr.total_pages);
        for page in &ocr.pages {
            let request = SaveOcrRequest {
                script_id: script_id.to_string(),
                page_number: page.page_number,
                ocr_json: page.payload.clone(),
                structured_json: json!({
                    "total_pages": ocr.total_pages,
                    "page_number": page.page_number,
                    "secondary": session.secondary,
                }),
                context: context.clone(),
            };

            self.backend
                .save_ocr(&request)
                .await
                .map_err(|source| PipelineError::OcrSaveFailed {
                    page_number: page.page_number,
                    source,
                })?;
            saved.push(page.page_number);
        }

        info!("✓ 已保存 {} 页 OCR 结果", saved.len());
        Ok(StageResult::new(StageOutput::SavedOcr(saved)))
    }

    async fn enrich(&self, session: &UploadSession, ctx: &UploadCtx) -> AppResult<StageResult> {
        let script_id = session.script_id.as_deref().ok_or(PipelineError::MissingScriptId)?;

        let mut results = BTreeMap::new();
        let mut warnings = Vec::new();

        // 每一步都执行，前一步失败不影响后一步
        for stage in EnrichmentStage::CHAIN {
            info!("{} 🤖 {}", ctx, stage.name());
            match self.backend.enrich(stage, &ctx.subject_id, script_id).await {
                Ok(value) => {
                    results.insert(stage, value);
                }
                Err(e) => warnings.push(format!("{} 失败: {}", stage.name(), e)),
            }
        }

        Ok(StageResult::new(StageOutput::Enrichment(results)).with_warnings(warnings))
    }
}
