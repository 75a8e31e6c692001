//! 上传会话快照
//!
//! 每个阶段产出一个 `StageResult`，由 `UploadSession::apply` 生成新的快照；
//! 流程层不直接改字段。步骤号只前进，出错后冻结，`reset` 回到初始状态。

use crate::models::{CombinedOcr, CompressionInfo, EnrichmentStage, PageImage, SourceFile, TERMINAL_STEP};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 单个阶段的产出
#[derive(Debug, Clone)]
pub enum StageOutput {
    /// PDF 转换得到的页面
    Images(Vec<PageImage>),
    /// 压缩后的页面（替换原页面）
    Compressed(Vec<PageImage>),
    /// 答卷ID
    Script(String),
    /// 成功保存图片的页码
    SavedImages(Vec<u32>),
    /// 合并后的 OCR
    Ocr(CombinedOcr),
    /// 后台任务结果
    Secondary(Value),
    /// 成功保存 OCR 的页码
    SavedOcr(Vec<u32>),
    /// 增强链各阶段结果（失败的阶段缺席）
    Enrichment(BTreeMap<EnrichmentStage, Value>),
}

/// 阶段产出 + 阶段内部的非致命警告
#[derive(Debug, Clone)]
pub struct StageResult {
    pub output: StageOutput,
    pub warnings: Vec<String>,
}

impl StageResult {
    pub fn new(output: StageOutput) -> Self {
        Self {
            output,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// 上传会话
#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    source: Option<Arc<SourceFile>>,
    step: usize,
    pub images: Vec<PageImage>,
    pub script_id: Option<String>,
    pub ocr: Option<CombinedOcr>,
    pub secondary: Option<Value>,
    pub saved_image_pages: Vec<u32>,
    pub saved_ocr_pages: Vec<u32>,
    pub enrichment: BTreeMap<EnrichmentStage, Value>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl UploadSession {
    /// 初始状态（未选择文件）
    pub fn new() -> Self {
        Self::default()
    }

    /// 选择文件后的全新会话，之前的结果全部丢弃
    pub fn started(source: Arc<SourceFile>) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn source(&self) -> Option<&SourceFile> {
        self.source.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.source().map(|s| s.name.as_str())
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.step == TERMINAL_STEP && self.error.is_none()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// 前进到指定步骤；出错后或目标不大于当前步骤时不变
    pub fn advance_to(mut self, step: usize) -> Self {
        if self.error.is_none() && step > self.step {
            self.step = step.min(TERMINAL_STEP);
        }
        self
    }

    /// 合并阶段产出
    pub fn apply(mut self, result: StageResult) -> Self {
        match result.output {
            StageOutput::Images(images) | StageOutput::Compressed(images) => self.images = images,
            StageOutput::Script(script_id) => self.script_id = Some(script_id),
            StageOutput::SavedImages(pages) => self.saved_image_pages = pages,
            StageOutput::Ocr(ocr) => self.ocr = Some(ocr),
            StageOutput::Secondary(value) => self.secondary = Some(value),
            StageOutput::SavedOcr(pages) => self.saved_ocr_pages = pages,
            StageOutput::Enrichment(results) => self.enrichment = results,
        }
        self.warnings.extend(result.warnings);
        self
    }

    /// 记录致命错误，步骤号就此冻结
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// 记录非致命警告
    pub fn warn(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }

    /// 回到初始状态
    pub fn reset(self) -> Self {
        Self::default()
    }

    /// 可写入 JSON 的摘要（不含图片数据）
    pub fn report(&self) -> SessionReport {
        SessionReport {
            file_name: self.file_name().map(str::to_string),
            step: self.step,
            complete: self.is_complete(),
            script_id: self.script_id.clone(),
            pages: self
                .images
                .iter()
                .map(|p| PageSummary {
                    page_number: p.page_number,
                    filename: p.filename.clone(),
                    compression: p.compression.clone(),
                })
                .collect(),
            saved_image_pages: self.saved_image_pages.clone(),
            saved_ocr_pages: self.saved_ocr_pages.clone(),
            ocr: self.ocr.clone(),
            secondary: self.secondary.clone(),
            enrichment: self.enrichment.clone(),
            error: self.error.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

/// 会话摘要
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub file_name: Option<String>,
    pub step: usize,
    pub complete: bool,
    pub script_id: Option<String>,
    pub pages: Vec<PageSummary>,
    pub saved_image_pages: Vec<u32>,
    pub saved_ocr_pages: Vec<u32>,
    pub ocr: Option<CombinedOcr>,
    pub secondary: Option<Value>,
    pub enrichment: BTreeMap<EnrichmentStage, Value>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub page_number: u32,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionInfo>,
}
