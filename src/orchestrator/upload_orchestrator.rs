//! 单个上传处理器 - 编排层
//!
//! ## 职责
//!
//! 持有一个上传会话的最新快照，并通过 watch 通道向观察者发布进度。
//!
//! ## 核心功能
//!
//! 1. **输入校验**：非 PDF 或缺少选择时只记录错误，不发起任何请求
//! 2. **会话重建**：每次开始都从全新的会话出发
//! 3. **进度发布**：每个阶段开始和流程结束时推送快照
//! 4. **重置**：回到初始状态

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{AppError, ValidationError};
use crate::models::{PipelineVariant, SelectionContext, SourceFile};
use crate::workflow::{UploadCtx, UploadFlow, UploadSession};

/// 单个上传处理器
pub struct UploadOrchestrator {
    flow: Arc<UploadFlow>,
    variant: PipelineVariant,
    upload_index: usize,
    state: watch::Sender<UploadSession>,
}

impl UploadOrchestrator {
    pub fn new(flow: Arc<UploadFlow>, variant: PipelineVariant) -> Self {
        let (state, _) = watch::channel(UploadSession::new());
        Self {
            flow,
            variant,
            upload_index: 1,
            state,
        }
    }

    /// 设置上传序号（仅用于日志）
    pub fn with_index(mut self, upload_index: usize) -> Self {
        self.upload_index = upload_index;
        self
    }

    /// 订阅进度快照
    pub fn subscribe(&self) -> watch::Receiver<UploadSession> {
        self.state.subscribe()
    }

    /// 当前快照
    pub fn current(&self) -> UploadSession {
        self.state.borrow().clone()
    }

    /// 回到初始状态
    pub fn reset(&self) {
        self.state.send_modify(|session| *session = std::mem::take(session).reset());
    }

    /// 处理一个文件
    ///
    /// 校验失败时会话保持原样，只记录错误；否则丢弃之前的结果从头开始。
    pub async fn start(&self, file: SourceFile, selection: &SelectionContext) -> UploadSession {
        let ctx = match self.validate(&file, selection) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("[上传 {}] ⚠️ {}", self.upload_index, e);
                let message = AppError::from(e).to_string();
                self.state
                    .send_modify(|session| *session = std::mem::take(session).fail(message));
                return self.current();
            }
        };

        info!("{} 📄 开始处理 {} ({} 字节)", ctx, file.name, file.size());

        let session = UploadSession::started(Arc::new(file));
        self.state.send_replace(session.clone());

        let state = &self.state;
        let finished = self
            .flow
            .run(session, &ctx, |snapshot| {
                state.send_replace(snapshot.clone());
            })
            .await;

        self.state.send_replace(finished.clone());
        finished
    }

    fn validate(&self, file: &SourceFile, selection: &SelectionContext) -> Result<UploadCtx, ValidationError> {
        if !file.is_pdf() {
            return Err(ValidationError::NotPdf {
                file_name: file.name.clone(),
            });
        }
        UploadCtx::from_selection(selection, self.variant, self.upload_index, file.name.clone())
    }
}
