//! 批量上传处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量上传的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：读取选择交接文件、创建评分后端和取消令牌
//! 2. **批量加载**：扫描输入目录中的所有文件
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **结果落盘**：每个会话写一份 JSON 报告，警告追加到 warn.txt
//! 6. **全局统计**：汇总所有上传的处理结果
//! 7. **中断**：取消令牌触发后中止当前批次并停止，Ctrl+C 第二次直接退出进程

use crate::clients::{GradingBackend, HttpBackend};
use crate::config::Config;
use crate::models::{SelectionContext, SelectionStore, SourceFile};
use crate::orchestrator::UploadOrchestrator;
use crate::services::WarnWriter;
use crate::utils::logging;
use crate::workflow::{UploadFlow, UploadSession};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    selection: SelectionContext,
    flow: Arc<UploadFlow>,
    warn_writer: Arc<WarnWriter>,
    cancel: CancellationToken,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(config.variant.name(), config.max_concurrent_uploads);

        // 读取一次后清除
        let selection = match SelectionStore::new(&config.selection_file).take().await? {
            Some(selection) => selection,
            None => {
                warn!("⚠️ 没有找到选择文件 {}，所有上传都会因缺少选择而失败", config.selection_file);
                SelectionContext::default()
            }
        };

        let backend: Arc<dyn GradingBackend> = Arc::new(HttpBackend::from_config(&config));
        Ok(Self::with_backend(config, selection, backend))
    }

    /// 使用指定后端创建（测试用）
    pub fn with_backend(config: Config, selection: SelectionContext, backend: Arc<dyn GradingBackend>) -> Self {
        let cancel = CancellationToken::new();
        let flow = UploadFlow::new(backend, &config).with_cancellation(cancel.clone());

        Self {
            config,
            selection,
            flow: Arc::new(flow),
            warn_writer: Arc::new(WarnWriter::new()),
            cancel,
        }
    }

    /// 取消令牌：触发后轮询停止，进行中的批次被中止
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn with_warn_writer(mut self, warn_writer: WarnWriter) -> Self {
        self.warn_writer = Arc::new(warn_writer);
        self
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        let files = self.load_files().await?;

        if files.is_empty() {
            warn!("⚠️ 没有找到待上传的文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        logging::log_files_loaded(files.len(), self.config.max_concurrent_uploads);

        tokio::fs::create_dir_all(&self.config.report_folder)
            .await
            .with_context(|| format!("无法创建报告目录: {}", self.config.report_folder))?;

        let stats = self.process_all_files(files).await?;
        if stats.cancelled {
            warn!("⚠️ 处理被中断，以下统计不完整");
        }

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.with_warnings,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(stats)
    }

    /// 扫描输入目录（按文件名排序）
    async fn load_files(&self) -> Result<Vec<PathBuf>> {
        info!("\n📁 正在扫描待上传的文件: {}", self.config.input_folder);

        let mut entries = tokio::fs::read_dir(&self.config.input_folder)
            .await
            .with_context(|| format!("无法读取输入目录: {}", self.config.input_folder))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// 处理所有文件
    async fn process_all_files(&self, files: Vec<PathBuf>) -> Result<ProcessingStats> {
        let max_concurrent = self.config.max_concurrent_uploads.max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = files.len();
        let total_batches = total.div_ceil(max_concurrent);
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for (batch_idx, batch) in files.chunks(max_concurrent).enumerate() {
            let batch_start = batch_idx * max_concurrent;
            logging::log_batch_start(batch_idx + 1, total_batches, batch_start + 1, batch_start + batch.len(), total);

            let batch_result = self.process_batch(batch, batch_start, semaphore.clone()).await?;

            stats.success += batch_result.success;
            stats.failed += batch_result.failed;
            stats.with_warnings += batch_result.with_warnings;

            if batch_result.cancelled {
                stats.cancelled = true;
                warn!("⚠️ 已中断，剩余 {} 个文件未处理", total - batch_start - batch.len());
                break;
            }

            logging::log_batch_complete(batch_idx + 1, batch_result.success, batch.len());
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(&self, batch: &[PathBuf], batch_start: usize, semaphore: Arc<Semaphore>) -> Result<BatchResult> {
        let mut handles = Vec::new();

        for (idx, path) in batch.iter().enumerate() {
            let upload_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let path = path.clone();
            let flow = self.flow.clone();
            let variant = self.config.variant;
            let selection = self.selection.clone();
            let report_folder = PathBuf::from(&self.config.report_folder);
            let warn_writer = self.warn_writer.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let orchestrator = UploadOrchestrator::new(flow, variant).with_index(upload_index);
                let session = process_file(&orchestrator, &path, &selection).await?;
                save_report(&report_folder, &path, &session).await?;
                if let Some(name) = session.file_name() {
                    warn_writer.write(name, &session.warnings).await?;
                }
                Ok::<_, anyhow::Error>(session)
            });
            handles.push((upload_index, handle));
        }

        let abort_handles: Vec<_> = handles.iter().map(|(_, handle)| handle.abort_handle()).collect();

        // 等待本批所有任务完成，或被取消
        let outcomes = tokio::select! {
            outcomes = join_all(
                handles
                    .into_iter()
                    .map(|(upload_index, handle)| async move { (upload_index, handle.await) }),
            ) => outcomes,
            _ = self.cancel.cancelled() => {
                warn!("⚠️ 收到取消信号，中止本批 {} 个上传", abort_handles.len());
                for handle in &abort_handles {
                    handle.abort();
                }
                return Ok(BatchResult {
                    failed: batch.len(),
                    cancelled: true,
                    ..Default::default()
                });
            }
        };

        let mut result = BatchResult::default();
        for (upload_index, outcome) in outcomes {
            match outcome {
                Ok(Ok(session)) if session.is_complete() => {
                    result.success += 1;
                    if !session.warnings.is_empty() {
                        result.with_warnings += 1;
                    }
                }
                Ok(Ok(session)) => {
                    error!(
                        "[上传 {}] ❌ 处理失败: {}",
                        upload_index,
                        session.error.as_deref().unwrap_or("未知错误")
                    );
                    result.failed += 1;
                }
                Ok(Err(e)) => {
                    error!("[上传 {}] ❌ 处理过程中发生错误: {:#}", upload_index, e);
                    result.failed += 1;
                }
                Err(e) => {
                    error!("[上传 {}] 任务执行失败: {}", upload_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 读取文件并交给单个上传处理器
async fn process_file(orchestrator: &UploadOrchestrator, path: &Path, selection: &SelectionContext) -> Result<UploadSession> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("读取文件失败: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(orchestrator.start(SourceFile::new(name, bytes), selection).await)
}

/// 写入会话报告：{report_folder}/{文件名去扩展名}.json
async fn save_report(report_folder: &Path, path: &Path, session: &UploadSession) -> Result<()> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let report_path = report_folder.join(format!("{}.json", stem));

    let content = serde_json::to_string_pretty(&session.report())?;
    tokio::fs::write(&report_path, content)
        .await
        .with_context(|| format!("写入报告失败: {}", report_path.display()))?;
    Ok(())
}

/// Ctrl+C 处理
///
/// 第一次触发取消令牌，让 `App::run` 中止当前批次后返回；第二次直接退出进程。
pub fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("⚠️ 收到中断信号，正在停止（再按一次 Ctrl+C 立即退出）");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            error!("❌ 再次收到中断信号，立即退出");
            std::process::exit(130);
        }
    });
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub with_warnings: usize,
    pub total: usize,
    /// 是否被中断
    pub cancelled: bool,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
    with_warnings: usize,
    cancelled: bool,
}
