//! # TransGrade Upload
//!
//! 答卷上传流水线：PDF → 图片 → 压缩 → 答卷记录 → OCR → 后台深度处理 → 保存 → AI 增强
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 HTTP 客户端，只暴露 JSON / multipart 请求能力
//! - `HttpExecutor` - 统一的状态码检查与错误信息提取
//!
//! ### ② 客户端层（Clients）
//! - `GradingBackend` - 流水线访问外部服务的唯一接口
//! - `HttpBackend` - 各服务 REST 接口的生产实现
//!
//! ### ③ 业务能力层（Services）
//! - `ImageCompressor` - 超阈值页面的 JPEG 重新编码
//! - `JobPoller` - 后台任务状态轮询
//! - `ScriptRegistry` - 创建或找回答卷记录
//! - `WarnWriter` - 写 warn.txt 能力
//!
//! ### ④ 流程层（Workflow）
//! - `UploadCtx` - 上下文封装（班级 + 科目 + 学生 + 变体）
//! - `UploadSession` - 不可变会话快照
//! - `UploadFlow` - 8 个阶段的顺序执行与失败策略
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/upload_orchestrator` - 单个上传，发布进度快照
//! - `orchestrator/batch_processor` - 批量上传，管理并发和报告
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{GradingBackend, HttpBackend};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::HttpExecutor;
pub use models::{PipelineVariant, SelectionContext, SourceFile};
pub use orchestrator::{App, UploadOrchestrator};
pub use workflow::{UploadCtx, UploadFlow, UploadSession};
