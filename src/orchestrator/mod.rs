//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和进度发布，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量上传处理器
//! - 管理应用生命周期（初始化、运行）
//! - 扫描输入目录
//! - 控制并发数量（Semaphore）
//! - 写入会话报告和警告
//! - 输出全局统计信息
//!
//! ### `upload_orchestrator` - 单个上传处理器
//! - 校验输入（PDF、选择）
//! - 持有会话快照并通过 watch 通道发布进度
//! - 委托 `UploadFlow` 执行各阶段
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<文件>)
//!     ↓
//! upload_orchestrator (处理单个文件，发布快照)
//!     ↓
//! workflow::UploadFlow (8 个阶段)
//!     ↓
//! services (能力层：压缩 / 轮询 / 答卷记录 / warn)
//!     ↓
//! clients → infrastructure (HttpExecutor)
//! ```

pub mod batch_processor;
pub mod upload_orchestrator;

// 重新导出主要类型
pub use batch_processor::{spawn_ctrl_c_handler, App, ProcessingStats};
pub use upload_orchestrator::UploadOrchestrator;
