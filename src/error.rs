//! 错误类型
//!
//! 按来源分组：输入校验 / API / 图片 / 流程 / 文件 / 配置。
//! 流程层根据 `PipelineError` 与阶段策略决定是中止还是记录警告。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验错误（不会发起任何网络请求）
    #[error("输入校验失败: {0}")]
    Validation(#[from] ValidationError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 图片处理错误
    #[error("图片处理错误: {0}")]
    Image(#[from] ImageError),
    /// 流程错误（致命阶段失败）
    #[error("流程错误: {0}")]
    Pipeline(#[from] PipelineError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 输入校验错误
#[derive(Debug, Error)]
pub enum ValidationError {
    /// 上传的文件不是 PDF
    #[error("请选择 PDF 文件 (收到: {file_name})")]
    NotPdf { file_name: String },
    /// 缺少班级/科目/学生选择
    #[error("请先选择{field}")]
    MissingSelection { field: &'static str },
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// API 返回非 2xx 响应
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 图片处理错误
#[derive(Debug, Error)]
pub enum ImageError {
    /// base64 解码失败
    #[error("base64 解码失败: {0}")]
    Base64(#[from] base64::DecodeError),
    /// 图片解码/编码失败
    #[error("图片编解码失败: {0}")]
    Codec(#[from] image::ImageError),
}

/// 流程错误
#[derive(Debug, Error)]
pub enum PipelineError {
    /// PDF 转图片失败
    #[error("PDF 转图片失败: {0}")]
    ConversionFailed(#[source] ApiError),
    /// 会话中没有源文件
    #[error("尚未选择文件")]
    MissingSource,
    /// 转换服务没有返回任何页面
    #[error("PDF 转换结果为空")]
    NoImages,
    /// 无法创建或找回答卷记录
    #[error("无法创建答卷记录: {0}")]
    ScriptCreationFailed(#[source] ApiError),
    /// 记录已存在，但按学生/科目查不到
    #[error("答卷记录已存在但无法找回 (学生: {student_id}, 科目: {subject_id})")]
    ScriptNotResolved {
        student_id: String,
        subject_id: String,
    },
    /// OCR 失败（任意一页失败即中止）
    #[error("OCR 处理失败 (第 {page_number} 页): {source}")]
    OcrFailed {
        page_number: u32,
        #[source]
        source: ApiError,
    },
    /// 缺少答卷ID
    #[error("缺少答卷ID，无法保存 OCR 结果")]
    MissingScriptId,
    /// 缺少 OCR 结果
    #[error("没有可保存的 OCR 结果")]
    MissingOcrResults,
    /// 保存 OCR 结果失败
    #[error("保存 OCR 结果失败 (第 {page_number} 页): {source}")]
    OcrSaveFailed {
        page_number: u32,
        #[source]
        source: ApiError,
    },
    /// 后台任务启动失败
    #[error("后台任务 {job} 启动失败: {source}")]
    JobStartFailed {
        job: &'static str,
        #[source]
        source: ApiError,
    },
    /// 后台任务执行失败或超时
    #[error("后台任务 {job} 未完成: {reason}")]
    JobNotCompleted { job: &'static str, reason: String },
    /// 阻塞任务被中断
    #[error("后台线程执行失败: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 删除文件失败
    #[error("删除文件失败 ({path}): {source}")]
    DeleteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// TOML 序列化失败
    #[error("TOML序列化失败: {0}")]
    TomlSerializeFailed(#[from] toml::ser::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
    /// 未知的流程变体
    #[error("未知的流程变体: {0}")]
    UnknownVariant(String),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

impl ApiError {
    /// 创建非 2xx 响应错误
    pub fn bad_response(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ApiError::BadResponse {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// HTTP 状态码（仅 BadResponse 有）
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// API 调用结果类型
pub type ApiResult<T> = Result<T, ApiError>;
