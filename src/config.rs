use crate::error::ConfigError;
use crate::models::PipelineVariant;
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时处理的上传会话数量
    pub max_concurrent_uploads: usize,
    /// 待上传 PDF 所在目录
    pub input_folder: String,
    /// 会话报告输出目录
    pub report_folder: String,
    /// 班级/科目/学生选择的交接文件
    pub selection_file: String,
    /// 流程变体（upload / key / math）
    pub variant: PipelineVariant,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- 服务地址 ---
    pub conversion_api_url: String,
    pub ocr_api_url: String,
    pub scripts_api_url: String,
    pub deep_ocr_api_url: String,
    pub math_api_url: String,
    pub mcq_api_url: String,
    pub enrichment_api_url: String,
    // --- 图片压缩 ---
    /// 覆盖变体默认的压缩阈值（字节）
    pub size_threshold_override: Option<usize>,
    // --- 后台任务轮询 ---
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
    pub deep_ocr_use_api: bool,
    pub deep_ocr_force_process: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: 4,
            input_folder: "input_pdf".to_string(),
            report_folder: "output_reports".to_string(),
            selection_file: "selection.toml".to_string(),
            variant: PipelineVariant::Upload,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            conversion_api_url: "http://localhost:5015".to_string(),
            ocr_api_url: "http://localhost:5016".to_string(),
            scripts_api_url: "http://localhost:8000".to_string(),
            deep_ocr_api_url: "http://localhost:5017".to_string(),
            math_api_url: "http://localhost:5018".to_string(),
            mcq_api_url: "http://localhost:5019".to_string(),
            enrichment_api_url: "http://localhost:5020".to_string(),
            size_threshold_override: None,
            poll_interval_secs: 5,
            poll_max_attempts: 60,
            deep_ocr_use_api: true,
            deep_ocr_force_process: false,
        }
    }
}

impl Config {
    /// 从环境变量加载，未设置的项使用默认值
    ///
    /// 设置了但无法解析的值视为配置错误，而不是静默回退。
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        Ok(Self {
            max_concurrent_uploads: parse_env("MAX_CONCURRENT_UPLOADS", "usize")?
                .unwrap_or(default.max_concurrent_uploads)
                .max(1),
            input_folder: std::env::var("INPUT_FOLDER").unwrap_or(default.input_folder),
            report_folder: std::env::var("REPORT_FOLDER").unwrap_or(default.report_folder),
            selection_file: std::env::var("SELECTION_FILE").unwrap_or(default.selection_file),
            variant: parse_env("PIPELINE_VARIANT", "upload|key|math")?.unwrap_or(default.variant),
            verbose_logging: parse_env("VERBOSE_LOGGING", "bool")?.unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            conversion_api_url: std::env::var("CONVERSION_API_URL").unwrap_or(default.conversion_api_url),
            ocr_api_url: std::env::var("OCR_API_URL").unwrap_or(default.ocr_api_url),
            scripts_api_url: std::env::var("SCRIPTS_API_URL").unwrap_or(default.scripts_api_url),
            deep_ocr_api_url: std::env::var("DEEP_OCR_API_URL").unwrap_or(default.deep_ocr_api_url),
            math_api_url: std::env::var("MATH_API_URL").unwrap_or(default.math_api_url),
            mcq_api_url: std::env::var("MCQ_API_URL").unwrap_or(default.mcq_api_url),
            enrichment_api_url: std::env::var("ENRICHMENT_API_URL").unwrap_or(default.enrichment_api_url),
            size_threshold_override: parse_env("SIZE_THRESHOLD_BYTES", "usize")?,
            poll_interval_secs: parse_env("POLL_INTERVAL_SECS", "u64")?.unwrap_or(default.poll_interval_secs),
            poll_max_attempts: parse_env("POLL_MAX_ATTEMPTS", "u32")?.unwrap_or(default.poll_max_attempts),
            deep_ocr_use_api: parse_env("DEEP_OCR_USE_API", "bool")?.unwrap_or(default.deep_ocr_use_api),
            deep_ocr_force_process: parse_env("DEEP_OCR_FORCE_PROCESS", "bool")?
                .unwrap_or(default.deep_ocr_force_process),
        })
    }

    /// 当前变体生效的压缩阈值（字节）
    pub fn size_threshold(&self) -> usize {
        self.size_threshold_override
            .unwrap_or_else(|| self.variant.size_threshold_bytes())
    }

    /// 轮询间隔
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn parse_env<T: FromStr>(var_name: &str, expected_type: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_follows_variant() {
        let mut config = Config::default();
        assert_eq!(config.size_threshold(), 4 * 1024 * 1024);

        config.variant = PipelineVariant::Math;
        assert_eq!(config.size_threshold(), 3_670_016);

        config.size_threshold_override = Some(1000);
        assert_eq!(config.size_threshold(), 1000);
    }

    #[test]
    fn default_polling_is_five_seconds_sixty_attempts() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.poll_max_attempts, 60);
    }
}
