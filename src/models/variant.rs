use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 流程变体
///
/// 三个上传页面共享同一条流水线，只在压缩阈值和后台任务上不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    /// 学生答卷上传（深度 OCR）
    Upload,
    /// 标准答案上传（选择题分析）
    Key,
    /// 数学答卷上传（公式识别）
    Math,
}

impl PipelineVariant {
    /// 压缩阈值（字节）
    pub fn size_threshold_bytes(self) -> usize {
        match self {
            PipelineVariant::Upload | PipelineVariant::Key => 4 * 1024 * 1024,
            PipelineVariant::Math => 3_670_016, // 3.5 MB
        }
    }

    /// OCR 之后运行的后台任务
    pub fn secondary_job(self) -> SecondaryJob {
        match self {
            PipelineVariant::Upload => SecondaryJob::DeepOcr,
            PipelineVariant::Key => SecondaryJob::McqAnalysis,
            PipelineVariant::Math => SecondaryJob::MathConversion,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PipelineVariant::Upload => "upload",
            PipelineVariant::Key => "key",
            PipelineVariant::Math => "math",
        }
    }
}

impl FromStr for PipelineVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upload" | "script" => Ok(PipelineVariant::Upload),
            "key" | "answer-key" => Ok(PipelineVariant::Key),
            "math" => Ok(PipelineVariant::Math),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

/// 需要轮询的长时间后台任务
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryJob {
    /// Textract 风格的深度 OCR
    DeepOcr,
    /// 数学公式转换
    MathConversion,
    /// 选择题分析
    McqAnalysis,
}

impl SecondaryJob {
    pub fn name(self) -> &'static str {
        match self {
            SecondaryJob::DeepOcr => "deep_ocr",
            SecondaryJob::MathConversion => "math_conversion",
            SecondaryJob::McqAnalysis => "mcq_analysis",
        }
    }
}
