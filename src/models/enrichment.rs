use serde::{Deserialize, Serialize};

/// OCR 之后的 AI 增强链，按顺序执行，互不依赖
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStage {
    /// AI 批改
    Correction,
    /// 结构重整
    Restructure,
    /// 分析与评分
    Analysis,
    /// 校验与定稿
    Validation,
}

impl EnrichmentStage {
    pub const CHAIN: [EnrichmentStage; 4] = [
        EnrichmentStage::Correction,
        EnrichmentStage::Restructure,
        EnrichmentStage::Analysis,
        EnrichmentStage::Validation,
    ];

    /// 接口路径片段
    pub fn path(self) -> &'static str {
        match self {
            EnrichmentStage::Correction => "correct",
            EnrichmentStage::Restructure => "restructure",
            EnrichmentStage::Analysis => "analyze",
            EnrichmentStage::Validation => "validate",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EnrichmentStage::Correction => "AI 批改",
            EnrichmentStage::Restructure => "结构重整",
            EnrichmentStage::Analysis => "分析评分",
            EnrichmentStage::Validation => "校验定稿",
        }
    }
}
