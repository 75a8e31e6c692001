use serde::{Deserialize, Serialize};

/// 初始状态：尚未选择文件
pub const INITIAL_STEP: usize = 0;
/// 终止状态：流程完成，结果可查看
pub const TERMINAL_STEP: usize = 9;

/// 流水线阶段（顺序固定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ConvertToImages = 1,
    Compress = 2,
    PersistScript = 3,
    PersistImages = 4,
    Ocr = 5,
    Secondary = 6,
    PersistOcr = 7,
    Enrichment = 8,
}

impl Stage {
    /// 按执行顺序排列的全部阶段
    pub const ALL: [Stage; 8] = [
        Stage::ConvertToImages,
        Stage::Compress,
        Stage::PersistScript,
        Stage::PersistImages,
        Stage::Ocr,
        Stage::Secondary,
        Stage::PersistOcr,
        Stage::Enrichment,
    ];

    /// 阶段对应的步骤编号
    pub fn step(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::ConvertToImages => "PDF 转图片",
            Stage::Compress => "图片压缩",
            Stage::PersistScript => "创建答卷记录",
            Stage::PersistImages => "保存页面图片",
            Stage::Ocr => "OCR 识别",
            Stage::Secondary => "后台深度处理",
            Stage::PersistOcr => "保存 OCR 结果",
            Stage::Enrichment => "AI 批改与分析",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Stage::ConvertToImages => "📄",
            Stage::Compress => "🗜️",
            Stage::PersistScript => "🗂️",
            Stage::PersistImages => "🖼️",
            Stage::Ocr => "🔍",
            Stage::Secondary => "⏳",
            Stage::PersistOcr => "💾",
            Stage::Enrichment => "🤖",
        }
    }
}

/// 步骤的展示信息（静态，不随运行改变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepDescriptor {
    pub number: usize,
    pub name: &'static str,
    pub icon: &'static str,
}

/// 进度条使用的全部步骤描述（含完成状态）
pub fn step_descriptors() -> Vec<StepDescriptor> {
    Stage::ALL
        .iter()
        .map(|stage| StepDescriptor {
            number: stage.step(),
            name: stage.name(),
            icon: stage.icon(),
        })
        .chain(std::iter::once(StepDescriptor {
            number: TERMINAL_STEP,
            name: "完成",
            icon: "✅",
        }))
        .collect()
}
