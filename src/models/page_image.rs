use serde::{Deserialize, Serialize};

/// PDF 的一页渲染结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    /// 页码（从1开始）
    pub page_number: u32,
    /// base64 编码的图片数据
    pub data: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// 压缩信息（未压缩时为空）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressionInfo>,
}

/// 压缩元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionInfo {
    /// 原始估算大小（字节）
    pub original_size: usize,
    /// 压缩后估算大小（字节）
    pub compressed_size: usize,
    /// 最后一次使用的 JPEG 质量（0.0 - 1.0）
    pub quality: f32,
    /// 最后一次使用的最大宽度
    pub max_width: u32,
    /// 实际应用的预设数量
    pub presets_applied: usize,
}

impl PageImage {
    pub fn new(page_number: u32, data: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            page_number,
            data: data.into(),
            filename: filename.into(),
            path: None,
            compression: None,
        }
    }

    /// 保存接口需要的路径字段，没有时退回文件名
    pub fn image_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.filename)
    }
}
