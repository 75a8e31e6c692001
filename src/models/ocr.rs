use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 单页 OCR 结果（内容不做解析，原样透传）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub page_number: u32,
    pub payload: Value,
}

/// 合并后的 OCR 文档，页面按页码升序
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CombinedOcr {
    pub total_pages: usize,
    pub pages: Vec<OcrResult>,
}

impl CombinedOcr {
    /// 合并各页结果
    ///
    /// 输入本身就是按页顺序逐页请求得到的，这里再按页码稳定排序一次。
    pub fn from_pages(mut pages: Vec<OcrResult>) -> Self {
        pages.sort_by_key(|p| p.page_number);
        Self {
            total_pages: pages.len(),
            pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.page_number).collect()
    }
}
