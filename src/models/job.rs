use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 后台任务状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Processing,
    Completed,
    Failed(Option<String>),
}

impl JobStatus {
    /// 解析 `{ "status": "...", "error"?: "..." }`
    ///
    /// 未知状态按 processing 处理，继续轮询。
    pub fn from_response(value: &Value) -> Self {
        let status = value
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match status.as_str() {
            "completed" | "complete" | "done" => JobStatus::Completed,
            "failed" | "error" => JobStatus::Failed(
                value
                    .get("error")
                    .or_else(|| value.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string),
            ),
            _ => JobStatus::Processing,
        }
    }
}
