//! HTTP 执行器 - 基础设施层
//!
//! 持有唯一的 reqwest::Client，只暴露"发请求拿 JSON"的能力

use crate::error::{ApiError, ApiResult};
use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

/// HTTP 执行器
///
/// 职责：
/// - 持有 Client（内部是 Arc，可以廉价 clone）
/// - 把非 2xx 响应统一转换成 `ApiError::BadResponse`
/// - 不认识答卷 / 页面 / OCR
#[derive(Clone, Default)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// GET 请求
    pub async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> ApiResult<JsonValue> {
        debug!("GET {}", url);
        self.send(url, self.client.get(url).query(query)).await
    }

    /// POST JSON 请求
    pub async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> ApiResult<JsonValue> {
        debug!("POST {}", url);
        self.send(url, self.client.post(url).json(body)).await
    }

    /// POST multipart 表单
    pub async fn post_multipart(&self, url: &str, form: multipart::Form) -> ApiResult<JsonValue> {
        debug!("POST (multipart) {}", url);
        self.send(url, self.client.post(url).multipart(form)).await
    }

    /// 反序列化为指定类型
    pub fn decode<T: DeserializeOwned>(endpoint: &str, value: JsonValue) -> ApiResult<T> {
        serde_json::from_value(value).map_err(|source| ApiError::JsonParseFailed {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> ApiResult<JsonValue> {
        let response = request.send().await.map_err(|source| ApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(ApiError::bad_response(endpoint, status.as_u16(), error_message(&body)));
        }

        if body.trim().is_empty() {
            return Ok(JsonValue::Null);
        }

        serde_json::from_str(&body).map_err(|source| ApiError::JsonParseFailed {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

/// 从错误响应体中提取可读信息
///
/// 常见形态：`{"error": ...}`、`{"detail": ...}`、`{"message": ...}`，否则用原文。
pub fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<JsonValue>(body) {
        for key in ["error", "detail", "message"] {
            match json.get(key) {
                Some(JsonValue::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    crate::utils::truncate_text(body.trim(), 200)
}
