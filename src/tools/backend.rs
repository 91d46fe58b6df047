//! 餐厅后端 HTTP 客户端
//!
//! 所有操作通过同一个 reqwest Client 调用后端 REST 接口；访问令牌随 ExecutionScope 按请求透传，不保存在客户端里。
//! 后端统一返回 `{"status": "200", "data": ..., "msg": ...}` 信封。

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::core::ChatError;
use crate::tools::ExecutionScope;

/// 后端响应信封
#[derive(Clone, Debug, PartialEq)]
pub struct BackendResponse(pub Value);

impl BackendResponse {
    /// status 为 "200"（字符串或数字）时视为成功
    pub fn is_ok(&self) -> bool {
        match self.0.get("status") {
            Some(Value::String(s)) => s == "200",
            Some(Value::Number(n)) => n.as_u64() == Some(200),
            _ => false,
        }
    }

    pub fn data(&self) -> &Value {
        self.0.get("data").unwrap_or(&Value::Null)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn msg(&self) -> Option<&str> {
        self.0.get("msg").and_then(Value::as_str)
    }

    /// 成功返回自身，失败时把后端 msg（或 fallback）拼成错误原因
    pub fn ensure_ok(self, context: &str, fallback: &str) -> Result<Self, String> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(format!("{context}: {}", self.msg().unwrap_or(fallback)))
        }
    }
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChatError::Config(format!("backend client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 发起一次调用；传输错误、非 2xx、非 JSON 响应都返回 Err
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        scope: &ExecutionScope,
    ) -> Result<BackendResponse, String> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = &scope.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, %url, "backend call");
        let response = request
            .send()
            .await
            .map_err(|e| format!("Backend API error: {e}"))?
            .error_for_status()
            .map_err(|e| format!("Backend API error: {e}"))?;

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| format!("Error calling backend: {e}"))?;
        Ok(BackendResponse(value))
    }

    pub async fn get(&self, endpoint: &str, scope: &ExecutionScope) -> Result<BackendResponse, String> {
        self.call(Method::GET, endpoint, None, scope).await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        body: Value,
        scope: &ExecutionScope,
    ) -> Result<BackendResponse, String> {
        self.call(Method::POST, endpoint, Some(&body), scope).await
    }

    pub async fn put(
        &self,
        endpoint: &str,
        body: Value,
        scope: &ExecutionScope,
    ) -> Result<BackendResponse, String> {
        self.call(Method::PUT, endpoint, Some(&body), scope).await
    }

    pub async fn delete(
        &self,
        endpoint: &str,
        body: Value,
        scope: &ExecutionScope,
    ) -> Result<BackendResponse, String> {
        self.call(Method::DELETE, endpoint, Some(&body), scope).await
    }
}

/// 测试用的单连接假后端：记录请求行与 JSON body，返回固定响应
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    /// 收到的请求：(请求行, 是否带 Authorization, body)
    pub type Captured = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    /// 启动假后端，对每个连接都返回 `reply`；返回 base_url 与请求记录
    pub async fn fake_backend(reply: Value) -> (String, Captured) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        let body = reply.to_string();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let (head, content_length) = loop {
                    let n = stream.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break (String::from_utf8_lossy(&buf).to_string(), 0);
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = find_header_end(&buf) {
                        let head = String::from_utf8_lossy(&buf[..pos]).to_string();
                        let len = header_value(&head, "content-length")
                            .and_then(|v| v.parse::<usize>().ok())
                            .unwrap_or(0);
                        buf.drain(..pos + 4);
                        break (head, len);
                    }
                };
                while buf.len() < content_length {
                    let n = stream.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }

                let request_line = head.lines().next().unwrap_or_default().to_string();
                let auth = header_value(&head, "authorization");
                let json = serde_json::from_slice(&buf).unwrap_or(Value::Null);
                sink.lock().await.push((request_line, auth, json));

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{addr}"), captured)
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    fn header_value(head: &str, name: &str) -> Option<String> {
        head.lines().skip(1).find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim()
                .eq_ignore_ascii_case(name)
                .then(|| v.trim().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_status_accepts_string_and_number() {
        assert!(BackendResponse(json!({"status": "200"})).is_ok());
        assert!(BackendResponse(json!({"status": 200})).is_ok());
        assert!(!BackendResponse(json!({"status": "error"})).is_ok());
        assert!(!BackendResponse(json!({})).is_ok());
    }

    #[test]
    fn test_ensure_ok_uses_backend_msg() {
        let err = BackendResponse(json!({"status": "400", "msg": "group has items"}))
            .ensure_ok("Failed to delete group", "Unknown error")
            .unwrap_err();
        assert_eq!(err, "Failed to delete group: group has items");
    }

    #[tokio::test]
    async fn test_post_sends_json_and_bearer_token() {
        let (base, captured) = testing::fake_backend(json!({"status": "200", "data": {}})).await;
        let client = BackendClient::new(&base, 5).unwrap();
        let scope = ExecutionScope {
            tenant_id: 1,
            owner_id: 2,
            access_token: Some("tok".into()),
        };
        let resp = client.post("/groups/", json!({"r_id": 1}), &scope).await.unwrap();
        assert!(resp.is_ok());

        let captured = captured.lock().await;
        assert_eq!(captured.len(), 1);
        assert!(captured[0].0.starts_with("POST /groups/"));
        assert_eq!(captured[0].1.as_deref(), Some("Bearer tok"));
        assert_eq!(captured[0].2, json!({"r_id": 1}));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_error() {
        let client = BackendClient::new("http://127.0.0.1:9", 2).unwrap();
        let err = client
            .get("/labels/", &ExecutionScope::default())
            .await
            .unwrap_err();
        assert!(err.starts_with("Backend API error"));
    }
}
