//! HTTP可达性探测器实现
//!
//! 对单个URL发起一次带超时的GET请求，不做重试

use crate::error::ProbeError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// 单次探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 请求成功且状态码为2xx/3xx
    Reachable,
    /// 超时、连接失败或错误状态码
    Unreachable {
        /// 可读的失败原因，仅用于日志
        reason: String,
    },
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        ProbeOutcome::Unreachable {
            reason: reason.into(),
        }
    }
}

/// 探测器trait
#[async_trait]
pub trait Prober: Send + Sync {
    /// 探测URL是否可达
    ///
    /// # 参数
    /// * `url` - 被探测的地址
    ///
    /// # 返回
    /// * `ProbeOutcome` - 探测结果，失败被视为结果而非错误
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP探测器实现
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// 单次请求超时时间
    timeout: Duration,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// # 参数
    /// * `timeout` - 单次请求超时时间
    /// * `user_agent` - 自定义User-Agent，为空时使用默认值
    ///
    /// # 返回
    /// * `Result<Self, ProbeError>` - 探测器实例
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, ProbeError> {
        let user_agent = user_agent
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", crate::APP_NAME, crate::VERSION));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, timeout })
    }

    /// 状态码是否视为可达
    fn is_reachable_status(status: reqwest::StatusCode) -> bool {
        status.is_success() || status.is_redirection()
    }

    /// 格式化请求错误信息，使其更加清晰易读
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            "Connection refused".to_string()
        } else if error.is_request() {
            "Invalid request".to_string()
        } else if let Some(status) = error.status() {
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        } else {
            let error_str = error.to_string();
            if error_str.contains("dns") || error_str.contains("DNS") {
                "DNS resolution failed".to_string()
            } else if error_str.contains("certificate")
                || error_str.contains("tls")
                || error_str.contains("ssl")
            {
                "SSL/TLS certificate error".to_string()
            } else {
                format!("Request failed: {}", error_str)
            }
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start_time = Instant::now();

        let response_result = timeout(self.timeout, self.client.get(url).send()).await;
        let elapsed_ms = start_time.elapsed().as_millis();

        let outcome = match response_result {
            Ok(Ok(response)) => {
                let status = response.status();
                if Self::is_reachable_status(status) {
                    ProbeOutcome::Reachable
                } else {
                    ProbeOutcome::unreachable(format!(
                        "HTTP {} {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    ))
                }
            }
            Ok(Err(e)) => ProbeOutcome::unreachable(Self::format_request_error(&e)),
            Err(_) => ProbeOutcome::unreachable("Request timeout"),
        };

        debug!(url, elapsed_ms = elapsed_ms as u64, ?outcome, "探测完成");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prober(timeout_ms: u64) -> HttpProber {
        HttpProber::new(Duration::from_millis(timeout_ms), None).unwrap()
    }

    #[tokio::test]
    async fn test_success_is_reachable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let outcome = prober(2000)
            .probe(&format!("{}/health", server.url()))
            .await;

        assert_eq!(outcome, ProbeOutcome::Reachable);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_redirect_status_is_reachable() {
        let mut server = mockito::Server::new_async().await;
        // 304 不带 Location，不会被跟随
        server
            .mock("GET", "/")
            .with_status(304)
            .create_async()
            .await;

        let outcome = prober(2000).probe(&server.url()).await;
        assert!(outcome.is_reachable());
    }

    #[tokio::test]
    async fn test_error_status_is_unreachable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/down")
            .with_status(503)
            .create_async()
            .await;

        let outcome = prober(2000)
            .probe(&format!("{}/down", server.url()))
            .await;

        match outcome {
            ProbeOutcome::Unreachable { reason } => assert!(reason.contains("HTTP 503")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_found_is_unreachable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let outcome = prober(2000)
            .probe(&format!("{}/missing", server.url()))
            .await;
        assert!(!outcome.is_reachable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // 端口1通常没有监听者
        let outcome = prober(1000).probe("http://127.0.0.1:1/").await;
        assert!(!outcome.is_reachable());
    }

    #[test]
    fn test_reachable_status_classes() {
        use reqwest::StatusCode;
        assert!(HttpProber::is_reachable_status(StatusCode::OK));
        assert!(HttpProber::is_reachable_status(StatusCode::NO_CONTENT));
        assert!(HttpProber::is_reachable_status(StatusCode::MOVED_PERMANENTLY));
        assert!(!HttpProber::is_reachable_status(StatusCode::NOT_FOUND));
        assert!(!HttpProber::is_reachable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!HttpProber::is_reachable_status(StatusCode::CONTINUE));
    }
}
