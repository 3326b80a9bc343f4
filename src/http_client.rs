//! HTTP 客户端构建工具：统一在一个地方处理 User-Agent 与超时等配置。

use reqwest::Client;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 构建 reqwest::Client
///
/// 代理沿用 reqwest 默认行为（读取 HTTP_PROXY/HTTPS_PROXY/ALL_PROXY 环境变量）。
/// GitHub API 要求请求携带 User-Agent。
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()
}
