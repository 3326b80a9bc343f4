//! 更新传输层：调用部署程序 `Update.exe` 拉取并应用新版本

use crate::utils::app_info::{AppLocation, SpecialDirectory};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;

/// 部署程序文件名
pub const UPDATE_EXE_NAME: &str = "Update.exe";

const GITHUB_API_BASE: &str = "https://api.github.com";

/// 更新传输接口
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    /// 从本地目录或网络共享目录更新
    async fn update_from_path(&self, path: &str) -> Result<()>;

    /// 从 GitHub 仓库的 Releases 更新
    async fn update_from_repository(&self, repo_url: &str, prerelease: bool) -> Result<()>;
}

/// 基于 `Update.exe --update` 的默认传输实现
#[derive(Debug, Clone)]
pub struct UpdateExeTransport {
    app: AppLocation,
}

impl UpdateExeTransport {
    pub fn new(app: AppLocation) -> Self {
        Self { app }
    }

    fn update_exe(&self) -> PathBuf {
        self.app
            .directory(SpecialDirectory::ApplicationRootDirectory)
            .join(UPDATE_EXE_NAME)
    }

    async fn run_update_exe(&self, source: &str) -> Result<()> {
        let update_exe = self.update_exe();
        if !update_exe.is_file() {
            bail!("未找到部署程序: {}", update_exe.display());
        }

        tracing::info!(update_exe = ?update_exe, source = %source, "开始执行更新");
        let status = Command::new(&update_exe)
            .arg("--update")
            .arg(source)
            .status()
            .await
            .with_context(|| format!("启动 {} 失败", update_exe.display()))?;

        if !status.success() {
            let code = status
                .code()
                .map_or_else(|| "unknown".to_string(), |code| code.to_string());
            bail!("{UPDATE_EXE_NAME} 退出码异常: {code}");
        }

        tracing::info!(source = %source, "更新执行完成");
        Ok(())
    }
}

#[async_trait]
impl UpdateTransport for UpdateExeTransport {
    async fn update_from_path(&self, path: &str) -> Result<()> {
        self.run_update_exe(path).await
    }

    async fn update_from_repository(&self, repo_url: &str, prerelease: bool) -> Result<()> {
        let download_url = resolve_release_download_url(repo_url, prerelease)
            .await
            .with_context(|| format!("解析 {repo_url} 的发布地址失败"))?;
        self.run_update_exe(&download_url).await
    }
}

/// GitHub Releases API 返回的发布信息（仅取用到的字段）
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub html_url: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// 查询仓库最新发布的下载地址
async fn resolve_release_download_url(repo_url: &str, prerelease: bool) -> Result<String> {
    let (owner, repo) = parse_repository(repo_url)?;
    let client = crate::http_client::build_client().context("创建 HTTP 客户端失败")?;

    let api_url = format!("{GITHUB_API_BASE}/repos/{owner}/{repo}/releases");
    tracing::debug!(api_url = %api_url, "查询 GitHub Releases");

    let response = client
        .get(&api_url)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .send()
        .await
        .context("请求 GitHub Releases 失败")?;

    if !response.status().is_success() {
        bail!("GitHub API 返回状态码: {}", response.status());
    }

    let releases: Vec<GitHubRelease> = response
        .json()
        .await
        .context("解析 GitHub Releases 响应失败")?;

    let release = select_release(&releases, prerelease)
        .ok_or_else(|| anyhow!("仓库 {owner}/{repo} 没有可用的发布版本"))?;
    Ok(release_download_url(release))
}

/// 从仓库地址解析 owner 与 repo（容忍 `.git` 后缀和末尾斜杠）
pub fn parse_repository(repo_url: &str) -> Result<(String, String)> {
    let url = url::Url::parse(repo_url).with_context(|| format!("无效的仓库地址: {repo_url}"))?;

    let mut segments = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty());

    match (segments.next(), segments.next()) {
        (Some(owner), Some(repo)) => Ok((
            owner.to_string(),
            repo.trim_end_matches(".git").to_string(),
        )),
        _ => bail!("仓库地址缺少 owner/repo: {repo_url}"),
    }
}

/// 选择最新的发布版本；不接受预发布版本时跳过预发布
pub fn select_release(releases: &[GitHubRelease], prerelease: bool) -> Option<&GitHubRelease> {
    releases
        .iter()
        .filter(|release| prerelease || !release.prerelease)
        .max_by_key(|release| release.published_at)
}

/// 发布页地址转换为下载根地址：`/releases/tag/v1.0` → `/releases/download/v1.0`
pub fn release_download_url(release: &GitHubRelease) -> String {
    release.html_url.replace("/tag/", "/download/")
}
