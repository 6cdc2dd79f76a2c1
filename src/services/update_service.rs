//! Firmware downloader
//!
//! Fetches the latest release asset of every GitHub-backed manifest entry
//! into fetchdir. The downloaded release tag is recorded in a `<name>.version`
//! sidecar file so unchanged firmware is skipped on the next run.

use anyhow::{Context, Result, anyhow};
use glob::Pattern;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{SourceType, SourcesConfig};
use crate::models::TerminalMessage;

/// Subset of the GitHub release API response we care about
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    pub size: u64,
}

/// Outcome of one update run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Pick the release asset to download
///
/// An explicit glob from the manifest wins; otherwise prefer an asset that
/// looks like a factory image, then any `.bin`.
pub fn select_asset<'a>(
    assets: &'a [ReleaseAsset],
    pattern: Option<&str>,
) -> Option<&'a ReleaseAsset> {
    if let Some(pattern) = pattern {
        let pattern = Pattern::new(pattern).ok()?;
        return assets.iter().find(|a| pattern.matches(&a.name));
    }

    assets
        .iter()
        .find(|a| a.name.contains("factory") && a.name.ends_with(".bin"))
        .or_else(|| assets.iter().find(|a| a.name.ends_with(".bin")))
}

/// Downloads firmware release assets listed in the manifest
pub struct UpdateService {
    client: reqwest::Client,
    api_base: String,
}

impl UpdateService {
    pub fn new() -> Self {
        Self::with_api_base("https://api.github.com")
    }

    /// Use an alternate API endpoint (tests point this at a local server)
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("webuiflasher/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client");
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    /// Download/refresh every GitHub source in the manifest
    pub async fn update_all(
        &self,
        config: &SourcesConfig,
        force: bool,
        tx: &UnboundedSender<TerminalMessage>,
    ) -> Result<UpdateSummary> {
        std::fs::create_dir_all(&config.fetchdir).with_context(|| {
            format!("Failed to create fetchdir: {}", config.fetchdir.display())
        })?;

        let mut summary = UpdateSummary::default();

        for source in &config.sources {
            if source.source_type != SourceType::Github {
                continue;
            }

            match self.update_source(config, &source.name, force, tx).await {
                Ok(true) => summary.updated += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    let _ = tx.send(TerminalMessage::error(format!("{}: {}", source.name, e)));
                }
            }
        }

        let _ = tx.send(TerminalMessage::info(format!(
            "Update finished: {} downloaded, {} up to date, {} failed",
            summary.updated, summary.skipped, summary.failed
        )));

        Ok(summary)
    }

    /// Update a single named source, returning whether a download happened
    async fn update_source(
        &self,
        config: &SourcesConfig,
        name: &str,
        force: bool,
        tx: &UnboundedSender<TerminalMessage>,
    ) -> Result<bool> {
        let source = config
            .find_source(name)
            .ok_or_else(|| anyhow!("Unknown source"))?;
        let repo = source
            .repo
            .as_deref()
            .ok_or_else(|| anyhow!("No repository configured"))?;

        let url = format!("{}/repos/{}/releases/latest", self.api_base, repo);
        let release: Release = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to query releases for {}", repo))?
            .error_for_status()
            .with_context(|| format!("GitHub API rejected the release query for {}", repo))?
            .json()
            .await
            .context("Failed to parse release metadata")?;

        let firmware_path = config.firmware_path(name);
        let version_path = self.version_sidecar(config, name);
        let have_version = std::fs::read_to_string(&version_path)
            .map(|s| s.trim().to_string())
            .ok();

        if !force && firmware_path.exists() && have_version.as_deref() == Some(&release.tag_name) {
            let _ = tx.send(TerminalMessage::info(format!(
                "{} already at {}",
                name, release.tag_name
            )));
            return Ok(false);
        }

        let asset = select_asset(&release.assets, source.asset.as_deref()).ok_or_else(|| {
            anyhow!(
                "No matching .bin asset in release {} of {}",
                release.tag_name,
                repo
            )
        })?;

        let _ = tx.send(TerminalMessage::info(format!(
            "Downloading {} {} ({}, {:.1} KB)",
            name,
            release.tag_name,
            asset.name,
            asset.size as f64 / 1024.0
        )));

        let data = self
            .client
            .get(&asset.browser_download_url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", asset.name))?
            .error_for_status()?
            .bytes()
            .await
            .context("Download interrupted")?;

        tokio::fs::write(&firmware_path, &data)
            .await
            .with_context(|| format!("Failed to write {}", firmware_path.display()))?;
        tokio::fs::write(&version_path, format!("{}\n", release.tag_name)).await?;

        let _ = tx.send(TerminalMessage::success(format!(
            "{} updated to {}",
            name, release.tag_name
        )));

        Ok(true)
    }

    fn version_sidecar(&self, config: &SourcesConfig, name: &str) -> PathBuf {
        config.fetchdir.join(format!("{}.version", name))
    }
}

impl Default for UpdateService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            browser_download_url: format!("https://example.invalid/{}", name),
            size: 1024,
        }
    }

    #[test]
    fn test_select_asset_explicit_pattern() {
        let assets = vec![asset("app.elf"), asset("km271-v5.factory.bin"), asset("ota.bin")];
        let picked = select_asset(&assets, Some("*.factory.bin")).unwrap();
        assert_eq!(picked.name, "km271-v5.factory.bin");
    }

    #[test]
    fn test_select_asset_prefers_factory_image() {
        let assets = vec![asset("ota.bin"), asset("firmware.factory.bin")];
        let picked = select_asset(&assets, None).unwrap();
        assert_eq!(picked.name, "firmware.factory.bin");
    }

    #[test]
    fn test_select_asset_falls_back_to_any_bin() {
        let assets = vec![asset("readme.md"), asset("ota.bin")];
        let picked = select_asset(&assets, None).unwrap();
        assert_eq!(picked.name, "ota.bin");
    }

    #[test]
    fn test_select_asset_none_matching() {
        let assets = vec![asset("readme.md")];
        assert!(select_asset(&assets, None).is_none());
        assert!(select_asset(&assets, Some("*.bin")).is_none());
    }
}
