//! 配置文件解析与命令行覆盖
//!
//! 优先级：命令行选项 > `--config` 指定的文件 >
//! `~/.config/roboforth/config.toml`（存在时）> 内置默认值。

use std::path::PathBuf;

use anyhow::{Context, Result};
use roboforth_sdk::{SessionConfig, UnitScale};
use tracing::debug;

/// 缺省配置文件位置
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("roboforth").join("config.toml"))
}

/// 解析会话配置并套用命令行覆盖
pub fn resolve(
    config_path: Option<PathBuf>,
    device: Option<String>,
    skip_bootstrap: bool,
    decimal: bool,
) -> Result<SessionConfig> {
    let mut config = match config_path {
        Some(path) => SessionConfig::load_from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match default_config_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading default config file");
                SessionConfig::load_from_file(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?
            }
            _ => SessionConfig::default(),
        },
    };

    if let Some(device) = device {
        config.device = device;
    }
    if skip_bootstrap {
        config.skip_bootstrap = true;
    }
    if decimal {
        config.unit_scale = UnitScale::Decimal;
    }
    Ok(config)
}
