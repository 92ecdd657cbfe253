//! 会话配置
//!
//! 超时一律以毫秒整数存储，便于 TOML 直接书写。CALIBRATE 与 HOME
//! 涉及物理回零，耗时远超普通步骤，各自持有独立预算而不是复用
//! 通道默认读超时。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use roboforth_protocol::UnitScale;

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 串口设备路径（Linux/macOS）或 COM 口名（Windows）
    pub device: String,
    /// 波特率
    pub baud_rate: u32,
    /// 底层串口读超时，同时是轮询粒度的上限
    pub read_timeout_ms: u64,
    /// 同步轮询间隔（有界休眠，避免空转）
    pub poll_interval_ms: u64,
    /// 稳态命令的同步截止预算
    pub command_timeout_ms: u64,
    /// 一般引导步骤的预算
    pub step_timeout_ms: u64,
    /// CALIBRATE 预算（物理回零，数十秒量级）
    pub calibrate_timeout_ms: u64,
    /// HOME 预算
    pub home_timeout_ms: u64,
    /// 位姿单位刻度（integer | decimal），显式配置，不做推断
    pub unit_scale: UnitScale,
    /// 跳过引导握手，仅清缓冲后直接进入 Ready
    pub skip_bootstrap: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            #[cfg(windows)]
            device: "COM7".to_string(),
            #[cfg(not(windows))]
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 19_200,
            read_timeout_ms: 50,
            poll_interval_ms: 5,
            command_timeout_ms: 5_000,
            step_timeout_ms: 5_000,
            calibrate_timeout_ms: 120_000,
            home_timeout_ms: 30_000,
            unit_scale: UnitScale::Integer,
            skip_bootstrap: false,
        }
    }
}

impl SessionConfig {
    /// 从 TOML 文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn calibrate_timeout(&self) -> Duration {
        Duration::from_millis(self.calibrate_timeout_ms)
    }

    pub fn home_timeout(&self) -> Duration {
        Duration::from_millis(self.home_timeout_ms)
    }
}
