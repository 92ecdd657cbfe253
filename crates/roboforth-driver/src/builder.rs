//! Builder 模式实现
//!
//! 提供链式构造 [`Arm`] 会话的便捷方式。
//!
//! # Example
//!
//! ```no_run
//! use roboforth_driver::{ArmBuilder, UnitScale};
//!
//! let arm = ArmBuilder::new()
//!     .device("/dev/ttyUSB0")
//!     .baud_rate(19_200)
//!     .unit_scale(UnitScale::Decimal)
//!     .build()
//!     .unwrap();
//! ```

use std::time::Duration;

use roboforth_protocol::UnitScale;
use roboforth_serial::SerialChannel;

use crate::cancel::CancelToken;
use crate::config::SessionConfig;
use crate::error::DriverError;
use crate::session::Arm;

/// Arm 会话 Builder（链式构造）
#[derive(Debug, Clone, Default)]
pub struct ArmBuilder {
    config: SessionConfig,
    cancel: Option<CancelToken>,
}

impl ArmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以现成配置整体替换（如从 TOML 加载的结果）
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// 串口设备路径或 COM 口名
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.config.device = device.into();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    /// 稳态命令的同步预算
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn unit_scale(mut self, scale: UnitScale) -> Self {
        self.config.unit_scale = scale;
        self
    }

    /// 跳过引导握手（设备已经初始化好时使用）
    pub fn skip_bootstrap(mut self, skip: bool) -> Self {
        self.config.skip_bootstrap = skip;
        self
    }

    /// 外部提供的取消令牌（默认新建）
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 打开串口并建立会话
    pub fn build(self) -> Result<Arm, DriverError> {
        let cancel = self.cancel.unwrap_or_default();
        let config = self.config;
        let channel = roboforth_serial::SerialPortChannel::open(
            &config.device,
            config.baud_rate,
            config.read_timeout(),
        )?;
        Arm::with_channel(Box::new(channel), config, cancel)
    }

    /// 在调用方提供的通道上建立会话（测试与自定义传输）
    pub fn build_with_channel(
        self,
        channel: Box<dyn SerialChannel>,
    ) -> Result<Arm, DriverError> {
        let cancel = self.cancel.unwrap_or_default();
        Arm::with_channel(channel, self.config, cancel)
    }
}
