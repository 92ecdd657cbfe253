//! # RoboForth 协议层
//!
//! ST Robotics R17 机械臂 RoboForth 方言的纯文本协议层：
//! 命令编码、应答扫描（哨兵/提示符/诊断文本）、遥测解析。
//!
//! 本 crate 不做任何 IO，串口访问见 `roboforth-serial`，
//! 会话与同步逻辑见 `roboforth-driver`。

use thiserror::Error;

pub mod command;
pub mod constants;
pub mod response;
pub mod telemetry;

pub use command::{Command, Joint, Parameter};
pub use response::{RawResponse, ScanOutcome, is_sentinel_line, scan_response};
pub use telemetry::{Position, UnitScale, parse_numeric_reply, parse_where};

/// 协议层统一错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// 遥测文本不符合预期行/词法结构
    #[error("Malformed telemetry: {reason}")]
    MalformedTelemetry {
        reason: String,
        /// 触发失败的原始设备文本
        raw: String,
    },
}

impl ProtocolError {
    pub fn malformed(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        ProtocolError::MalformedTelemetry {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// 取回触发失败的原始设备文本
    pub fn raw_text(&self) -> &str {
        match self {
            ProtocolError::MalformedTelemetry { raw, .. } => raw,
        }
    }
}
