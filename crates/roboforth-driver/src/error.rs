//! 驱动层错误类型与分类
//!
//! 分类本身是纯函数（[`DriverError::kind`]、[`DriverError::is_fatal`]），
//! 不产生副作用；重试还是置障（Faulted）由会话层依据分类决定。

use roboforth_protocol::ProtocolError;
use roboforth_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输通道无法建立或维持
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    /// 遥测解析失败（调用方应以零位姿回退并保留此信号）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 同步在截止时间内既未见哨兵也未见提示符
    ///
    /// `partial` 保留超时时刻已累积的全部文本，诊断证据不丢弃。
    #[error("Synchronization timeout after {elapsed_ms} ms (partial: {partial:?})")]
    Timeout { elapsed_ms: u64, partial: String },

    /// 哨兵出现在不该出现的位置，应答流失去对齐
    #[error("Protocol desync: {reason} (buffer: {raw:?})")]
    Desync { reason: String, raw: String },

    /// 设备以诊断文本代替哨兵作答
    #[error("Command rejected by device: {raw:?}")]
    CommandRejected { raw: String },

    /// 设置后回读的值与请求值不一致
    #[error("Verification mismatch: requested {requested}, device reports {actual}")]
    VerificationMismatch { requested: i32, actual: i32 },

    /// 调用方通过取消令牌放弃了同步
    #[error("Operation cancelled")]
    Cancelled,

    /// 会话已置障，需要重新打开
    #[error("Session faulted, re-open required")]
    Faulted,
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Timeout,
    Desync,
    Rejected,
    VerificationMismatch,
    MalformedTelemetry,
    Cancelled,
    Faulted,
}

impl DriverError {
    /// 纯分类：原始失败 → 类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Serial(_) => ErrorKind::Connection,
            DriverError::Protocol(_) => ErrorKind::MalformedTelemetry,
            DriverError::Timeout { .. } => ErrorKind::Timeout,
            DriverError::Desync { .. } => ErrorKind::Desync,
            DriverError::CommandRejected { .. } => ErrorKind::Rejected,
            DriverError::VerificationMismatch { .. } => ErrorKind::VerificationMismatch,
            DriverError::Cancelled => ErrorKind::Cancelled,
            DriverError::Faulted => ErrorKind::Faulted,
        }
    }

    /// 是否使会话置障
    ///
    /// 同步超时、取消、传输故障和失步之后无法再信任通道上的对齐，
    /// 会话转入 Faulted；拒绝、校验不一致与遥测畸形不影响链路本身，
    /// 会话保持 Ready，由调用方决定后续策略。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connection | ErrorKind::Timeout | ErrorKind::Desync | ErrorKind::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = DriverError::Timeout {
            elapsed_ms: 5000,
            partial: "WHERE".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let err = DriverError::CommandRejected {
            raw: "TOO FAR ABORTED".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Rejected);

        let err: DriverError = ProtocolError::malformed("bad token", "x y z").into();
        assert_eq!(err.kind(), ErrorKind::MalformedTelemetry);

        let err: DriverError = SerialError::NotOpen.into();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_fatality_policy() {
        assert!(
            DriverError::Timeout {
                elapsed_ms: 1,
                partial: String::new()
            }
            .is_fatal()
        );
        assert!(DriverError::Cancelled.is_fatal());
        assert!(
            DriverError::Desync {
                reason: "stale sentinel".to_string(),
                raw: String::new()
            }
            .is_fatal()
        );
        assert!(!DriverError::CommandRejected { raw: String::new() }.is_fatal());
        assert!(
            !DriverError::VerificationMismatch {
                requested: 30,
                actual: 25
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_display_carries_raw_context() {
        let err = DriverError::Timeout {
            elapsed_ms: 5000,
            partial: "WHERE\r\n100".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("5000 ms"));
        assert!(msg.contains("WHERE"));
    }
}
