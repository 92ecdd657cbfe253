//! # RoboForth 串口适配层
//!
//! 串口硬件抽象层，提供统一的字节流双工接口。
//!
//! 协议引擎只依赖 [`SerialChannel`]：非阻塞读取、整体写入、
//! 丢弃输入缓冲。真实实现见 [`port::SerialPortChannel`]，
//! 测试用脚本实现见 `mock`（`mock` feature）。

use std::time::Duration;

use thiserror::Error;

pub mod port;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use port::SerialPortChannel;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockSerial;

/// 串口适配层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection error on {device}: {message}")]
    Connection { device: String, message: String },
    #[error("Port not open")]
    NotOpen,
}

impl From<serialport::Error> for SerialError {
    fn from(err: serialport::Error) -> Self {
        SerialError::Connection {
            device: String::new(),
            message: err.to_string(),
        }
    }
}

/// 字节流双工通道
///
/// 每个会话独占一个通道实例，不跨会话共享。读取是非阻塞的：
/// 立即返回当前可得的字节（可能为 0），由上层的轮询循环决定
/// 等待节奏与截止时间。
pub trait SerialChannel: Send {
    /// 整体写入并冲刷一条命令的全部字节
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError>;

    /// 非阻塞读取：返回立即可得的字节数（可能为 0）
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// 丢弃输入缓冲中的全部残留字节
    ///
    /// 仅供会话打开时清除上电残留使用；稳态命令之间不得调用，
    /// 否则会丢失在途遥测。
    fn discard_input(&mut self) -> Result<(), SerialError>;

    /// 调整底层读超时（实现可忽略）
    fn set_read_timeout(&mut self, _timeout: Duration) -> Result<(), SerialError> {
        Ok(())
    }
}
