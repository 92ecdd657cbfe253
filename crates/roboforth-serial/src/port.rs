//! 真实串口通道实现
//!
//! 基于 `serialport` crate。R17 控制器经 RS-232/USB 虚拟串口连接，
//! 8 数据位、1 停止位、无校验、无流控。

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, trace};

use crate::{SerialChannel, SerialError};

/// `serialport` 支撑的 [`SerialChannel`] 实现
pub struct SerialPortChannel {
    port: Box<dyn SerialPort>,
    device: String,
}

impl SerialPortChannel {
    /// 打开串口设备
    ///
    /// `read_timeout` 是底层单次读的上限，作为轮询粒度存在；
    /// 逻辑上的命令截止时间由上层维护。
    pub fn open(device: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, SerialError> {
        let port = serialport::new(device, baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()
            .map_err(|e| SerialError::Connection {
                device: device.to_string(),
                message: e.to_string(),
            })?;

        debug!(device, baud_rate, "serial port opened");
        Ok(Self {
            port,
            device: device.to_string(),
        })
    }

    /// 设备路径
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl SerialChannel for SerialPortChannel {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        trace!(device = %self.device, len = bytes.len(), "wrote command bytes");
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let waiting = self.port.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(0);
        }
        let want = waiting.min(buf.len());
        let n = self.port.read(&mut buf[..want])?;
        trace!(device = %self.device, n, "read available bytes");
        Ok(n)
    }

    fn discard_input(&mut self) -> Result<(), SerialError> {
        self.port.clear(ClearBuffer::Input)?;
        debug!(device = %self.device, "input buffer discarded");
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), SerialError> {
        self.port.set_timeout(timeout)?;
        Ok(())
    }
}
