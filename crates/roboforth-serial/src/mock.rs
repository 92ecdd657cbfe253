//! 脚本化 Mock 通道，用于无硬件测试协议引擎
//!
//! 预置"期望写入 → 应答字节"配对，按序消费。应答可以整块交付，
//! 也可以拆成多个分片逐次交付，以复现部分读取下的同步行为。

use std::collections::VecDeque;

use crate::{SerialChannel, SerialError};

#[derive(Debug, Clone)]
struct Expectation {
    /// 期望被写入的精确字节
    request: Vec<u8>,
    /// 匹配后排队等待读取的应答分片
    chunks: VecDeque<Vec<u8>>,
}

/// 脚本化的 [`SerialChannel`] 实现
///
/// `write_all` 与下一条期望精确比对，匹配后其应答分片进入待读队列；
/// `read_available` 每次交付一个分片（受调用方缓冲大小截断）。
/// 期望不匹配或已耗尽时返回错误，使测试立即暴露协议偏差。
#[derive(Debug, Default)]
pub struct MockSerial {
    expectations: VecDeque<Expectation>,
    pending: VecDeque<Vec<u8>>,
    sent_log: Vec<Vec<u8>>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一条期望：写入 `request` 后可读到 `response`（整块交付）
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        let mut chunks = VecDeque::new();
        if !response.is_empty() {
            chunks.push_back(response.to_vec());
        }
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            chunks,
        });
    }

    /// 预置一条期望，应答按给定分片逐次交付（模拟部分读取）
    pub fn expect_chunks(&mut self, request: &[u8], chunks: &[&[u8]]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
        });
    }

    /// 在任何写入发生前向输入侧预置字节（模拟上电残留）
    pub fn seed_input(&mut self, bytes: &[u8]) {
        self.pending.push_back(bytes.to_vec());
    }

    /// 已写入数据的完整记录，每个元素对应一次 `write_all`
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// 尚未消费的期望条数
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    fn mismatch(message: String) -> SerialError {
        SerialError::Connection {
            device: "mock".to_string(),
            message,
        }
    }
}

impl SerialChannel for MockSerial {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.sent_log.push(bytes.to_vec());

        let Some(expectation) = self.expectations.pop_front() else {
            return Err(Self::mismatch(format!(
                "unexpected write, no expectations left: {:?}",
                String::from_utf8_lossy(bytes)
            )));
        };
        if bytes != expectation.request.as_slice() {
            return Err(Self::mismatch(format!(
                "unexpected write: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(bytes)
            )));
        }
        self.pending.extend(expectation.chunks);
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let Some(mut chunk) = self.pending.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            // 调用方缓冲不够大，余下字节放回队首
            self.pending.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn discard_input(&mut self) -> Result<(), SerialError> {
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expectation_roundtrip() {
        let mut mock = MockSerial::new();
        mock.expect(b"PURGE\r", b"PURGE\r\nOK\r\n");

        mock.write_all(b"PURGE\r").unwrap();
        let mut buf = [0u8; 64];
        let n = mock.read_available(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"PURGE\r\nOK\r\n");
        assert_eq!(mock.read_available(&mut buf).unwrap(), 0);
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[test]
    fn test_chunked_delivery() {
        let mut mock = MockSerial::new();
        mock.expect_chunks(b"WHERE\r", &[b"WHERE\r\n10", b"0 0 0 0 0\r\nOK\r\n"]);

        mock.write_all(b"WHERE\r").unwrap();
        let mut buf = [0u8; 64];
        let n = mock.read_available(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"WHERE\r\n10");
        let n = mock.read_available(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"0 0 0 0 0\r\nOK\r\n");
    }

    #[test]
    fn test_small_reader_buffer_keeps_remainder() {
        let mut mock = MockSerial::new();
        mock.expect(b"X\r", b"ABCDEF");
        mock.write_all(b"X\r").unwrap();

        let mut buf = [0u8; 4];
        let n = mock.read_available(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ABCD");
        let n = mock.read_available(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"EF");
    }

    #[test]
    fn test_mismatched_write_errors() {
        let mut mock = MockSerial::new();
        mock.expect(b"HOME\r", b"OK\r\n");
        let err = mock.write_all(b"START\r").unwrap_err();
        assert!(format!("{}", err).contains("unexpected write"));
    }

    #[test]
    fn test_exhausted_expectations_error() {
        let mut mock = MockSerial::new();
        assert!(mock.write_all(b"PURGE\r").is_err());
    }

    #[test]
    fn test_seed_and_discard_input() {
        let mut mock = MockSerial::new();
        mock.seed_input(b"\xff\xfegarbage");
        mock.discard_input().unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(mock.read_available(&mut buf).unwrap(), 0);
    }
}
