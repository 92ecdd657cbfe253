//! 应答同步
//!
//! 字节流无长度前缀、无唯一定界符，还混有回显与多行遥测。
//! [`ResponseReader`] 在截止时间内反复收取可得字节并做行锚定扫描，
//! 直到哨兵、空闲提示符或诊断标记三者之一出现。
//!
//! 读取器是可续用的：一次交换判定后，缓冲里属于下一次逻辑交换的
//! 字节原样保留，稳态命令之间绝不冲刷通道输入缓冲——每次命令前
//! 冲刷会丢失在途遥测，这是历代临时脚本中潜伏最久的缺陷。

use std::time::Instant;

use tracing::{trace, warn};

use roboforth_protocol::response::is_sentinel_line;
use roboforth_protocol::{RawResponse, ScanOutcome, scan_response};
use roboforth_serial::SerialChannel;

use crate::DriverError;
use crate::cancel::CancelToken;
use crate::config::SessionConfig;

/// 单次 `read_available` 的收取缓冲大小
const CHUNK: usize = 256;

/// 一次成功同步的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub response: RawResponse,
    /// `false` 表示只观察到空闲提示符，命令结束但未获哨兵确认
    pub verified: bool,
}

/// 行缓冲应答读取器
#[derive(Debug, Default)]
pub struct ResponseReader {
    buffer: Vec<u8>,
}

impl ResponseReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 上一次交换判定后遗留的在途字节
    pub fn residual(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// 丢弃残留头部的空白与空闲提示符
    ///
    /// 设备在上一次交换收尾后打出的提示符是陈旧标记，留在缓冲里
    /// 会让下一次同步立刻误判为"未确认成功"。
    pub fn trim_stale_prompt(&mut self) {
        let skip = self
            .buffer
            .iter()
            .take_while(|&&b| b == b'>' || b.is_ascii_whitespace())
            .count();
        if skip > 0 {
            trace!(skip, "trimmed stale prompt bytes from residual");
            self.buffer.drain(..skip);
        }
    }

    /// 残留缓冲的完整行里是否已有哨兵
    ///
    /// 新命令尚未发出就已存在的哨兵属于上一次交换的迟到确认，
    /// 说明应答流已经失去对齐。
    pub fn residual_has_sentinel(&self) -> bool {
        self.buffer
            .split(|&b| b == b'\n')
            .map(|seg| String::from_utf8_lossy(seg))
            .any(|line| is_sentinel_line(line.trim_end_matches('\r')))
    }

    /// 同步一次逻辑交换
    ///
    /// 在 `deadline` 预算内轮询通道：哨兵 → 已确认；提示符先于哨兵 →
    /// 未确认成功（立即返回，绝不无限等待）；诊断标记 → 拒绝；
    /// 截止耗尽 → 超时，错误携带已累积的部分文本。每轮都检查
    /// 取消令牌；轮询间用有界休眠让出宿主。
    pub fn synchronize(
        &mut self,
        channel: &mut dyn SerialChannel,
        config: &SessionConfig,
        deadline: std::time::Duration,
        cancel: &CancelToken,
    ) -> Result<SyncOutcome, DriverError> {
        let start = Instant::now();
        let mut chunk = [0u8; CHUNK];

        loop {
            if cancel.is_cancelled() {
                warn!("synchronization cancelled by caller");
                return Err(DriverError::Cancelled);
            }

            let n = channel.read_available(&mut chunk)?;
            if n > 0 {
                self.buffer.extend_from_slice(&chunk[..n]);
                trace!(n, buffered = self.buffer.len(), "accumulated response bytes");
            }

            match scan_response(&self.buffer) {
                ScanOutcome::Complete { response, consumed } => {
                    self.buffer.drain(..consumed);
                    return Ok(SyncOutcome {
                        response,
                        verified: true,
                    });
                }
                ScanOutcome::Prompt { response, consumed } => {
                    self.buffer.drain(..consumed);
                    warn!("idle prompt observed before sentinel, completion unverified");
                    return Ok(SyncOutcome {
                        response,
                        verified: false,
                    });
                }
                ScanOutcome::Rejected { response, consumed } => {
                    self.buffer.drain(..consumed);
                    return Err(DriverError::CommandRejected {
                        raw: response.text(),
                    });
                }
                ScanOutcome::Incomplete => {}
            }

            let elapsed = start.elapsed();
            if elapsed >= deadline {
                // 部分缓冲随错误上抛，诊断证据不丢弃
                return Err(DriverError::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                    partial: String::from_utf8_lossy(&self.buffer).into_owned(),
                });
            }

            spin_sleep::sleep(config.poll_interval());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roboforth_serial::MockSerial;
    use std::time::Duration;

    fn config() -> SessionConfig {
        SessionConfig {
            poll_interval_ms: 1,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_synchronize_complete() {
        let mut mock = MockSerial::new();
        mock.expect(b"PURGE\r", b"PURGE\r\nOK\r\n");
        mock.write_all(b"PURGE\r").unwrap();

        let mut reader = ResponseReader::new();
        let outcome = reader
            .synchronize(&mut mock, &config(), Duration::from_secs(1), &CancelToken::new())
            .unwrap();
        assert!(outcome.verified);
        assert_eq!(outcome.response.lines, vec!["PURGE", "OK"]);
        assert!(reader.residual().is_empty());
    }

    #[test]
    fn test_synchronize_across_partial_reads() {
        let mut mock = MockSerial::new();
        mock.expect_chunks(b"WHERE\r", &[b"WHERE\r\n100 0 ", b"0 0 0\r\nP 1 0 0 0 0\r\nO", b"K\r\n"]);
        mock.write_all(b"WHERE\r").unwrap();

        let mut reader = ResponseReader::new();
        let outcome = reader
            .synchronize(&mut mock, &config(), Duration::from_secs(1), &CancelToken::new())
            .unwrap();
        assert!(outcome.verified);
        assert_eq!(outcome.response.lines.len(), 4);
    }

    #[test]
    fn test_synchronize_prompt_is_unverified() {
        let mut mock = MockSerial::new();
        mock.expect(b"START\r", b"START\r\n>");
        mock.write_all(b"START\r").unwrap();

        let mut reader = ResponseReader::new();
        let outcome = reader
            .synchronize(&mut mock, &config(), Duration::from_secs(1), &CancelToken::new())
            .unwrap();
        assert!(!outcome.verified);
    }

    #[test]
    fn test_synchronize_timeout_keeps_partial() {
        let mut mock = MockSerial::new();
        mock.expect(b"HOME\r", b"HOME\r\nmoving");
        mock.write_all(b"HOME\r").unwrap();

        let mut reader = ResponseReader::new();
        let err = reader
            .synchronize(&mut mock, &config(), Duration::from_millis(20), &CancelToken::new())
            .unwrap_err();
        match err {
            DriverError::Timeout { partial, .. } => {
                assert!(partial.contains("moving"));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
        // 超时不丢缓冲
        assert!(!reader.residual().is_empty());
    }

    #[test]
    fn test_synchronize_respects_cancel() {
        let mut mock = MockSerial::new();
        mock.expect(b"HOME\r", b"");
        mock.write_all(b"HOME\r").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let mut reader = ResponseReader::new();
        let err = reader
            .synchronize(&mut mock, &config(), Duration::from_secs(10), &cancel)
            .unwrap_err();
        assert!(matches!(err, DriverError::Cancelled));
    }

    #[test]
    fn test_residual_preserved_for_next_exchange() {
        let mut mock = MockSerial::new();
        // 哨兵之后紧跟属于下一次交换的字节
        mock.expect(b"SPEED ?\r", b"SPEED ?\r\n30 OK\r\nLATE TELEMETRY\r\n");
        mock.write_all(b"SPEED ?\r").unwrap();

        let mut reader = ResponseReader::new();
        let outcome = reader
            .synchronize(&mut mock, &config(), Duration::from_secs(1), &CancelToken::new())
            .unwrap();
        assert!(outcome.verified);
        assert_eq!(reader.residual(), b"LATE TELEMETRY\r\n");
    }

    #[test]
    fn test_rejection_surfaces_raw_text() {
        let mut mock = MockSerial::new();
        mock.expect(b"9999 0 0 MOVETO\r", b"9999 0 0 MOVETO\r\nOUT OF RANGE ABORTED\r\n");
        mock.write_all(b"9999 0 0 MOVETO\r").unwrap();

        let mut reader = ResponseReader::new();
        let err = reader
            .synchronize(&mut mock, &config(), Duration::from_secs(1), &CancelToken::new())
            .unwrap_err();
        match err {
            DriverError::CommandRejected { raw } => assert!(raw.contains("OUT OF RANGE")),
            other => panic!("expected CommandRejected, got {other:?}"),
        }
    }

    #[test]
    fn test_trim_stale_prompt() {
        let mut reader = ResponseReader::new();
        reader.buffer.extend_from_slice(b"> \r\nREAL DATA");
        reader.trim_stale_prompt();
        assert_eq!(reader.residual(), b"REAL DATA");
    }

    #[test]
    fn test_residual_has_sentinel() {
        let mut reader = ResponseReader::new();
        reader.buffer.extend_from_slice(b"STALE OK\r\n");
        assert!(reader.residual_has_sentinel());

        reader.clear();
        reader.buffer.extend_from_slice(b"PLAIN TEXT\r\n");
        assert!(!reader.residual_has_sentinel());
    }
}
