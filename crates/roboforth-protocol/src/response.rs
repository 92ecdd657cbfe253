//! 应答扫描
//!
//! 传输层交付的是无帧字节流，可能混杂命令回显、成功哨兵、
//! 诊断文本与多行遥测。本模块在累积缓冲上做一次纯函数扫描，
//! 判定一次逻辑交换是否结束以及以何种方式结束。
//!
//! 哨兵判定锚定在行边界上：按行终结符切分后检查行尾词，
//! 绝不在缓冲任意位置做子串搜索，否则遥测文本中偶然出现的
//! 哨兵字符会造成假阳性。未终结的行尾残段永远不当作哨兵
//! （部分读取可能把一行从中间截断），空闲提示符则只会出现在
//! 残段中——设备输出提示符后不再跟行终结符。

use std::fmt;

use crate::constants::{ABORT_MARKER, IDLE_PROMPT, LINE_TERMINATOR, SENTINEL};

/// 一次命令提交与同步之间捕获的全部文本行
///
/// 保留原始行序，行终结符在切分时剥离。仅在产生它的调用内存活。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    pub lines: Vec<String>,
}

impl RawResponse {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 以设备行终结符重组的完整文本（用于错误上下文）
    pub fn text(&self) -> String {
        self.lines.join(LINE_TERMINATOR)
    }
}

impl fmt::Display for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// 对累积缓冲做一次扫描的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// 某行行尾词为哨兵，命令已确认完成
    Complete {
        response: RawResponse,
        /// 从缓冲头部消耗的字节数；其后的字节属于下一次逻辑交换
        consumed: usize,
    },
    /// 哨兵尚未出现，但观察到空闲提示符：命令结束但未获确认
    Prompt {
        response: RawResponse,
        consumed: usize,
    },
    /// 设备以诊断文本代替哨兵作答，命令被拒绝
    Rejected {
        response: RawResponse,
        consumed: usize,
    },
    /// 尚无法判定，需要继续累积字节
    Incomplete,
}

/// 行尾词是否为成功哨兵
pub fn is_sentinel_line(line: &str) -> bool {
    line.split_whitespace().next_back() == Some(SENTINEL)
}

/// 扫描累积缓冲，判定一次逻辑交换的边界
///
/// 返回 [`ScanOutcome::Incomplete`] 时缓冲原样保留；其余情形
/// `consumed` 给出本次交换占用的字节数，调用方据此排空缓冲头部、
/// 保留其后的在途字节。拒绝判定跳过第 1 行：那是命令自身的回显，
/// 查询命令回显里的 ` ?` 等字符不应触发误判。
pub fn scan_response(buf: &[u8]) -> ScanOutcome {
    let mut lines: Vec<String> = Vec::new();
    let mut cursor = 0usize;

    while let Some(nl) = buf[cursor..].iter().position(|&b| b == b'\n') {
        let end = cursor + nl;
        let mut segment = &buf[cursor..end];
        if let [head @ .., b'\r'] = segment {
            segment = head;
        }
        let line = String::from_utf8_lossy(segment).into_owned();
        let consumed = end + 1;

        let is_echo = lines.is_empty();
        let completed = is_sentinel_line(&line);
        let rejected = !is_echo && line.contains(ABORT_MARKER);
        lines.push(line);

        if completed {
            return ScanOutcome::Complete {
                response: RawResponse::new(lines),
                consumed,
            };
        }
        if rejected {
            return ScanOutcome::Rejected {
                response: RawResponse::new(lines),
                consumed,
            };
        }

        cursor = consumed;
    }

    // 完整行里既无哨兵也无诊断标记；检查未终结的行尾残段中的提示符
    let tail = &buf[cursor..];
    if let Some(p) = tail.iter().position(|&b| b == IDLE_PROMPT) {
        let fragment = String::from_utf8_lossy(&tail[..p]);
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            lines.push(fragment.to_string());
        }
        return ScanOutcome::Prompt {
            response: RawResponse::new(lines),
            consumed: cursor + p + 1,
        };
    }

    ScanOutcome::Incomplete
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_empty_buffer() {
        assert_eq!(scan_response(b""), ScanOutcome::Incomplete);
    }

    #[test]
    fn scan_unterminated_line_is_incomplete() {
        // 行未终结，即使内容看似完整也不能判定
        assert_eq!(scan_response(b"PURGE OK"), ScanOutcome::Incomplete);
    }

    #[test]
    fn scan_sentinel_on_own_line() {
        let outcome = scan_response(b"PURGE\r\nOK\r\n");
        match outcome {
            ScanOutcome::Complete { response, consumed } => {
                assert_eq!(response.lines, vec!["PURGE", "OK"]);
                assert_eq!(consumed, 11);
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn scan_sentinel_as_trailing_token() {
        let outcome = scan_response(b"CALIBRATE OK\r\n");
        assert!(matches!(outcome, ScanOutcome::Complete { .. }));
    }

    #[test]
    fn scan_sentinel_chars_inside_token_ignored() {
        // 行尾词是 OKAY 而非 OK，子串搜索会在这里误判
        assert_eq!(scan_response(b"TOKEN OKAY\r\n"), ScanOutcome::Incomplete);
    }

    #[test]
    fn scan_sentinel_not_at_line_end_ignored() {
        assert_eq!(scan_response(b"OK 100\r\n"), ScanOutcome::Incomplete);
    }

    #[test]
    fn scan_preserves_bytes_after_sentinel() {
        let buf = b"WHERE\r\nOK\r\n> 100 200";
        match scan_response(buf) {
            ScanOutcome::Complete { consumed, .. } => {
                assert_eq!(&buf[consumed..], b"> 100 200");
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn scan_prompt_without_sentinel_is_unverified() {
        let outcome = scan_response(b"START\r\n>");
        match outcome {
            ScanOutcome::Prompt { response, consumed } => {
                assert_eq!(response.lines, vec!["START"]);
                assert_eq!(consumed, 8);
            }
            other => panic!("expected Prompt, got {other:?}"),
        }
    }

    #[test]
    fn scan_prompt_keeps_preceding_fragment() {
        let outcome = scan_response(b"SPEED !\r\nREADY>");
        match outcome {
            ScanOutcome::Prompt { response, .. } => {
                assert_eq!(response.lines, vec!["SPEED !", "READY"]);
            }
            other => panic!("expected Prompt, got {other:?}"),
        }
    }

    #[test]
    fn scan_abort_marker_is_rejected() {
        let outcome = scan_response(b"9999999 0 0 MOVETO\r\nTOO FAR ABORTED\r\n");
        match outcome {
            ScanOutcome::Rejected { response, .. } => {
                assert_eq!(response.lines.len(), 2);
                assert!(response.text().contains("ABORTED"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn scan_abort_marker_in_echo_line_ignored() {
        // 回显行属于我们自己发出的文本，不参与拒绝判定
        assert_eq!(scan_response(b"ABORTED\r\n"), ScanOutcome::Incomplete);
    }

    #[test]
    fn scan_tolerates_bare_lf() {
        let outcome = scan_response(b"PURGE\nOK\n");
        assert!(matches!(outcome, ScanOutcome::Complete { .. }));
    }

    #[test]
    fn scan_multiline_telemetry_before_sentinel() {
        let buf = b"WHERE\r\nX Y Z PITCH ROLL\r\n100 0 4500 0 0\r\nP 90 0 4400 0 0\r\nOK\r\n";
        match scan_response(buf) {
            ScanOutcome::Complete { response, consumed } => {
                assert_eq!(response.lines.len(), 5);
                assert_eq!(consumed, buf.len());
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }
}
