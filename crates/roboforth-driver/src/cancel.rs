//! 取消令牌
//!
//! 同步轮询的每一轮都会检查令牌，使进行中的等待可以被外部
//! （如 Ctrl-C 处理器）放弃。克隆共享同一状态。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 跨线程共享的取消标记
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消；已取消的令牌不可复位
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
