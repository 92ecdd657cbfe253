//! # RoboForth 驱动层
//!
//! RoboForth 方言的协议引擎：会话生命周期、引导握手、
//! 应答同步与错误分类。
//!
//! 核心约束是同步协议本身：设备在无帧字节流上交错输出命令回显、
//! 成功哨兵、歧义的空闲提示符与多行遥测，传输还伴随部分读取与
//! 不定延迟。[`ResponseReader`] 负责在截止预算内正确划定每次
//! 逻辑交换的边界，[`Arm`] 在其上提供类型化的命令外观。

pub mod builder;
pub mod cancel;
pub mod config;
pub mod error;
pub mod reader;
pub mod session;

pub use builder::ArmBuilder;
pub use cancel::CancelToken;
pub use config::{ConfigError, SessionConfig};
pub use error::{DriverError, ErrorKind};
pub use reader::{ResponseReader, SyncOutcome};
pub use session::{AckResult, Arm, SessionState};

// 常用协议类型重导出
pub use roboforth_protocol::{Command, Joint, Parameter, Position, RawResponse, UnitScale};
