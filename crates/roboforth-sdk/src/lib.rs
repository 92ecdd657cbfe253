//! # RoboForth SDK
//!
//! 统一入口：重导出各层常用类型，并提供日志初始化便捷函数。
//!
//! # Example
//!
//! ```no_run
//! use roboforth_sdk::{ArmBuilder, Parameter};
//!
//! roboforth_sdk::init_logging();
//!
//! let mut arm = ArmBuilder::new().device("/dev/ttyUSB0").build().unwrap();
//! arm.set_numeric(Parameter::Speed, 30).unwrap();
//! arm.move_to(2000, 0, 4500, true).unwrap();
//! println!("at {}", arm.position());
//! ```

pub use roboforth_driver::{
    AckResult, Arm, ArmBuilder, CancelToken, Command, ConfigError, DriverError, ErrorKind, Joint,
    Parameter, Position, RawResponse, ResponseReader, SessionConfig, SessionState, SyncOutcome,
    UnitScale,
};
pub use roboforth_protocol as protocol;
pub use roboforth_serial::{SerialChannel, SerialError, SerialPortChannel};

/// 初始化 tracing 日志
///
/// 过滤级别取 `RUST_LOG` 环境变量，缺省 `info`。同时桥接 `log` 门面。
/// 重复调用无害。
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
