//! # RoboForth CLI
//!
//! ST Robotics 机械臂的命令行工具（One-shot 模式）。
//!
//! ```bash
//! # 全量引导后移动到目标点并等待确认
//! roboforth-cli --device /dev/ttyUSB0 move 2000 0 4500
//!
//! # 设备已初始化时跳过引导
//! roboforth-cli --skip-bootstrap speed 30
//! roboforth-cli --skip-bootstrap where
//! ```
//!
//! 配置文件（可选）：`~/.config/roboforth/config.toml`，
//! 命令行选项覆盖文件值。Ctrl-C 随时中止进行中的同步等待。

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod settings;

/// RoboForth CLI - 机械臂命令行工具
#[derive(Parser, Debug)]
#[command(name = "roboforth-cli")]
#[command(about = "Command-line interface for ST Robotics arms", long_about = None)]
#[command(version)]
struct Cli {
    /// 串口设备路径（覆盖配置文件）
    #[arg(long, global = true)]
    device: Option<String>,

    /// 配置文件路径（缺省查找 ~/.config/roboforth/config.toml）
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    /// 跳过引导握手（设备已初始化时使用）
    #[arg(long, global = true)]
    skip_bootstrap: bool,

    /// 十分位单位模式（引导时发送 DECIMAL）
    #[arg(long, global = true)]
    decimal: bool,

    #[command(subcommand)]
    command: Commands,
}

/// TELL 可寻址的关节
#[derive(ValueEnum, Debug, Clone, Copy)]
enum JointArg {
    Wrist,
    Hand,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 移动到笛卡尔目标点
    Move {
        x: i32,
        y: i32,
        z: i32,
        /// 发出即返回，不等待确认
        #[arg(long)]
        no_wait: bool,
    },

    /// 查询当前/上一位姿
    Where,

    /// 查询或设置速度（带值则设置并回读校验）
    Speed { value: Option<i32> },

    /// 查询或设置加速度（带值则设置并回读校验）
    Accel { value: Option<i32> },

    /// 转动手腕或手爪
    Rotate {
        joint: JointArg,
        value: i32,
        /// 相对增量而非绝对角度
        #[arg(long)]
        relative: bool,
    },

    /// 电机上电
    Energize,

    /// 电机断电
    DeEnergize,
}

fn main() -> Result<()> {
    roboforth_sdk::init_logging();
    let cli = Cli::parse();
    commands::run(cli)
}
