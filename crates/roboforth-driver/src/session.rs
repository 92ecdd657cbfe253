//! 会话与命令外观
//!
//! [`Arm`] 独占一个 [`SerialChannel`]，串行化全部命令交换
//! （同一时刻最多一条在途命令，由 `&mut self` 构造保证），
//! 负责引导握手、状态跟踪与位姿缓存。
//!
//! 状态机：Disconnected → Booting →（全部引导步骤逐一确认）→ Ready；
//! 任一引导步骤失败 → Faulted（终态，须重新 open）。稳态命令在
//! Ready ↔ Busy 间往返；同步超时、取消、传输故障与失步使会话置障。

use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use roboforth_protocol::{
    Command, Joint, Parameter, Position, RawResponse, UnitScale, parse_numeric_reply, parse_where,
};
use roboforth_serial::{SerialChannel, SerialPortChannel};

use crate::cancel::CancelToken;
use crate::config::SessionConfig;
use crate::error::{DriverError, ErrorKind};
use crate::reader::ResponseReader;

/// 会话生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Booting,
    Ready,
    Busy,
    Faulted,
}

/// 一条命令的确认结果
///
/// `verified == false` 且 `succeeded == true` 表示只观察到空闲提示符：
/// 回显与真正的确认无法区分，调用方应当把"已确认成功"与
/// "未经确认、谨慎推进"区别对待。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckResult {
    pub succeeded: bool,
    pub verified: bool,
    pub raw: RawResponse,
}

/// RoboForth 会话（对外 API）
pub struct Arm {
    channel: Box<dyn SerialChannel>,
    reader: ResponseReader,
    config: SessionConfig,
    state: SessionState,
    cancel: CancelToken,
    current_pos: Position,
    previous_pos: Position,
    tool_length: i32,
    /// 有一条 fire-and-forget 命令的确认还悬在通道上
    pending_ack: bool,
}

impl std::fmt::Debug for Arm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arm")
            .field("reader", &self.reader)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("cancel", &self.cancel)
            .field("current_pos", &self.current_pos)
            .field("previous_pos", &self.previous_pos)
            .field("tool_length", &self.tool_length)
            .field("pending_ack", &self.pending_ack)
            .finish_non_exhaustive()
    }
}

impl Arm {
    /// 打开串口并建立会话
    ///
    /// 先丢弃输入缓冲里的上电残留（这是整个会话唯一一次冲刷），
    /// 随后执行引导握手，除非配置了 `skip_bootstrap`。
    pub fn open(config: SessionConfig) -> Result<Self, DriverError> {
        let channel =
            SerialPortChannel::open(&config.device, config.baud_rate, config.read_timeout())?;
        Self::with_channel(Box::new(channel), config, CancelToken::new())
    }

    /// 在已有通道上建立会话（测试与自定义传输入口）
    pub fn with_channel(
        channel: Box<dyn SerialChannel>,
        config: SessionConfig,
        cancel: CancelToken,
    ) -> Result<Self, DriverError> {
        let mut arm = Self {
            channel,
            reader: ResponseReader::new(),
            config,
            state: SessionState::Disconnected,
            cancel,
            current_pos: Position::ZERO,
            previous_pos: Position::ZERO,
            tool_length: 0,
            pending_ack: false,
        };

        arm.channel.discard_input()?;
        arm.state = SessionState::Booting;

        if arm.config.skip_bootstrap {
            info!("bootstrap skipped by configuration");
            arm.state = SessionState::Ready;
        } else {
            arm.bootstrap()?;
        }
        Ok(arm)
    }

    // ========================================================================
    // 引导握手
    // ========================================================================

    /// 固定顺序的引导序列，逐步确认、出错即止
    fn bootstrap(&mut self) -> Result<(), DriverError> {
        info!("running bootstrap handshake");

        let step = self.config.step_timeout();
        let mut steps: Vec<(Command, Duration)> = vec![
            (Command::purge(), step),
            (Command::roboforth(), step),
        ];
        if self.config.unit_scale == UnitScale::Decimal {
            steps.push((Command::decimal(), step));
        }
        steps.push((Command::joint_mode(), step));
        steps.push((Command::start(), step));
        // 物理回零步骤使用各自的长预算
        steps.push((Command::calibrate(), self.config.calibrate_timeout()));
        steps.push((Command::home(), self.config.home_timeout()));
        steps.push((Command::cartesian(), step));

        for (command, budget) in steps {
            info!(command = %command, budget_ms = budget.as_millis() as u64, "bootstrap step");
            if let Err(err) = self.send_and_confirm(&command, budget) {
                self.state = SessionState::Faulted;
                error!(command = %command, error = %err, "bootstrap step failed, session faulted");
                return Err(err);
            }
        }

        self.state = SessionState::Ready;
        info!("bootstrap complete");

        // 预热位姿缓存；遥测畸形只影响缓存（保持零回退），不推翻引导
        if let Err(err) = self.where_() {
            match err.kind() {
                ErrorKind::MalformedTelemetry => {
                    warn!(error = %err, "initial pose query malformed, cache left at zero");
                }
                _ => return Err(err),
            }
        }
        Ok(())
    }

    // ========================================================================
    // 命令外观
    // ========================================================================

    /// 笛卡尔定位
    ///
    /// `wait == true` 时阻塞到确认并刷新位姿缓存；否则发出即返回，
    /// `verified == false`，其确认留在通道上由下一次交换前结清。
    pub fn move_to(&mut self, x: i32, y: i32, z: i32, wait: bool) -> Result<AckResult, DriverError> {
        let command = Command::move_to(x, y, z);

        if !wait {
            self.prepare_exchange()?;
            if let Err(err) = self.channel.write_all(&command.encode()) {
                self.state = SessionState::Faulted;
                return Err(err.into());
            }
            self.pending_ack = true;
            debug!(command = %command, "transmitted without waiting for acknowledgment");
            return Ok(AckResult {
                succeeded: true,
                verified: false,
                raw: RawResponse::default(),
            });
        }

        let ack = self.send_and_confirm(&command, self.config.command_timeout())?;
        self.where_()?;
        Ok(ack)
    }

    /// 关节转动（TELL WRIST/HAND ... MOVETO|MOVE）
    ///
    /// 相对转动会改变设备的寻址上下文：完成后重选笛卡尔模式并刷新
    /// 位姿缓存。
    pub fn rotate(
        &mut self,
        joint: Joint,
        value: i32,
        relative: bool,
    ) -> Result<AckResult, DriverError> {
        let command = Command::tell(joint, value, relative);
        let ack = self.send_and_confirm(&command, self.config.command_timeout())?;
        if relative {
            self.send_and_confirm(&Command::cartesian(), self.config.step_timeout())?;
            self.where_()?;
        }
        Ok(ack)
    }

    /// 数值参数查询（SPEED/ACCEL）
    pub fn query_numeric(&mut self, parameter: Parameter) -> Result<i32, DriverError> {
        let ack = self.send_and_confirm(&Command::query(parameter), self.config.command_timeout())?;
        Ok(parse_numeric_reply(&ack.raw)?)
    }

    /// 数值参数设置，随后回读校验
    ///
    /// 设备报告值与请求值不一致时报 `VerificationMismatch`，
    /// 绝不静默接受。
    pub fn set_numeric(
        &mut self,
        parameter: Parameter,
        value: i32,
    ) -> Result<AckResult, DriverError> {
        let ack = self.send_and_confirm(&Command::set(parameter, value), self.config.command_timeout())?;
        let actual = self.query_numeric(parameter)?;
        if actual != value {
            warn!(requested = value, actual, "device reports different value after set");
            return Err(DriverError::VerificationMismatch {
                requested: value,
                actual,
            });
        }
        Ok(ack)
    }

    /// WHERE 查询：返回（当前位姿，上一位姿）并更新缓存
    ///
    /// 遥测畸形时缓存写入零回退、错误原样上抛，调用方据此区分
    /// "臂确实在原点"与"遥测不可用"。
    pub fn where_(&mut self) -> Result<(Position, Position), DriverError> {
        let ack = self.send_and_confirm(&Command::where_query(), self.config.command_timeout())?;
        match parse_where(&ack.raw, self.config.unit_scale) {
            Ok((current, previous)) => {
                self.current_pos = current;
                self.previous_pos = previous;
                trace!(current = %current, "pose cache updated");
                Ok((current, previous))
            }
            Err(err) => {
                self.current_pos = Position::ZERO;
                self.previous_pos = Position::ZERO;
                warn!(error = %err, "WHERE telemetry malformed, pose cache reset to zero fallback");
                Err(err.into())
            }
        }
    }

    /// 电机上电
    pub fn energize(&mut self) -> Result<AckResult, DriverError> {
        self.send_and_confirm(&Command::energize(), self.config.command_timeout())
    }

    /// 电机断电
    pub fn de_energize(&mut self) -> Result<AckResult, DriverError> {
        self.send_and_confirm(&Command::de_energize(), self.config.command_timeout())
    }

    // ========================================================================
    // 访问器
    // ========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 最近一次成功 WHERE 的当前位姿（遥测失败后为零回退）
    pub fn position(&self) -> Position {
        self.current_pos
    }

    pub fn previous_position(&self) -> Position {
        self.previous_pos
    }

    pub fn set_tool_length(&mut self, length: i32) {
        self.tool_length = length;
    }

    pub fn tool_length(&self) -> i32 {
        self.tool_length
    }

    /// 会话取消令牌的克隆（交给 Ctrl-C 处理器等外部方）
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ========================================================================
    // 交换内核
    // ========================================================================

    /// 交换前置检查：会话可用、在途确认已结清、残留缓冲对齐
    fn prepare_exchange(&mut self) -> Result<(), DriverError> {
        if self.state == SessionState::Faulted {
            return Err(DriverError::Faulted);
        }
        self.settle_pending_ack()?;
        self.reader.trim_stale_prompt();

        if self.reader.residual_has_sentinel() {
            // 命令还没发出就有哨兵在缓冲里：上一交换的迟到确认，失步
            let raw = String::from_utf8_lossy(self.reader.residual()).into_owned();
            self.state = SessionState::Faulted;
            return Err(DriverError::Desync {
                reason: "stale sentinel in residual buffer".to_string(),
                raw,
            });
        }
        Ok(())
    }

    /// 结清 fire-and-forget 命令留在通道上的确认
    fn settle_pending_ack(&mut self) -> Result<(), DriverError> {
        if !self.pending_ack {
            return Ok(());
        }
        debug!("settling outstanding unwaited acknowledgment");
        self.pending_ack = false;
        let result = self.reader.synchronize(
            self.channel.as_mut(),
            &self.config,
            self.config.command_timeout(),
            &self.cancel,
        );
        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                if err.is_fatal() {
                    self.state = SessionState::Faulted;
                }
                Err(err)
            }
        }
    }

    /// 发送一条命令并同步其应答
    fn send_and_confirm(
        &mut self,
        command: &Command,
        budget: Duration,
    ) -> Result<AckResult, DriverError> {
        self.prepare_exchange()?;

        let resume = self.state; // Ready 或 Booting
        self.state = SessionState::Busy;
        debug!(command = %command, "sending command");

        if let Err(err) = self.channel.write_all(&command.encode()) {
            self.state = SessionState::Faulted;
            return Err(err.into());
        }

        match self
            .reader
            .synchronize(self.channel.as_mut(), &self.config, budget, &self.cancel)
        {
            Ok(outcome) => {
                self.state = resume;
                if !outcome.verified {
                    warn!(command = %command, "completed without verification of success");
                }
                Ok(AckResult {
                    succeeded: true,
                    verified: outcome.verified,
                    raw: outcome.response,
                })
            }
            Err(err) => {
                self.state = if err.is_fatal() {
                    SessionState::Faulted
                } else {
                    resume
                };
                Err(err)
            }
        }
    }
}
