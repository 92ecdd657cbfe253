//! 子命令执行
//!
//! 每次调用内部完成：建立会话（含引导）→ 执行操作 → 断开。
//! Ctrl-C 经取消令牌中止进行中的同步等待，会话随之置障退出。

use anyhow::{Context, Result};
use tracing::info;

use roboforth_sdk::{AckResult, Arm, ArmBuilder, CancelToken, Joint, Parameter, SessionConfig};

use crate::{Cli, Commands, JointArg};

impl From<JointArg> for Joint {
    fn from(arg: JointArg) -> Self {
        match arg {
            JointArg::Wrist => Joint::Wrist,
            JointArg::Hand => Joint::Hand,
        }
    }
}

/// 建立会话并把 Ctrl-C 接到取消令牌上
fn connect(config: SessionConfig) -> Result<Arm> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("interrupt received, abandoning current exchange");
        handler_token.cancel();
    })
    .context("failed to install Ctrl-C handler")?;

    info!(device = %config.device, "connecting");
    let arm = ArmBuilder::new()
        .config(config)
        .cancel_token(cancel)
        .build()
        .context("failed to open session")?;
    Ok(arm)
}

fn report_ack(ack: &AckResult) {
    if ack.verified {
        println!("ok");
    } else {
        println!("ok (unverified: idle prompt before sentinel)");
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = crate::settings::resolve(cli.config, cli.device, cli.skip_bootstrap, cli.decimal)?;
    let mut arm = connect(config)?;

    match cli.command {
        Commands::Move { x, y, z, no_wait } => {
            let ack = arm.move_to(x, y, z, !no_wait)?;
            report_ack(&ack);
            if !no_wait {
                println!("at {}", arm.position());
            }
        }
        Commands::Where => {
            let (current, previous) = arm.where_()?;
            println!("current:  {current}");
            println!("previous: {previous}");
        }
        Commands::Speed { value } => run_numeric(&mut arm, Parameter::Speed, value)?,
        Commands::Accel { value } => run_numeric(&mut arm, Parameter::Accel, value)?,
        Commands::Rotate {
            joint,
            value,
            relative,
        } => {
            let ack = arm.rotate(joint.into(), value, relative)?;
            report_ack(&ack);
        }
        Commands::Energize => report_ack(&arm.energize()?),
        Commands::DeEnergize => report_ack(&arm.de_energize()?),
    }
    Ok(())
}

fn run_numeric(arm: &mut Arm, parameter: Parameter, value: Option<i32>) -> Result<()> {
    match value {
        Some(value) => {
            let ack = arm.set_numeric(parameter, value)?;
            report_ack(&ack);
        }
        None => {
            println!("{}", arm.query_numeric(parameter)?);
        }
    }
    Ok(())
}
