//! 遥测解析
//!
//! WHERE 应答为固定格式：前两行是回显与表头，第 3 行为当前位姿，
//! 第 4 行为上一位姿（行首带一个标签词）。数值查询应答把结果放在
//! 倒数第二个空白分隔词上。所有解析都是确定性的纯函数：相同文本
//! 永远产出相同结果，数值解析失败一律折算为
//! [`ProtocolError::MalformedTelemetry`]，绝不向外抛出裸解析错误。

use std::fmt;

use crate::ProtocolError;
use crate::response::{RawResponse, is_sentinel_line};

/// 位姿数值的单位刻度
///
/// 会话级配置，不从应答文本推断。十进制模式下设备输出带小数点的
/// 十分位值（`150.0`），剥离小数点后即为原生单位的 10 倍整数值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UnitScale {
    /// 原生整数单位
    #[default]
    Integer,
    /// 十分位模式（DECIMAL），数值为原生单位 ×10
    Decimal,
}

/// 笛卡尔位姿：五个有符号整数，设备原生单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub pitch: i32,
    pub roll: i32,
}

impl Position {
    /// 遥测不可用时的约定回退值
    pub const ZERO: Position = Position {
        x: 0,
        y: 0,
        z: 0,
        pitch: 0,
        roll: 0,
    };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(x={}, y={}, z={}, pitch={}, roll={})",
            self.x, self.y, self.z, self.pitch, self.roll
        )
    }
}

/// 空白切词，容忍引号包裹的内嵌格式
///
/// 引号（单/双）内的空白不切分，引号本身剥离。未闭合的引号按
/// 到行尾处理。
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// 按会话刻度解析一个有符号数值词
fn parse_scaled(token: &str, scale: UnitScale) -> Option<i32> {
    let token = token.trim();
    match scale {
        UnitScale::Integer => token.parse().ok(),
        // 十进制模式：剥离小数点（150.0 -> 1500），与设备十分位输出对齐
        UnitScale::Decimal => token.replace('.', "").parse().ok(),
    }
}

/// 把一行位姿词解析为 [`Position`]
fn parse_pose(tokens: &[String], scale: UnitScale, raw: &RawResponse) -> Result<Position, ProtocolError> {
    if tokens.len() != 5 {
        return Err(ProtocolError::malformed(
            format!("expected 5 pose tokens, found {}", tokens.len()),
            raw.text(),
        ));
    }
    let mut values = [0i32; 5];
    for (slot, token) in values.iter_mut().zip(tokens) {
        *slot = parse_scaled(token, scale).ok_or_else(|| {
            ProtocolError::malformed(format!("non-numeric pose token {token:?}"), raw.text())
        })?;
    }
    Ok(Position {
        x: values[0],
        y: values[1],
        z: values[2],
        pitch: values[3],
        roll: values[4],
    })
}

/// 解析 WHERE 应答，返回（当前位姿，上一位姿）
///
/// 哨兵行不计入正文；正文不足 4 行或任一数值词解析失败都报
/// `MalformedTelemetry`。调用方（会话层）在失败时以
/// [`Position::ZERO`] 回填缓存，同时把错误原样上抛，
/// 使"臂确实在原点"与"遥测不可用"可区分。
pub fn parse_where(
    raw: &RawResponse,
    scale: UnitScale,
) -> Result<(Position, Position), ProtocolError> {
    let mut body: &[String] = &raw.lines;
    if let Some(last) = body.last()
        && is_sentinel_line(last)
    {
        body = &body[..body.len() - 1];
    }

    if body.len() < 4 {
        return Err(ProtocolError::malformed(
            format!("expected at least 4 lines before sentinel, found {}", body.len()),
            raw.text(),
        ));
    }

    let current = parse_pose(&tokenize(&body[2]), scale, raw)?;

    // 第 4 行行首是上一位姿的标签词，跳过后才是数值
    let prev_tokens = tokenize(&body[3]);
    if prev_tokens.is_empty() {
        return Err(ProtocolError::malformed("empty previous-pose line", raw.text()));
    }
    let previous = parse_pose(&prev_tokens[1..], scale, raw)?;

    Ok((current, previous))
}

/// 解析数值查询应答（SPEED/ACCEL），取倒数第二个空白分隔词
pub fn parse_numeric_reply(raw: &RawResponse) -> Result<i32, ProtocolError> {
    let tokens: Vec<&str> = raw
        .lines
        .iter()
        .flat_map(|line| line.split_whitespace())
        .collect();

    if tokens.len() < 2 {
        return Err(ProtocolError::malformed(
            "reply too short for a numeric value",
            raw.text(),
        ));
    }
    let token = tokens[tokens.len() - 2];
    token.parse().map_err(|_| {
        ProtocolError::malformed(format!("non-numeric reply token {token:?}"), raw.text())
    })
}
