//! 命令构造与编码
//!
//! RoboForth 采用后缀参数约定：参数在前，动词在后，
//! 序列化为 `"<args...> VERB<CR>"`。`Command` 一经构造不可变。

use std::fmt;

use crate::constants::*;

/// TELL 指令可寻址的关节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    Wrist,
    Hand,
}

impl Joint {
    /// 方言词汇
    pub fn as_word(self) -> &'static str {
        match self {
            Joint::Wrist => WRIST,
            Joint::Hand => HAND,
        }
    }
}

/// 可查询/设置的数值参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Speed,
    Accel,
}

impl Parameter {
    pub fn as_word(self) -> &'static str {
        match self {
            Parameter::Speed => SPEED,
            Parameter::Accel => ACCEL,
        }
    }
}

/// 动词后缀形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Suffix {
    /// 普通命令
    #[default]
    None,
    /// 查询形态（`SPEED ?`）
    Query,
    /// 立即执行形态（`30 SPEED !`）
    Imperative,
}

/// 一条待发送的 RoboForth 命令
///
/// 序列化形态：`"<args...> VERB[ ?| !]<CR>"`，参数为空时省略前导段。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: &'static str,
    args: Vec<String>,
    suffix: Suffix,
}

impl Command {
    /// 无参数的裸动词命令（PURGE、START、HOME 等）
    pub fn bare(verb: &'static str) -> Self {
        Self {
            verb,
            args: Vec::new(),
            suffix: Suffix::None,
        }
    }

    pub fn purge() -> Self {
        Self::bare(PURGE)
    }

    pub fn roboforth() -> Self {
        Self::bare(ROBOFORTH)
    }

    pub fn decimal() -> Self {
        Self::bare(DECIMAL)
    }

    pub fn start() -> Self {
        Self::bare(START)
    }

    pub fn joint_mode() -> Self {
        Self::bare(JOINT)
    }

    pub fn calibrate() -> Self {
        Self::bare(CALIBRATE)
    }

    pub fn home() -> Self {
        Self::bare(HOME)
    }

    pub fn cartesian() -> Self {
        Self::bare(CARTESIAN)
    }

    pub fn where_query() -> Self {
        Self::bare(WHERE)
    }

    pub fn energize() -> Self {
        Self::bare(ENERGIZE)
    }

    pub fn de_energize() -> Self {
        Self::bare(DE_ENERGIZE)
    }

    /// 笛卡尔定位：`"<x> <y> <z> MOVETO"`
    pub fn move_to(x: i32, y: i32, z: i32) -> Self {
        Self {
            verb: MOVETO,
            args: vec![x.to_string(), y.to_string(), z.to_string()],
            suffix: Suffix::None,
        }
    }

    /// 关节转动：`"TELL <joint> <value> MOVETO"`（绝对）
    /// 或 `"TELL <joint> <value> MOVE"`（相对增量）
    pub fn tell(joint: Joint, value: i32, relative: bool) -> Self {
        Self {
            verb: if relative { MOVE } else { MOVETO },
            args: vec![
                TELL.to_string(),
                joint.as_word().to_string(),
                value.to_string(),
            ],
            suffix: Suffix::None,
        }
    }

    /// 参数查询：`"SPEED ?"`
    pub fn query(parameter: Parameter) -> Self {
        Self {
            verb: parameter.as_word(),
            args: Vec::new(),
            suffix: Suffix::Query,
        }
    }

    /// 参数设置：`"<value> SPEED !"`
    pub fn set(parameter: Parameter, value: i32) -> Self {
        Self {
            verb: parameter.as_word(),
            args: vec![value.to_string()],
            suffix: Suffix::Imperative,
        }
    }

    /// 不含终结符的文本形态（用于日志与回显比对）
    pub fn as_text(&self) -> String {
        let mut text = String::new();
        for arg in &self.args {
            text.push_str(arg);
            text.push(' ');
        }
        text.push_str(self.verb);
        match self.suffix {
            Suffix::None => {}
            Suffix::Query => text.push_str(QUERY_SUFFIX),
            Suffix::Imperative => text.push_str(IMPERATIVE_SUFFIX),
        }
        text
    }

    /// 线上字节形态：文本 + CR
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.as_text().into_bytes();
        bytes.extend_from_slice(CR.as_bytes());
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_command_encoding() {
        assert_eq!(Command::purge().encode(), b"PURGE\r");
        assert_eq!(Command::roboforth().as_text(), "ROBOFORTH");
        assert_eq!(Command::de_energize().encode(), b"DE-ENERGIZE\r");
    }

    #[test]
    fn test_move_to_postfix_order() {
        let cmd = Command::move_to(100, -200, 50);
        assert_eq!(cmd.as_text(), "100 -200 50 MOVETO");
        assert_eq!(cmd.encode(), b"100 -200 50 MOVETO\r");
    }

    #[test]
    fn test_tell_absolute_and_relative() {
        assert_eq!(
            Command::tell(Joint::Wrist, 90, false).as_text(),
            "TELL WRIST 90 MOVETO"
        );
        assert_eq!(
            Command::tell(Joint::Hand, -15, true).as_text(),
            "TELL HAND -15 MOVE"
        );
    }

    #[test]
    fn test_query_and_imperative_suffixes() {
        assert_eq!(Command::query(Parameter::Speed).as_text(), "SPEED ?");
        assert_eq!(Command::query(Parameter::Accel).encode(), b"ACCEL ?\r");
        assert_eq!(Command::set(Parameter::Speed, 30).as_text(), "30 SPEED !");
        assert_eq!(Command::set(Parameter::Accel, 120).encode(), b"120 ACCEL !\r");
    }

    #[test]
    fn test_display_matches_text() {
        let cmd = Command::move_to(1, 2, 3);
        assert_eq!(format!("{}", cmd), cmd.as_text());
    }
}
