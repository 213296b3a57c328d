//! Trigger DSL parser
//!
//! Parses if/elif/else rule chains into structured blocks:
//!
//! ```text
//! # Error Watcher
//! if contains({agent}, "error")
//!     then cmx tell pm "{agent} has error"
//! elif idle({agent}, 30) and status({agent}) == busy
//!     then cmx tell pm "{agent} idle"
//! else
//!     then cmx tell pm "{agent} ok"
//! ```
//!
//! Triggers are only parsed here, never evaluated.

use crate::error::TriggerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator used by `context(...)` conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
}

impl CompareOp {
    /// Two-character operators first so `>=` is not read as `>`.
    const PARSE_ORDER: [CompareOp; 5] = [
        CompareOp::Gte,
        CompareOp::Lte,
        CompareOp::Gt,
        CompareOp::Lt,
        CompareOp::Eq,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
            CompareOp::Eq => "==",
        }
    }

    /// Split a leading operator off `s`.
    fn strip_from(s: &str) -> Option<(CompareOp, &str)> {
        Self::PARSE_ORDER
            .iter()
            .find_map(|op| s.strip_prefix(op.as_str()).map(|rest| (*op, rest)))
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trigger condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// `contains(agent, "pattern")`
    Contains { agent: String, pattern: String },
    /// `status(agent) == state`
    Status { agent: String, state: String },
    /// `idle(agent, seconds)`
    Idle { agent: String, seconds: u64 },
    /// `context(agent) op percent%`
    Context {
        agent: String,
        op: CompareOp,
        percent: u32,
    },
    /// `heartbeat seconds`
    Heartbeat { seconds: u64 },
    And {
        left: Box<Condition>,
        right: Box<Condition>,
    },
    /// The condition of an `else` clause
    Always,
}

impl Condition {
    pub fn kind(&self) -> &'static str {
        match self {
            Condition::Contains { .. } => "contains",
            Condition::Status { .. } => "status",
            Condition::Idle { .. } => "idle",
            Condition::Context { .. } => "context",
            Condition::Heartbeat { .. } => "heartbeat",
            Condition::And { .. } => "and",
            Condition::Always => "always",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Contains { agent, pattern } => write!(f, "contains({}, \"{}\")", agent, pattern),
            Condition::Status { agent, state } => write!(f, "status({}) == {}", agent, state),
            Condition::Idle { agent, seconds } => write!(f, "idle({}, {})", agent, seconds),
            Condition::Context { agent, op, percent } => {
                write!(f, "context({}) {} {}%", agent, op, percent)
            }
            Condition::Heartbeat { seconds } => write!(f, "heartbeat {}", seconds),
            Condition::And { left, right } => write!(f, "{} and {}", left, right),
            Condition::Always => f.write_str("always"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAction {
    /// Command text, placeholders such as `{agent}` kept verbatim
    pub command_template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerClause {
    pub condition: Condition,
    pub action: TriggerAction,
    pub is_else: bool,
}

impl TriggerClause {
    fn new(condition: Condition, is_else: bool) -> Self {
        Self {
            condition,
            action: TriggerAction::default(),
            is_else,
        }
    }
}

/// One if/elif/else chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerBlock {
    pub name: Option<String>,
    pub clauses: Vec<TriggerClause>,
}

/// Accumulates clauses until a block boundary.
#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<TriggerBlock>,
    name: Option<String>,
    clauses: Vec<TriggerClause>,
}

impl BlockBuilder {
    /// Close the current block, if it has clauses. The name goes with it.
    fn flush(&mut self) {
        if self.clauses.is_empty() {
            return;
        }
        self.blocks.push(TriggerBlock {
            name: self.name.take(),
            clauses: std::mem::take(&mut self.clauses),
        });
    }

    fn has_condition(&self) -> bool {
        self.clauses.iter().any(|clause| !clause.is_else)
    }

    fn finish(mut self) -> Vec<TriggerBlock> {
        self.flush();
        self.blocks
    }
}

/// Parse every trigger block in `text`.
///
/// Blocks end at a blank line, at a `#` name line, or at an `if` line once
/// the current block has a condition. Lines that are not part of the grammar
/// are ignored.
pub fn parse_triggers(text: &str) -> Result<Vec<TriggerBlock>, TriggerError> {
    let mut builder = BlockBuilder::default();

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if line.is_empty() {
            builder.flush();
            continue;
        }

        if line.starts_with('#') {
            builder.flush();
            builder.name = Some(line.trim_start_matches('#').trim().to_string());
            continue;
        }

        if let Some(expr) = line.strip_prefix("if ") {
            if builder.has_condition() {
                builder.flush();
            }
            let condition = parse_condition(expr)?;
            builder.clauses.push(TriggerClause::new(condition, false));
        } else if let Some(expr) = line.strip_prefix("elif ") {
            let condition = parse_condition(expr)?;
            builder.clauses.push(TriggerClause::new(condition, false));
        } else if line == "else" {
            builder.clauses.push(TriggerClause::new(Condition::Always, true));
        } else if line == "then" || line.starts_with("then ") {
            let command = line["then".len()..].trim();
            match builder.clauses.last_mut() {
                Some(clause) => clause.action.command_template = command.to_string(),
                None => {
                    return Err(TriggerError::ThenWithoutCondition {
                        line: line.to_string(),
                    })
                }
            }
        }
    }

    Ok(builder.finish())
}

/// Parse a single condition expression.
pub fn parse_condition(expr: &str) -> Result<Condition, TriggerError> {
    let trimmed = expr.trim();

    if let Some(pos) = find_and_split(trimmed) {
        let left = parse_condition(&trimmed[..pos])?;
        let right = parse_condition(&trimmed[pos + AND.len()..])?;
        return Ok(Condition::And {
            left: Box::new(left),
            right: Box::new(right),
        });
    }

    if trimmed.starts_with("contains(") {
        parse_contains(trimmed)
    } else if trimmed.starts_with("status(") {
        parse_status(trimmed)
    } else if trimmed.starts_with("idle(") {
        parse_idle(trimmed)
    } else if trimmed.starts_with("context(") {
        parse_context(trimmed)
    } else if trimmed.starts_with("heartbeat ") {
        parse_heartbeat(trimmed)
    } else {
        Err(TriggerError::UnknownCondition(trimmed.to_string()))
    }
}

const AND: &str = " and ";

/// Byte offset of the first ` and ` outside parentheses and quotes.
fn find_and_split(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quote = false;

    for (i, ch) in s.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            _ if in_quote => {}
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ' ' if depth == 0 && s[i..].starts_with(AND) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Text between `func(` and the last `)`.
fn extract_parens<'a>(s: &'a str, func: &str) -> Result<&'a str, TriggerError> {
    let prefix = format!("{}(", func);
    let inner = s
        .strip_prefix(prefix.as_str())
        .ok_or(TriggerError::ExpectedPrefix { prefix })?;
    let end = inner.rfind(')').ok_or_else(|| TriggerError::MissingParen {
        func: func.to_string(),
    })?;
    Ok(&inner[..end])
}

/// `agent, rest` split at the first comma.
fn split_first_arg(s: &str) -> Result<(&str, &str), TriggerError> {
    s.split_once(',')
        .map(|(first, rest)| (first.trim(), rest.trim()))
        .ok_or_else(|| TriggerError::MissingComma(s.to_string()))
}

fn extract_quoted(s: &str) -> Result<&str, TriggerError> {
    let trimmed = s.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| TriggerError::ExpectedQuoted(s.to_string()))
}

/// Agent argument of a single-argument call plus the text after `)`.
fn single_arg_call<'a>(s: &'a str, func: &str) -> Result<(&'a str, &'a str), TriggerError> {
    let inner = &s[func.len() + 1..];
    let close = inner.find(')').ok_or_else(|| TriggerError::MissingParen {
        func: func.to_string(),
    })?;
    Ok((inner[..close].trim(), inner[close + 1..].trim()))
}

fn parse_integer<T: std::str::FromStr>(s: &str, what: &str) -> Result<T, TriggerError> {
    s.trim().parse().map_err(|_| TriggerError::InvalidInteger {
        what: what.to_string(),
        value: s.trim().to_string(),
    })
}

fn parse_contains(s: &str) -> Result<Condition, TriggerError> {
    let inner = extract_parens(s, "contains")?;
    let (agent, rest) = split_first_arg(inner)?;
    let pattern = extract_quoted(rest)?;
    Ok(Condition::Contains {
        agent: agent.to_string(),
        pattern: pattern.to_string(),
    })
}

fn parse_status(s: &str) -> Result<Condition, TriggerError> {
    let (agent, after) = single_arg_call(s, "status")?;
    let state = after
        .strip_prefix("==")
        .ok_or_else(|| TriggerError::ExpectedOperator {
            func: "status".to_string(),
            agent: agent.to_string(),
            expected: "'=='".to_string(),
            found: after.to_string(),
        })?
        .trim();
    if state.is_empty() {
        return Err(TriggerError::MissingState {
            agent: agent.to_string(),
        });
    }
    Ok(Condition::Status {
        agent: agent.to_string(),
        state: state.to_string(),
    })
}

fn parse_idle(s: &str) -> Result<Condition, TriggerError> {
    let inner = extract_parens(s, "idle")?;
    let (agent, rest) = split_first_arg(inner)?;
    Ok(Condition::Idle {
        agent: agent.to_string(),
        seconds: parse_integer(rest, "seconds in idle")?,
    })
}

fn parse_context(s: &str) -> Result<Condition, TriggerError> {
    let (agent, after) = single_arg_call(s, "context")?;
    let (op, rest) = CompareOp::strip_from(after).ok_or_else(|| TriggerError::ExpectedOperator {
        func: "context".to_string(),
        agent: agent.to_string(),
        expected: "comparison operator".to_string(),
        found: after.to_string(),
    })?;
    let digits = rest.trim().trim_end_matches('%');
    Ok(Condition::Context {
        agent: agent.to_string(),
        op,
        percent: parse_integer(digits, "percent in context")?,
    })
}

fn parse_heartbeat(s: &str) -> Result<Condition, TriggerError> {
    let digits = &s["heartbeat ".len()..];
    Ok(Condition::Heartbeat {
        seconds: parse_integer(digits, "seconds in heartbeat")?,
    })
}
