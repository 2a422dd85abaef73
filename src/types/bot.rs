use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::time::option_datetime;

/// Whether the remote agent is currently permitted to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Active,
    OnHold,
    Stopped,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Active => "ACTIVE",
            LifecycleState::OnHold => "ON_HOLD",
            LifecycleState::Stopped => "STOPPED",
        }
    }

    pub fn is_trading(&self) -> bool {
        matches!(self, LifecycleState::Active)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When and why the lifecycle state last changed. Always replaced as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusChange {
    #[serde(rename = "lastStatusChange", default, with = "option_datetime")]
    pub at: Option<NaiveDateTime>,
    #[serde(rename = "statusChangeReason", default)]
    pub reason: String,
}

/// Snapshot of the agent's lifecycle as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotStatus {
    #[serde(rename = "status")]
    pub state: LifecycleState,
    #[serde(flatten)]
    pub change: StatusChange,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub success: bool,
}

impl BotStatus {
    pub fn reason(&self) -> &str {
        &self.change.reason
    }

    pub fn changed_at(&self) -> Option<NaiveDateTime> {
        self.change.at
    }

    /// Same state reached through the same recorded change. `message` is
    /// ignored since transition replies and status reads word it differently.
    pub fn same_transition(&self, other: &BotStatus) -> bool {
        self.state == other.state && self.change == other.change
    }
}

/// The closed set of state-changing commands the operator can issue.
/// Every variant answers with a fresh [`BotStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum LifecycleCommand {
    Activate { reason: Option<String> },
    Hold { reason: Option<String> },
    Stop { reason: Option<String> },
    /// Reinitialises the balance; the resulting lifecycle state is whatever the gateway reports.
    Reset { initial_balance: Decimal },
}

impl LifecycleCommand {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleCommand::Activate { .. } => "activate",
            LifecycleCommand::Hold { .. } => "hold",
            LifecycleCommand::Stop { .. } => "stop",
            LifecycleCommand::Reset { .. } => "reset",
        }
    }

    /// The state this command asks for. `None` for reset.
    pub fn requested_state(&self) -> Option<LifecycleState> {
        match self {
            LifecycleCommand::Activate { .. } => Some(LifecycleState::Active),
            LifecycleCommand::Hold { .. } => Some(LifecycleState::OnHold),
            LifecycleCommand::Stop { .. } => Some(LifecycleState::Stopped),
            LifecycleCommand::Reset { .. } => None,
        }
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleCommand::Activate { reason }
            | LifecycleCommand::Hold { reason }
            | LifecycleCommand::Stop { reason } => match reason {
                Some(r) if !r.is_empty() => write!(f, "{} ({})", self.name(), r),
                _ => write!(f, "{}", self.name()),
            },
            LifecycleCommand::Reset { initial_balance } => {
                write!(f, "reset (initial balance {})", initial_balance)
            }
        }
    }
}
