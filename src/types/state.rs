use std::fmt;

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};

/// State of a single issue as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn label(self) -> &'static str {
        match self {
            IssueState::Open => "Open",
            IssueState::Closed => "Closed",
        }
    }

    /// Get the colored label for terminal output.
    pub fn colored(self) -> String {
        match self {
            IssueState::Open => self.label().green().to_string(),
            IssueState::Closed => self.label().magenta().to_string(),
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Which issues a listing or search should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateFilter {
    /// Open issues only
    #[default]
    Open,
    /// Closed issues only
    Closed,
    /// Both open and closed issues
    All,
}

impl StateFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StateFilter::Open => "OPEN",
            StateFilter::Closed => "CLOSED",
            StateFilter::All => "ALL",
        }
    }

    /// The single issue state this filter narrows to, if any.
    pub fn issue_state(self) -> Option<IssueState> {
        match self {
            StateFilter::Open => Some(IssueState::Open),
            StateFilter::Closed => Some(IssueState::Closed),
            StateFilter::All => None,
        }
    }

    /// Search qualifier such as `is:open`, absent for `All`.
    pub fn qualifier(self) -> Option<&'static str> {
        match self {
            StateFilter::Open => Some("is:open"),
            StateFilter::Closed => Some("is:closed"),
            StateFilter::All => None,
        }
    }
}

impl fmt::Display for StateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_lowercase())
    }
}

impl std::str::FromStr for StateFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(StateFilter::Open),
            "closed" => Ok(StateFilter::Closed),
            "all" => Ok(StateFilter::All),
            other => Err(format!("unknown state '{other}' (expected open, closed or all)")),
        }
    }
}
