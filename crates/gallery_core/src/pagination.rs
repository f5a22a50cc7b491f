use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a multi-page crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationState {
    #[default]
    Idle,
    #[serde(alias = "paginating")]
    Running,
    Paused,
    Cancelled,
    Error,
    #[serde(alias = "stopped")]
    Complete,
}

/// User-issued control command for the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationCommand {
    Start,
    Stop,
    Pause,
    Resume,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {command:?} pagination while {from:?}")]
pub struct TransitionError {
    pub from: PaginationState,
    pub command: PaginationCommand,
}

impl PaginationState {
    /// `Cancelled` and `Complete` end a session; only `start` leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, PaginationState::Cancelled | PaginationState::Complete)
    }

    /// Apply a control command, returning the next state.
    pub fn apply(self, command: PaginationCommand) -> Result<Self, TransitionError> {
        use PaginationCommand as C;
        use PaginationState as S;

        let next = match (command, self) {
            (C::Start, S::Idle | S::Cancelled | S::Complete | S::Error) => S::Running,
            (C::Pause, S::Running) => S::Paused,
            (C::Resume, S::Paused) => S::Running,
            (C::Cancel, S::Running | S::Paused) => S::Cancelled,
            (C::Stop, S::Running) => S::Complete,
            _ => {
                return Err(TransitionError {
                    from: self,
                    command,
                })
            }
        };
        Ok(next)
    }

    /// Whether a status report claiming `reported` may move the session there.
    ///
    /// Reporting the current state is always accepted (routine progress).
    pub fn accepts_report(self, reported: Self) -> bool {
        use PaginationState as S;

        if self == reported {
            return true;
        }
        matches!(
            (self, reported),
            (S::Running, S::Paused | S::Cancelled | S::Error | S::Complete)
                | (S::Paused, S::Running | S::Cancelled)
                | (S::Idle | S::Cancelled | S::Complete | S::Error, S::Running)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationStatus {
    pub state: PaginationState,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Progress or state report sent by the scraping tab.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationReport {
    #[serde(default, alias = "status", skip_serializing_if = "Option::is_none")]
    pub state: Option<PaginationState>,
    #[serde(
        default,
        rename = "currentPage",
        alias = "pageNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaginationStatus {
    /// Apply a command; on success a `start` also resets the page counter.
    pub fn apply_command(&mut self, command: PaginationCommand) -> Result<(), TransitionError> {
        let next = self.state.apply(command)?;
        if command == PaginationCommand::Start {
            self.current_page = 0;
            self.error = None;
        }
        self.state = next;
        Ok(())
    }

    /// Fold a report into the status.
    ///
    /// The page number is always taken. The reported state is only taken when
    /// it is a legal move; returns `false` when it was rejected.
    pub fn apply_report(&mut self, report: &PaginationReport) -> bool {
        if let Some(page) = report.current_page {
            self.current_page = page;
        }

        let accepted = match report.state {
            Some(next) if self.state.accepts_report(next) => {
                self.state = next;
                true
            }
            Some(_) => false,
            None => true,
        };

        match &report.error {
            Some(message) => self.error = Some(message.clone()),
            None if self.state != PaginationState::Error => self.error = None,
            None => {}
        }
        accepted
    }
}
