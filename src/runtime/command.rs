//! Control commands understood by the graph runner.

use std::fmt;

use crate::types::NodeId;

/// A control command sent to the runner as an unframed UTF-8 token.
///
/// `Goto` concatenates the token and the decimal node ID with no delimiter
/// (`GOTO17`), exactly as the runner expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerCommand {
    /// Suspend execution after the current node.
    Pause,
    /// Resume execution.
    Unpause,
    /// Execute one node, then re-enter the paused state.
    Step,
    /// Terminate the runner process.
    Kill,
    /// Load the most recently transmitted graph payload.
    Update,
    /// Execute the node with the given ID next.
    Goto(NodeId),
}

impl RunnerCommand {
    /// Wire encoding of the command token.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunnerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerCommand::Pause => write!(f, "PAUSE"),
            RunnerCommand::Unpause => write!(f, "UNPAUSE"),
            RunnerCommand::Step => write!(f, "STEP"),
            RunnerCommand::Kill => write!(f, "KILL"),
            RunnerCommand::Update => write!(f, "UPDATE"),
            RunnerCommand::Goto(id) => write!(f, "GOTO{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_tokens() {
        assert_eq!(RunnerCommand::Pause.encode(), "PAUSE");
        assert_eq!(RunnerCommand::Unpause.encode(), "UNPAUSE");
        assert_eq!(RunnerCommand::Step.encode(), "STEP");
        assert_eq!(RunnerCommand::Kill.encode(), "KILL");
        assert_eq!(RunnerCommand::Update.encode(), "UPDATE");
    }

    #[test]
    fn goto_concatenates_without_delimiter() {
        assert_eq!(RunnerCommand::Goto(NodeId(17)).encode(), "GOTO17");
    }
}
