use thiserror::Error;

use crate::broker::BrokerError;

/// Failures surfaced by the subscription client.
///
/// Each variant names the stage that failed so the operator can tell a
/// connect problem from a subscribe problem. Cancellation is not an error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("cannot connect: {0}")]
    Connect(#[source] BrokerError),

    #[error("could not subscribe to {topic}: {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: BrokerError,
    },

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ToolError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ToolError::Validation(_))
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, ToolError::Connect(_))
    }

    pub fn is_subscribe(&self) -> bool {
        matches!(self, ToolError::Subscribe { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_stage() {
        let err = ToolError::Connect(BrokerError::NoServers);
        assert_eq!(
            err.to_string(),
            "cannot connect: no middleware servers configured"
        );

        let err = ToolError::Subscribe {
            topic: "fleet.events".into(),
            source: BrokerError::Rejected {
                code: 403,
                message: "denied".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "could not subscribe to fleet.events: broker rejected request (403): denied"
        );
    }
}
