use thiserror::Error;

use crate::types::Slot;

/// Errors scoped to one connection or one match. None of them stops the server.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("both slots are taken")]
    CapacityExceeded,
    #[error("command ignored: {0}")]
    InvalidCommand(&'static str),
    #[error("could not enqueue message for {client_id}")]
    DeliveryFailure { client_id: String },
    #[error("slot {slot} left a running match")]
    PrematureDisconnect { slot: Slot },
}
