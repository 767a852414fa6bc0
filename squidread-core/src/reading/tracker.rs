//! Reading-position persistence
//!
//! Positions are written on every settled relocation and again when the page
//! is hidden or about to terminate, since a relocation handler can be cut
//! short when the process is killed mid-transition.

use super::session::ReadingSession;
use crate::library::Library;
use crate::types::LocationToken;
use serde::{Deserialize, Serialize};

/// Events that cause the current position to be persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Trigger {
    /// Navigation settled at a new location
    Relocated { location: LocationToken },

    /// The page became hidden or backgrounded
    Hidden,

    /// The process is about to terminate
    Terminating,
}

impl Trigger {
    pub fn relocated(location: impl Into<LocationToken>) -> Self {
        Trigger::Relocated {
            location: location.into(),
        }
    }
}

/// Outcome of a best-effort write
///
/// Always produced; a failure is logged where it happens and never
/// propagated or retried.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
#[must_use]
pub enum BestEffort {
    Saved { location: LocationToken },
    Skipped { reason: &'static str },
    Failed { error: String },
}

impl BestEffort {
    pub fn is_saved(&self) -> bool {
        matches!(self, BestEffort::Saved { .. })
    }
}

/// Writes session positions back to the library
#[derive(Clone)]
pub struct PositionTracker {
    library: Library,
}

impl PositionTracker {
    pub fn new(library: Library) -> Self {
        Self { library }
    }

    /// Persist `location` for the session's book
    ///
    /// The stored record is re-read before writing so fields changed by
    /// others (e.g. `last_opened`) are not clobbered.
    pub async fn persist(
        &self,
        session: &mut ReadingSession,
        location: Option<LocationToken>,
    ) -> BestEffort {
        let Some(location) = location else {
            return BestEffort::Skipped {
                reason: "no current location",
            };
        };

        match self
            .library
            .set_location(session.book_id(), Some(location.clone()))
            .await
        {
            Ok(record) => {
                tracing::debug!("Persisted current location for {}", record.id);
                session.record = record;
                BestEffort::Saved { location }
            }
            Err(e) => {
                tracing::debug!("Failed to persist current location: {}", e);
                BestEffort::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
