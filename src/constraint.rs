//! Per-destination routing constraints.
//!
//! A constraint carries an optional arrival window, a priority class and a
//! service (dwell) duration. Constraints are collected between destination
//! selection and computation, and survive a failed computation attempt.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{DestinationId, Priority, TimeWindow};

/// Default dwell per stop when the operator sets nothing.
pub const DEFAULT_SERVICE_MINUTES: i32 = 15;

/// Constraints for one destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub window: Option<TimeWindow>,
    pub priority: Priority,
    pub service_minutes: i32,
}

impl Default for Constraint {
    fn default() -> Self {
        Self {
            window: None,
            priority: Priority::Medium,
            service_minutes: DEFAULT_SERVICE_MINUTES,
        }
    }
}

impl Constraint {
    pub fn dwell_secs(&self) -> i32 {
        self.service_minutes * 60
    }
}

/// Constraints keyed by destination, owned by the planning session.
///
/// A destination with no entry behaves as if it carried the defaults; a
/// missing entry is never an error.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    entries: HashMap<DestinationId, Constraint>,
}

impl ConstraintSet {
    /// One default constraint per selected destination.
    pub fn initialize<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = DestinationId>,
    {
        Self {
            entries: ids
                .into_iter()
                .map(|id| (id, Constraint::default()))
                .collect(),
        }
    }

    pub fn get(&self, id: &DestinationId) -> Constraint {
        self.entries.get(id).copied().unwrap_or_default()
    }

    /// Set the arrival window from minutes-of-day bounds. Both bounds are
    /// set together; `start < end` is validated at entry.
    pub fn set_window_minutes(
        &mut self,
        id: DestinationId,
        start_min: i32,
        end_min: i32,
    ) -> Result<()> {
        let window = TimeWindow::from_minutes(start_min, end_min)?;
        self.entries.entry(id).or_default().window = Some(window);
        Ok(())
    }

    /// Null both window bounds together; never one alone.
    pub fn clear_window(&mut self, id: DestinationId) {
        self.entries.entry(id).or_default().window = None;
    }

    pub fn set_priority(&mut self, id: DestinationId, priority: Priority) {
        self.entries.entry(id).or_default().priority = priority;
    }

    pub fn set_service_minutes(&mut self, id: DestinationId, minutes: i32) -> Result<()> {
        if minutes < 0 {
            return Err(Error::NegativeServiceDuration { minutes });
        }
        self.entries.entry(id).or_default().service_minutes = minutes;
        Ok(())
    }

    /// Replace the whole constraint for one destination, validating every
    /// field before any of them is written.
    pub fn set(
        &mut self,
        id: DestinationId,
        window_minutes: Option<(i32, i32)>,
        priority: Priority,
        service_minutes: i32,
    ) -> Result<()> {
        if service_minutes < 0 {
            return Err(Error::NegativeServiceDuration {
                minutes: service_minutes,
            });
        }
        let window = match window_minutes {
            Some((start_min, end_min)) => Some(TimeWindow::from_minutes(start_min, end_min)?),
            None => None,
        };
        self.entries.insert(
            id,
            Constraint {
                window,
                priority,
                service_minutes,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
