use log::{info, warn};

use crate::config::*;

/// What happened while resolving and highlighting a request.
#[derive(PartialEq, Debug, Clone)]
pub enum Event {
    Resolved {
        subject: String,
        attendance_type: AttendanceType,
        triplet: ColumnTriplet,
    },
    ResolutionFailed {
        subject: String,
        error: AttendanceError,
    },
    Highlighted {
        column: usize,
        marked: usize,
        threshold: f64,
    },
}

/// Receives the events of the engine.
pub trait EventSink {
    fn emit(&self, event: &Event);
}

/// Forwards the events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &Event) {
        match event {
            Event::Resolved {
                subject,
                attendance_type,
                triplet,
            } => info!(
                "Resolved {} ({}): total={} attended={} percentage={}",
                subject,
                attendance_type.code(),
                triplet.total,
                triplet.attended,
                triplet.percentage
            ),
            Event::ResolutionFailed { subject, error } => {
                warn!("Could not resolve {}: {}", subject, error)
            }
            Event::Highlighted {
                column,
                marked,
                threshold,
            } => info!(
                "Highlighted {} cells below {} in column {}",
                marked, threshold, column
            ),
        }
    }
}
