use log::debug;

use crate::config::*;
use crate::events::{Event, EventSink};

/// Finds the attendance columns of a subject.
///
/// The subject label sits on the total column of its theory block. The lab block, if
/// any, starts three columns to the right, under the same merged label.
/// When a subject appears several times in the header, the first one is used.
pub fn resolve(
    header: &Header,
    subject: &str,
    attendance_type: AttendanceType,
) -> Result<ColumnTriplet, AttendanceError> {
    let key = subject.trim().to_uppercase();
    let idx = header
        .position(&key)
        .ok_or_else(|| AttendanceError::SubjectNotFound {
            subject: key.clone(),
        })?;
    debug!(
        "resolve: subject {} at column {}, layout {:?}",
        key,
        idx,
        header.layout(idx)
    );

    let start = match attendance_type {
        AttendanceType::Theory => idx,
        AttendanceType::Lab => match header.layout(idx) {
            Some(ColumnLayout::TheoryAndLab) => idx + 3,
            _ => return Err(AttendanceError::NoLabData { subject: key }),
        },
    };
    let triplet = ColumnTriplet::starting_at(start);
    if triplet.percentage >= header.len() {
        return Err(AttendanceError::ColumnOutOfRange {
            column: triplet.percentage,
            width: header.len(),
        });
    }
    Ok(triplet)
}

/// Same as [resolve], reporting the outcome to the sink.
pub fn resolve_observed(
    header: &Header,
    subject: &str,
    attendance_type: AttendanceType,
    sink: &dyn EventSink,
) -> Result<ColumnTriplet, AttendanceError> {
    let res = resolve(header, subject, attendance_type);
    let subject = subject.trim().to_uppercase();
    match &res {
        Ok(triplet) => sink.emit(&Event::Resolved {
            subject,
            attendance_type,
            triplet: *triplet,
        }),
        Err(e) => sink.emit(&Event::ResolutionFailed {
            subject,
            error: e.clone(),
        }),
    }
    res
}
