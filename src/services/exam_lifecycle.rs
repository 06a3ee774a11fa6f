use thiserror::Error;

use crate::db::types::ExamStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum LifecycleError {
    #[error("Invalid status value")]
    InvalidStatus(String),
    #[error("Cannot move exam from {from} to {to}")]
    IllegalTransition { from: ExamStatus, to: ExamStatus },
}

/// Outcome of applying a requested status to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Unchanged,
    Move { from: ExamStatus, to: ExamStatus },
}

const ALLOWED: &[(ExamStatus, ExamStatus)] = &[
    (ExamStatus::Draft, ExamStatus::Published),
    (ExamStatus::Draft, ExamStatus::Closed),
    (ExamStatus::Published, ExamStatus::Closed),
];

pub(crate) fn parse_status(raw: &str) -> Result<ExamStatus, LifecycleError> {
    ExamStatus::parse(raw).ok_or_else(|| LifecycleError::InvalidStatus(raw.to_string()))
}

pub(crate) fn is_allowed(from: ExamStatus, to: ExamStatus) -> bool {
    ALLOWED.iter().any(|&(allowed_from, allowed_to)| allowed_from == from && allowed_to == to)
}

pub(crate) fn plan_transition(
    current: ExamStatus,
    requested: ExamStatus,
) -> Result<Transition, LifecycleError> {
    if current == requested {
        return Ok(Transition::Unchanged);
    }

    if is_allowed(current, requested) {
        Ok(Transition::Move { from: current, to: requested })
    } else {
        Err(LifecycleError::IllegalTransition { from: current, to: requested })
    }
}

/// Students may only discover and attempt published exams.
pub(crate) fn is_visible_to_students(status: ExamStatus) -> bool {
    status == ExamStatus::Published
}

/// Question content is frozen once an exam leaves draft.
pub(crate) fn is_editable(status: ExamStatus) -> bool {
    status == ExamStatus::Draft
}

/// Legacy flag kept in sync with the lifecycle.
pub(crate) fn is_active_flag(status: ExamStatus) -> bool {
    status != ExamStatus::Closed
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ExamStatus; 3] = [ExamStatus::Draft, ExamStatus::Published, ExamStatus::Closed];

    #[test]
    fn forward_transitions_are_allowed() {
        assert_eq!(
            plan_transition(ExamStatus::Draft, ExamStatus::Published),
            Ok(Transition::Move { from: ExamStatus::Draft, to: ExamStatus::Published })
        );
        assert!(plan_transition(ExamStatus::Published, ExamStatus::Closed).is_ok());
        assert!(plan_transition(ExamStatus::Draft, ExamStatus::Closed).is_ok());
    }

    #[test]
    fn backward_transitions_are_rejected() {
        for (from, to) in [
            (ExamStatus::Closed, ExamStatus::Published),
            (ExamStatus::Closed, ExamStatus::Draft),
            (ExamStatus::Published, ExamStatus::Draft),
        ] {
            assert_eq!(
                plan_transition(from, to),
                Err(LifecycleError::IllegalTransition { from, to }),
                "{from} -> {to}"
            );
        }
    }

    #[test]
    fn same_state_is_a_no_op() {
        for status in ALL {
            assert_eq!(plan_transition(status, status), Ok(Transition::Unchanged));
        }
    }

    #[test]
    fn closed_is_terminal() {
        for to in ALL {
            if to != ExamStatus::Closed {
                assert!(!is_allowed(ExamStatus::Closed, to));
            }
        }
    }

    #[test]
    fn parse_status_rejects_unknown_values() {
        assert_eq!(parse_status("published"), Ok(ExamStatus::Published));
        let err = parse_status("archived").unwrap_err();
        assert_eq!(err.to_string(), "Invalid status value");
    }

    #[test]
    fn illegal_transition_message_names_states() {
        let err = plan_transition(ExamStatus::Closed, ExamStatus::Published).unwrap_err();
        assert_eq!(err.to_string(), "Cannot move exam from closed to published");
    }

    #[test]
    fn visibility_and_flags_follow_status() {
        assert!(is_visible_to_students(ExamStatus::Published));
        assert!(!is_visible_to_students(ExamStatus::Draft));
        assert!(!is_visible_to_students(ExamStatus::Closed));
        assert!(is_editable(ExamStatus::Draft));
        assert!(!is_editable(ExamStatus::Published));
        assert!(!is_active_flag(ExamStatus::Closed));
        assert!(is_active_flag(ExamStatus::Published));
    }
}
