use std::fmt;
use thiserror::Error;

/// A stage of the single-point workflow at which the engine can report an error.
///
/// The discriminants are the status codes reported across the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    MoleculeConstruction = 1,
    VerbosityConfiguration = 2,
    Parametrization = 3,
    SinglePoint = 4,
    ResultExtraction = 5,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::MoleculeConstruction,
        Phase::VerbosityConfiguration,
        Phase::Parametrization,
        Phase::SinglePoint,
        Phase::ResultExtraction,
    ];

    pub fn status_code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::MoleculeConstruction => "molecule construction",
            Phase::VerbosityConfiguration => "verbosity configuration",
            Phase::Parametrization => "parametrization loading",
            Phase::SinglePoint => "single-point execution",
            Phase::ResultExtraction => "result extraction",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum XtbError {
    #[error("xtb API version mismatch: built against {expected}, library reports {found}")]
    ApiVersionMismatch { expected: i32, found: i32 },

    #[error("Invalid molecular input: {0}")]
    InvalidInput(String),

    #[error("xtb failed during {phase}: {message}")]
    Engine { phase: Phase, message: String },
}

impl XtbError {
    /// The phase-ordinal status code of an engine failure.
    ///
    /// Version mismatches and rejected input happen before the engine is driven
    /// and have no place in the numbered taxonomy.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            XtbError::Engine { phase, .. } => Some(phase.status_code()),
            XtbError::ApiVersionMismatch { .. } | XtbError::InvalidInput(_) => None,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            XtbError::Engine { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_status_codes_follow_workflow_order() {
        let codes: Vec<i32> = Phase::ALL.iter().map(|p| p.status_code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn engine_error_reports_phase_status_code() {
        let err = XtbError::Engine {
            phase: Phase::SinglePoint,
            message: "SCC did not converge".to_string(),
        };
        assert_eq!(err.status_code(), Some(4));
        assert_eq!(err.phase(), Some(Phase::SinglePoint));
        assert_eq!(
            err.to_string(),
            "xtb failed during single-point execution: SCC did not converge"
        );
    }

    #[test]
    fn precondition_errors_have_no_status_code() {
        let mismatch = XtbError::ApiVersionMismatch {
            expected: 60701,
            found: 60500,
        };
        assert_eq!(mismatch.status_code(), None);
        assert_eq!(XtbError::InvalidInput("empty".into()).status_code(), None);
    }
}
