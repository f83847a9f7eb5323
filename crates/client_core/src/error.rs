use shared::error::FieldError;
use thiserror::Error;

/// Failures surfaced by the remote booking API, collapsed to the four kinds
/// the wizard must tell apart. Everything here is recoverable except
/// `NotFound`, which ends the flow before it can start.
#[derive(Debug, Error)]
pub enum BookingApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation rejected: {}", summarize_fields(.fields))]
    Validation { fields: Vec<FieldError> },
    #[error("selected slot is no longer available")]
    SlotConflict,
    #[error("transport failure: {0}")]
    Transport(String),
}

impl BookingApiError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

fn summarize_fields(fields: &[FieldError]) -> String {
    if fields.is_empty() {
        return "no field detail".into();
    }
    fields
        .iter()
        .map(|f| f.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by the wizard controller itself. API failures pass through
/// unchanged so callers can branch on the taxonomy; the local variants cover
/// transitions the current step does not offer.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Api(#[from] BookingApiError),
    #[error("operation not available in step {step}")]
    StepMismatch { step: &'static str },
    #[error("service {0} is not offered by this professional")]
    UnknownService(i64),
    #[error("slot was not offered by the displayed availability")]
    SlotNotOffered,
    #[error("client info rejected: {}", summarize_fields(.fields))]
    InvalidClientInfo { fields: Vec<FieldError> },
}

impl WizardError {
    /// Field-level detail for form rendering, when the failure carries any.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::InvalidClientInfo { fields } => fields,
            Self::Api(BookingApiError::Validation { fields }) => fields,
            _ => &[],
        }
    }
}
