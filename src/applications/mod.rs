//! Application and applicant lifecycle: fee arithmetic, the payment state
//! machine, and admin-driven per-applicant status transitions.

pub mod codes;
pub mod domain;
pub mod draft;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use domain::{
    Applicant, ApplicantDocument, Application, ApplicationStatus, PaymentStatus,
    StatusHistoryEntry,
};
pub use draft::{DraftApplicant, DraftApplication};
pub use workflow::{ApplicationWorkflow, NewApplicant, NewApplication, NewDocument, WorkflowError};
