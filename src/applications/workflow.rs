use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use crate::catalog::BindingRepository;
use crate::config::PortalSettings;
use crate::storage::{self, keys, KeyValueStore, StorageError};
use crate::templates::FormData;

use super::codes;
use super::domain::{
    Applicant, ApplicantDocument, Application, ApplicationStatus, PaymentStatus,
    StatusHistoryEntry,
};
use super::draft::DraftApplication;

/// Errors raised by workflow mutations. Read misses stay `Option`; these
/// cover mutations aimed at a missing target or a terminal state.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("application '{0}' not found")]
    ApplicationNotFound(String),
    #[error("applicant '{0}' not found")]
    ApplicantNotFound(String),
    #[error("an application must keep at least one applicant")]
    LastApplicant,
    #[error("application '{0}' is no longer pending payment")]
    NotPending(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Input for creating an application.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub nationality_code: String,
    pub destination_code: String,
    pub visa_type_id: String,
    pub template_id: String,
    pub user_email: String,
    pub expedited: bool,
}

/// Input for appending a traveler to an application.
#[derive(Debug, Clone, Default)]
pub struct NewApplicant {
    pub email: String,
    pub phone: Option<String>,
    pub is_main_applicant: bool,
    pub form_data: FormData,
    pub documents: Vec<ApplicantDocument>,
}

/// Uploaded-file metadata for attaching a document to an applicant.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub field_id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub storage_key: String,
}

/// Owns the application lifecycle: fee arithmetic against the binding
/// repository, the pending/paid/expired payment machine, and per-applicant
/// status transitions. All mutations persist the full application
/// collection; the model assumes a single writer.
pub struct ApplicationWorkflow<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    bindings: BindingRepository<S>,
    settings: PortalSettings,
}

impl<S: KeyValueStore + ?Sized> ApplicationWorkflow<S> {
    pub fn new(store: Arc<S>, settings: PortalSettings) -> Self {
        Self {
            bindings: BindingRepository::new(store.clone()),
            store,
            settings,
        }
    }

    pub fn bindings(&self) -> &BindingRepository<S> {
        &self.bindings
    }

    pub fn all(&self) -> Vec<Application> {
        storage::load_collection(self.store.as_ref(), keys::APPLICATIONS)
    }

    pub fn by_id(&self, id: &str) -> Option<Application> {
        self.all().into_iter().find(|a| a.id == id)
    }

    pub fn by_resume_token(&self, token: &str) -> Option<Application> {
        self.all().into_iter().find(|a| a.resume_token == token)
    }

    pub fn by_user_email(&self, email: &str) -> Vec<Application> {
        self.all()
            .into_iter()
            .filter(|a| a.user_email.eq_ignore_ascii_case(email))
            .collect()
    }

    /// Track an applicant by the (email, application code) pair printed on
    /// the confirmation page.
    pub fn by_applicant_code(&self, email: &str, code: &str) -> Option<(Application, Applicant)> {
        for application in self.all() {
            let found = application.applicants.iter().find(|a| {
                a.email.eq_ignore_ascii_case(email)
                    && a.application_code.as_deref() == Some(code)
            });
            if let Some(applicant) = found {
                let applicant = applicant.clone();
                return Some((application, applicant));
            }
        }
        None
    }

    /// Create an application with no applicants yet. Fee resolution is
    /// fail-soft: an unresolvable (nationality, destination, visa type)
    /// triple yields a zero fee and the configured default currency, never
    /// an error, because the page must still render.
    pub fn create_application(&self, input: NewApplication) -> Result<Application, WorkflowError> {
        let fees = self.bindings.fees_for(
            &input.nationality_code,
            &input.destination_code,
            &input.visa_type_id,
        );

        let base_fee = fees.as_ref().map(|f| f.government_fee + f.service_fee).unwrap_or(0);
        let expedited_fee = match &fees {
            Some(f) if input.expedited && f.expedited_enabled => f.expedited_fee.unwrap_or(0),
            _ => 0,
        };
        let currency = fees
            .map(|f| f.currency)
            .unwrap_or_else(|| self.settings.default_currency.clone());

        let mut rng = rand::thread_rng();
        let now = Utc::now();
        let application = Application {
            id: codes::new_entity_id(),
            nationality_code: input.nationality_code,
            destination_code: input.destination_code,
            visa_type_id: input.visa_type_id,
            template_id: input.template_id,
            applicants: Vec::new(),
            total_fee: base_fee + expedited_fee,
            currency,
            expedited: input.expedited,
            payment_status: PaymentStatus::Pending,
            payment_deadline: None,
            resume_token: codes::resume_token(&mut rng),
            user_email: input.user_email,
            created_at: now,
            updated_at: now,
        };

        let mut applications = self.all();
        applications.push(application.clone());
        storage::save_collection(self.store.as_ref(), keys::APPLICATIONS, &applications)?;
        Ok(application)
    }

    /// Assemble and persist a wizard draft in one step: application,
    /// applicants with their documents, and the payment deadline.
    pub fn submit_draft(&self, draft: &DraftApplication) -> Result<Application, WorkflowError> {
        let created = self.create_application(NewApplication {
            nationality_code: draft.nationality_code.clone(),
            destination_code: draft.destination_code.clone(),
            visa_type_id: draft.visa_type_id.clone(),
            template_id: draft.template_id.clone(),
            user_email: draft.verified_email.clone(),
            expedited: draft.expedited,
        })?;

        for traveler in &draft.applicants {
            self.add_applicant(
                &created.id,
                NewApplicant {
                    email: draft.verified_email.clone(),
                    phone: traveler.phone.clone(),
                    is_main_applicant: false,
                    form_data: traveler.form_data.clone(),
                    documents: traveler.documents.values().cloned().collect(),
                },
            )?;
        }

        self.set_payment_deadline(&created.id)
    }

    /// Append a traveler. The first applicant becomes the main applicant
    /// regardless of the flag; fees are recomputed.
    pub fn add_applicant(
        &self,
        application_id: &str,
        input: NewApplicant,
    ) -> Result<Application, WorkflowError> {
        self.mutate(application_id, |application, bindings| {
            let now = Utc::now();
            let applicant = Applicant {
                id: codes::new_entity_id(),
                application_id: application.id.clone(),
                is_main_applicant: input.is_main_applicant || application.applicants.is_empty(),
                email: input.email,
                phone: input.phone,
                form_data: input.form_data,
                documents: input.documents,
                status: ApplicationStatus::Draft,
                status_history: vec![StatusHistoryEntry {
                    status: ApplicationStatus::Draft,
                    timestamp: now,
                    note: None,
                    changed_by: None,
                }],
                application_code: None,
                result_file_id: None,
                required_documents: Vec::new(),
                additional_docs_requested: Vec::new(),
                created_at: now,
                updated_at: now,
            };

            application.applicants.push(applicant);
            recalculate(application, bindings);
            Ok(())
        })
    }

    /// Remove a traveler, reassigning the main-applicant flag to the first
    /// remaining one when needed. Removing the last applicant is rejected:
    /// an in-progress application always keeps at least one.
    pub fn remove_applicant(
        &self,
        application_id: &str,
        applicant_id: &str,
    ) -> Result<Application, WorkflowError> {
        self.mutate(application_id, |application, bindings| {
            if !application.applicants.iter().any(|a| a.id == applicant_id) {
                return Err(WorkflowError::ApplicantNotFound(applicant_id.to_string()));
            }
            if application.applicants.len() == 1 {
                return Err(WorkflowError::LastApplicant);
            }

            application.applicants.retain(|a| a.id != applicant_id);
            if !application.applicants.iter().any(|a| a.is_main_applicant) {
                application.applicants[0].is_main_applicant = true;
            }

            recalculate(application, bindings);
            Ok(())
        })
    }

    /// Merge new answers into an applicant's form data.
    pub fn update_applicant_form_data(
        &self,
        application_id: &str,
        applicant_id: &str,
        data: FormData,
    ) -> Result<Application, WorkflowError> {
        self.with_applicant(application_id, applicant_id, |applicant| {
            applicant.form_data.extend(data);
        })
    }

    pub fn update_applicant_email(
        &self,
        application_id: &str,
        applicant_id: &str,
        email: &str,
    ) -> Result<Application, WorkflowError> {
        self.with_applicant(application_id, applicant_id, |applicant| {
            applicant.email = email.to_string();
        })
    }

    pub fn add_document(
        &self,
        application_id: &str,
        applicant_id: &str,
        document: NewDocument,
    ) -> Result<Application, WorkflowError> {
        self.with_applicant(application_id, applicant_id, |applicant| {
            applicant.documents.push(ApplicantDocument {
                id: codes::new_entity_id(),
                field_id: document.field_id,
                file_name: document.file_name,
                file_type: document.file_type,
                file_size: document.file_size,
                storage_key: document.storage_key,
            });
        })
    }

    pub fn remove_document(
        &self,
        application_id: &str,
        applicant_id: &str,
        document_id: &str,
    ) -> Result<Application, WorkflowError> {
        self.with_applicant(application_id, applicant_id, |applicant| {
            applicant.documents.retain(|d| d.id != document_id);
        })
    }

    /// Recompute the cached fee total from the current applicant count,
    /// expedited flag, and fee schedule.
    pub fn recalculate_fees(&self, application_id: &str) -> Result<Application, WorkflowError> {
        self.mutate(application_id, |application, bindings| {
            recalculate(application, bindings);
            Ok(())
        })
    }

    pub fn set_expedited(
        &self,
        application_id: &str,
        expedited: bool,
    ) -> Result<Application, WorkflowError> {
        self.mutate(application_id, |application, bindings| {
            application.expedited = expedited;
            recalculate(application, bindings);
            Ok(())
        })
    }

    /// Start the payment window: now plus the configured timeout
    /// (3 hours unless settings say otherwise).
    pub fn set_payment_deadline(&self, application_id: &str) -> Result<Application, WorkflowError> {
        let window = Duration::hours(self.settings.payment_timeout_hours);
        self.mutate(application_id, |application, _| {
            application.payment_deadline = Some(Utc::now() + window);
            Ok(())
        })
    }

    /// Terminal transition pending -> paid: every applicant receives a
    /// unique application code and moves to `submitted` with a history
    /// entry. A second call is rejected.
    pub fn mark_as_paid(&self, application_id: &str) -> Result<Application, WorkflowError> {
        let taken: HashSet<String> = self
            .all()
            .iter()
            .flat_map(|a| a.applicants.iter())
            .filter_map(|a| a.application_code.clone())
            .collect();

        let paid = self.mutate(application_id, |application, _| {
            if application.payment_status != PaymentStatus::Pending {
                return Err(WorkflowError::NotPending(application.id.clone()));
            }

            let mut rng = rand::thread_rng();
            let mut issued = taken;
            let now = Utc::now();
            for applicant in &mut application.applicants {
                let code = codes::unique_application_code(&mut rng, &issued);
                issued.insert(code.clone());
                applicant.application_code = Some(code);
                applicant.status = ApplicationStatus::Submitted;
                applicant.status_history.push(StatusHistoryEntry {
                    status: ApplicationStatus::Submitted,
                    timestamp: now,
                    note: Some("Payment completed".to_string()),
                    changed_by: None,
                });
                applicant.updated_at = now;
            }

            application.payment_status = PaymentStatus::Paid;
            Ok(())
        })?;

        info!(
            application_id = %paid.id,
            applicants = paid.applicants.len(),
            "application marked as paid"
        );
        Ok(paid)
    }

    /// Lazy batch sweep: move every pending application whose deadline has
    /// passed to `expired`. There is no scheduler; callers run this
    /// opportunistically on page views. Returns the number of applications
    /// expired by this sweep.
    pub fn check_expired_payments(&self) -> Result<usize, WorkflowError> {
        let mut applications = self.all();
        let now = Utc::now();
        let mut expired = 0usize;

        for application in &mut applications {
            if application.payment_status != PaymentStatus::Pending {
                continue;
            }
            let Some(deadline) = application.payment_deadline else {
                continue;
            };
            if deadline < now {
                application.payment_status = PaymentStatus::Expired;
                application.updated_at = now;
                expired += 1;
            }
        }

        if expired > 0 {
            storage::save_collection(self.store.as_ref(), keys::APPLICATIONS, &applications)?;
            info!(count = expired, "expired stale pending payments");
        }

        Ok(expired)
    }

    /// Admin-driven status change. Any status may follow any other; the
    /// business process is a human invariant, not a software one. Every
    /// change appends an immutable history entry.
    pub fn update_applicant_status(
        &self,
        application_id: &str,
        applicant_id: &str,
        status: ApplicationStatus,
        note: Option<String>,
        changed_by: Option<String>,
    ) -> Result<Application, WorkflowError> {
        self.with_applicant(application_id, applicant_id, |applicant| {
            applicant.status = status;
            applicant.status_history.push(StatusHistoryEntry {
                status,
                timestamp: Utc::now(),
                note,
                changed_by,
            });
        })
    }

    /// Record the documents an admin wants from one applicant and move
    /// them to `need_docs`.
    pub fn request_additional_docs(
        &self,
        application_id: &str,
        applicant_id: &str,
        requested: Vec<String>,
    ) -> Result<Application, WorkflowError> {
        self.with_applicant(application_id, applicant_id, |applicant| {
            applicant.required_documents = requested;
            applicant.status = ApplicationStatus::NeedDocs;
            applicant.status_history.push(StatusHistoryEntry {
                status: ApplicationStatus::NeedDocs,
                timestamp: Utc::now(),
                note: Some("Additional documents requested".to_string()),
                changed_by: None,
            });
        })
    }

    /// Attach the processed result file and move the applicant to
    /// `ready_to_download`.
    pub fn attach_result_file(
        &self,
        application_id: &str,
        applicant_id: &str,
        file_id: &str,
    ) -> Result<Application, WorkflowError> {
        self.with_applicant(application_id, applicant_id, |applicant| {
            applicant.result_file_id = Some(file_id.to_string());
            applicant.status = ApplicationStatus::ReadyToDownload;
            applicant.status_history.push(StatusHistoryEntry {
                status: ApplicationStatus::ReadyToDownload,
                timestamp: Utc::now(),
                note: Some("Result file uploaded".to_string()),
                changed_by: None,
            });
        })
    }

    fn mutate(
        &self,
        application_id: &str,
        apply: impl FnOnce(&mut Application, &BindingRepository<S>) -> Result<(), WorkflowError>,
    ) -> Result<Application, WorkflowError> {
        let mut applications = self.all();
        let Some(application) = applications.iter_mut().find(|a| a.id == application_id) else {
            return Err(WorkflowError::ApplicationNotFound(application_id.to_string()));
        };

        apply(application, &self.bindings)?;
        application.updated_at = Utc::now();
        let updated = application.clone();

        storage::save_collection(self.store.as_ref(), keys::APPLICATIONS, &applications)?;
        Ok(updated)
    }

    fn with_applicant(
        &self,
        application_id: &str,
        applicant_id: &str,
        apply: impl FnOnce(&mut Applicant),
    ) -> Result<Application, WorkflowError> {
        self.mutate(application_id, |application, _| {
            let Some(applicant) = application
                .applicants
                .iter_mut()
                .find(|a| a.id == applicant_id)
            else {
                return Err(WorkflowError::ApplicantNotFound(applicant_id.to_string()));
            };

            apply(applicant);
            applicant.updated_at = Utc::now();
            Ok(())
        })
    }
}

/// Authoritative fee formula:
/// `applicants × ((government + service) + (expedited && enabled ? expedited : 0))`.
/// A failed fee resolution defines the total as zero rather than erroring.
fn recalculate<S: KeyValueStore + ?Sized>(
    application: &mut Application,
    bindings: &BindingRepository<S>,
) {
    let Some(fees) = bindings.fees_for(
        &application.nationality_code,
        &application.destination_code,
        &application.visa_type_id,
    ) else {
        application.total_fee = 0;
        return;
    };

    let per_person_base = fees.government_fee + fees.service_fee;
    let per_person_expedited = if application.expedited && fees.expedited_enabled {
        fees.expedited_fee.unwrap_or(0)
    } else {
        0
    };

    let count = application.applicants.len() as u32;
    application.total_fee = count * (per_person_base + per_person_expedited);
    application.currency = fees.currency;
}
