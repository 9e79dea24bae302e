use serde_json::json;

use super::common::*;
use crate::applications::domain::ApplicationStatus;
use crate::applications::workflow::{NewDocument, WorkflowError};

#[test]
fn first_applicant_becomes_the_main_applicant() {
    let workflow = workflow();
    let created = workflow
        .create_application(us_tourism_application(false))
        .expect("create");

    let updated = workflow
        .add_applicant(&created.id, applicant("a@example.com"))
        .expect("applicant");
    assert!(updated.applicants[0].is_main_applicant);
    assert_eq!(updated.applicants[0].status, ApplicationStatus::Draft);
    assert_eq!(updated.applicants[0].status_history.len(), 1);
}

#[test]
fn removing_the_main_applicant_reassigns_the_flag() {
    let workflow = workflow();
    let created = workflow
        .create_application(us_tourism_application(false))
        .expect("create");
    workflow.add_applicant(&created.id, applicant("main@example.com")).expect("main");
    let with_two = workflow
        .add_applicant(&created.id, applicant("second@example.com"))
        .expect("second");

    let main_id = with_two.applicants[0].id.clone();
    let updated = workflow
        .remove_applicant(&created.id, &main_id)
        .expect("remove main");

    let mains: Vec<_> = updated
        .applicants
        .iter()
        .filter(|a| a.is_main_applicant)
        .collect();
    assert_eq!(mains.len(), 1);
    assert_eq!(mains[0].email, "second@example.com");
}

#[test]
fn removing_the_last_applicant_is_rejected() {
    let workflow = workflow();
    let created = workflow
        .create_application(us_tourism_application(false))
        .expect("create");
    let updated = workflow
        .add_applicant(&created.id, applicant("only@example.com"))
        .expect("applicant");

    match workflow.remove_applicant(&created.id, &updated.applicants[0].id) {
        Err(WorkflowError::LastApplicant) => {}
        other => panic!("expected LastApplicant, got {other:?}"),
    }
    assert_eq!(workflow.by_id(&created.id).expect("present").applicants.len(), 1);
}

#[test]
fn mutations_against_missing_targets_error() {
    let workflow = workflow();

    match workflow.recalculate_fees("ghost") {
        Err(WorkflowError::ApplicationNotFound(id)) => assert_eq!(id, "ghost"),
        other => panic!("expected ApplicationNotFound, got {other:?}"),
    }

    let created = workflow
        .create_application(us_tourism_application(false))
        .expect("create");
    workflow.add_applicant(&created.id, applicant("a@example.com")).expect("applicant");
    match workflow.remove_applicant(&created.id, "ghost") {
        Err(WorkflowError::ApplicantNotFound(id)) => assert_eq!(id, "ghost"),
        other => panic!("expected ApplicantNotFound, got {other:?}"),
    }
}

#[test]
fn status_updates_append_to_the_history() {
    let workflow = workflow();
    let created = workflow
        .create_application(us_tourism_application(false))
        .expect("create");
    let updated = workflow
        .add_applicant(&created.id, applicant("a@example.com"))
        .expect("applicant");
    let applicant_id = updated.applicants[0].id.clone();

    let reviewed = workflow
        .update_applicant_status(
            &created.id,
            &applicant_id,
            ApplicationStatus::InReview,
            Some("Assigned to operator".to_string()),
            Some("admin@portal".to_string()),
        )
        .expect("status update");

    let traveler = &reviewed.applicants[0];
    assert_eq!(traveler.status, ApplicationStatus::InReview);
    assert_eq!(traveler.status_history.len(), 2);
    let last = traveler.status_history.last().expect("entry");
    assert_eq!(last.changed_by.as_deref(), Some("admin@portal"));
}

#[test]
fn requesting_additional_docs_records_the_list_and_status() {
    let workflow = workflow();
    let created = workflow
        .create_application(us_tourism_application(false))
        .expect("create");
    let updated = workflow
        .add_applicant(&created.id, applicant("a@example.com"))
        .expect("applicant");
    let applicant_id = updated.applicants[0].id.clone();

    let result = workflow
        .request_additional_docs(
            &created.id,
            &applicant_id,
            vec!["Bank statement".to_string(), "Hotel booking".to_string()],
        )
        .expect("request docs");

    let traveler = &result.applicants[0];
    assert_eq!(traveler.status, ApplicationStatus::NeedDocs);
    assert_eq!(traveler.required_documents.len(), 2);
    let last = traveler.status_history.last().expect("entry");
    assert_eq!(last.note.as_deref(), Some("Additional documents requested"));
}

#[test]
fn form_data_updates_merge_instead_of_replacing() {
    let workflow = workflow();
    let created = workflow
        .create_application(us_tourism_application(false))
        .expect("create");
    let updated = workflow
        .add_applicant(&created.id, applicant("a@example.com"))
        .expect("applicant");
    let applicant_id = updated.applicants[0].id.clone();

    let mut first = crate::templates::FormData::new();
    first.insert("full_name".to_string(), json!("Traveler One"));
    workflow
        .update_applicant_form_data(&created.id, &applicant_id, first)
        .expect("first merge");

    let mut second = crate::templates::FormData::new();
    second.insert("purpose".to_string(), json!("tourism"));
    let merged = workflow
        .update_applicant_form_data(&created.id, &applicant_id, second)
        .expect("second merge");

    let form = &merged.applicants[0].form_data;
    assert_eq!(form.get("full_name"), Some(&json!("Traveler One")));
    assert_eq!(form.get("purpose"), Some(&json!("tourism")));
}

#[test]
fn documents_can_be_attached_and_removed() {
    let workflow = workflow();
    let created = workflow
        .create_application(us_tourism_application(false))
        .expect("create");
    let updated = workflow
        .add_applicant(&created.id, applicant("a@example.com"))
        .expect("applicant");
    let applicant_id = updated.applicants[0].id.clone();

    let with_doc = workflow
        .add_document(
            &created.id,
            &applicant_id,
            NewDocument {
                field_id: "passport_scan".to_string(),
                file_name: "passport.pdf".to_string(),
                file_type: "application/pdf".to_string(),
                file_size: 182_044,
                storage_key: "blob-1".to_string(),
            },
        )
        .expect("attach");
    let document = &with_doc.applicants[0].documents[0];
    assert_eq!(document.field_id, "passport_scan");
    assert!(!document.id.is_empty());

    let document_id = document.id.clone();
    let without = workflow
        .remove_document(&created.id, &applicant_id, &document_id)
        .expect("remove");
    assert!(without.applicants[0].documents.is_empty());
}

#[test]
fn attach_result_file_moves_the_applicant_to_ready() {
    let workflow = workflow();
    let created = workflow
        .create_application(us_tourism_application(false))
        .expect("create");
    let updated = workflow
        .add_applicant(&created.id, applicant("a@example.com"))
        .expect("applicant");
    let applicant_id = updated.applicants[0].id.clone();

    let ready = workflow
        .attach_result_file(&created.id, &applicant_id, "result-file-1")
        .expect("attach result");
    let traveler = &ready.applicants[0];
    assert_eq!(traveler.status, ApplicationStatus::ReadyToDownload);
    assert_eq!(traveler.result_file_id.as_deref(), Some("result-file-1"));
}

#[test]
fn submit_draft_persists_travelers_fees_and_deadline() {
    let workflow = workflow();
    let submitted = workflow.submit_draft(&two_traveler_draft()).expect("submit");

    assert_eq!(submitted.applicants.len(), 2);
    assert!(submitted.applicants[0].is_main_applicant);
    assert!(!submitted.applicants[1].is_main_applicant);
    assert_eq!(submitted.total_fee, 140);
    assert!(submitted.payment_deadline.is_some());
    assert_eq!(
        submitted.applicants[0].form_data.get("full_name"),
        Some(&json!("First Traveler"))
    );
}

#[test]
fn resume_token_lookup_restores_the_application() {
    let workflow = workflow();
    let submitted = workflow.submit_draft(&two_traveler_draft()).expect("submit");

    assert_eq!(submitted.resume_token.len(), 32);
    let resumed = workflow
        .by_resume_token(&submitted.resume_token)
        .expect("resumed");
    assert_eq!(resumed.id, submitted.id);

    assert!(workflow.by_resume_token("unknown-token").is_none());
    assert_eq!(workflow.by_user_email("TRAVELER@example.com").len(), 1);
}
