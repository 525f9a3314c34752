use anyhow::{Context as _, anyhow};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use campus_domain::id::SimplifiedEnrollmentId;

use crate::domain::conversion::{ConversionInput, ConversionOutcome};
use crate::domain::repository::{
    AccountRepository, ConversionPort, EnrollmentRepository, SimplifiedEnrollmentRepository,
};
use crate::domain::types::{
    NewStudentAccount, OutboxEvent, SimplifiedEnrollment, SimplifiedStatus,
};
use crate::error::EnrollmentsServiceError;
use crate::usecase::credentials::{
    generate_enrollment_code, generate_temp_password, generate_username, hash_password,
};

pub const CREDENTIALS_ISSUED_EVENT: &str = "student_credentials_issued";

/// Username lookups before a conversion gives up.
const USERNAME_ATTEMPTS: usize = 8;

async fn free_username<A: AccountRepository>(
    accounts: &A,
    email: &str,
) -> Result<String, EnrollmentsServiceError> {
    for _ in 0..USERNAME_ATTEMPTS {
        let username = generate_username(email);
        if accounts.find_by_login(&username).await?.is_none() {
            return Ok(username);
        }
    }
    Err(anyhow!("no free username for {email} after {USERNAME_ATTEMPTS} attempts").into())
}

fn new_student(
    record: &SimplifiedEnrollment,
    username: String,
) -> Result<(NewStudentAccount, OutboxEvent), EnrollmentsServiceError> {
    let password = generate_temp_password();
    let account = NewStudentAccount {
        id: Uuid::now_v7(),
        email: record.student_email.clone(),
        username: username.clone(),
        name: record.student_name.clone(),
        password_hash: hash_password(&password)?,
        cpf: record.student_cpf.clone(),
        phone: record.student_phone.clone(),
        created_at: Utc::now(),
    };
    let event = OutboxEvent {
        id: Uuid::new_v4(),
        kind: CREDENTIALS_ISSUED_EVENT.to_owned(),
        payload: json!({
            "email": record.student_email,
            "name": record.student_name,
            "username": username,
            "temporaryPassword": password,
        }),
        idempotency_key: format!("{CREDENTIALS_ISSUED_EVENT}:{}", record.id),
    };
    Ok((account, event))
}

pub struct ConvertSimplifiedUseCase<S, E, A, P>
where
    S: SimplifiedEnrollmentRepository,
    E: EnrollmentRepository,
    A: AccountRepository,
    P: ConversionPort,
{
    pub simplified: S,
    pub enrollments: E,
    pub accounts: A,
    pub port: P,
}

impl<S, E, A, P> ConvertSimplifiedUseCase<S, E, A, P>
where
    S: SimplifiedEnrollmentRepository,
    E: EnrollmentRepository,
    A: AccountRepository,
    P: ConversionPort,
{
    pub async fn execute(
        &self,
        id: SimplifiedEnrollmentId,
        actor_id: Option<Uuid>,
    ) -> Result<ConversionOutcome, EnrollmentsServiceError> {
        let record = self
            .simplified
            .find_by_id(id)
            .await?
            .ok_or(EnrollmentsServiceError::SimplifiedEnrollmentNotFound)?;

        if let Some(enrollment_id) = record.converted_enrollment_id {
            let enrollment = self
                .enrollments
                .find_by_id(enrollment_id)
                .await?
                .ok_or(EnrollmentsServiceError::EnrollmentNotFound)?;
            return Ok(ConversionOutcome::AlreadyConverted(enrollment));
        }

        if record.status.initial_enrollment_status().is_none() {
            return Err(EnrollmentsServiceError::InvalidTransition {
                from: record.status.as_str(),
                to: SimplifiedStatus::Converted.as_str(),
            });
        }

        // Hashing is slow; do it before the locking transaction starts.
        let existing = self.accounts.find_by_login(&record.student_email).await?;
        let (new_account, credentials_event) = match existing {
            Some(_) => (None, None),
            None => {
                let username = free_username(&self.accounts, &record.student_email).await?;
                let (account, event) =
                    tokio::task::spawn_blocking(move || new_student(&record, username))
                        .await
                        .context("join credential hashing")??;
                (Some(account), Some(event))
            }
        };

        let now = Utc::now();
        let input = ConversionInput {
            simplified_id: id,
            new_account,
            credentials_event,
            enrollment_code: generate_enrollment_code(now),
            actor_id,
            now,
        };
        let outcome = self.port.convert(&input).await?;

        match &outcome {
            ConversionOutcome::Converted {
                enrollment,
                account_created,
            } => tracing::info!(
                simplified_enrollment_id = %id,
                enrollment_id = %enrollment.id,
                status = enrollment.status.as_str(),
                account_created,
                "simplified enrollment converted"
            ),
            ConversionOutcome::AlreadyConverted(enrollment) => tracing::info!(
                simplified_enrollment_id = %id,
                enrollment_id = %enrollment.id,
                "simplified enrollment already converted"
            ),
        }
        Ok(outcome)
    }
}
