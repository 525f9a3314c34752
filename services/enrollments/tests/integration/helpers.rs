use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use campus_domain::id::{EnrollmentId, InstitutionId, SimplifiedEnrollmentId};
use campus_domain::pagination::PageRequest;
use campus_enrollments::domain::conversion::{
    ConversionInput, ConversionOutcome, ConversionSnapshot, ConversionStep, prepare_conversion,
};
use campus_enrollments::domain::repository::{
    AccountRepository, ConversionPort, EnrollmentRepository, InstitutionRepository,
    SimplifiedEnrollmentRepository,
};
use campus_enrollments::domain::types::{
    AccessPolicy, AccessType, AccessWindow, Account, AuditNote, BlockChange, Enrollment,
    EnrollmentFilter, EnrollmentHistoryEntry, EnrollmentStatus, Institution, NewEnrollment,
    NewInstitution, NewSimplifiedEnrollment, OutboxEvent, Portal, SimplifiedEnrollment,
    SimplifiedStatus, SimplifiedStatusLog, StatusChange, StatusUpdate,
};
use campus_enrollments::error::EnrollmentsServiceError;
use campus_enrollments::usecase::credentials::hash_password;

pub use campus_testing::auth::TEST_JWT_SECRET;

fn apply_block(enrollment: &mut Enrollment, block: &BlockChange) {
    match block {
        BlockChange::Keep => {}
        BlockChange::Start {
            reason,
            executed_at,
            ends_at,
        } => {
            enrollment.block_reason = Some(reason.clone());
            enrollment.block_executed_at = Some(*executed_at);
            enrollment.block_ends_at = *ends_at;
        }
        BlockChange::Lift => enrollment.block_ends_at = None,
    }
}

fn history_row(
    enrollment: &Enrollment,
    previous: Option<EnrollmentStatus>,
    audit: &AuditNote,
    at: DateTime<Utc>,
) -> EnrollmentHistoryEntry {
    StatusChange::new(
        enrollment.id.0,
        previous,
        enrollment.status,
        audit.reason.clone(),
        audit.actor_id,
        audit.metadata.clone(),
        at,
    )
}

fn enrollment_from_new(id: EnrollmentId, new: &NewEnrollment) -> Enrollment {
    Enrollment {
        id,
        code: new.code.clone(),
        student_id: new.student_id,
        course_id: new.course_id,
        institution_id: new.institution_id,
        polo_id: new.polo_id,
        partner_id: new.partner_id,
        status: new.status,
        access_granted_at: new.access.map(|w| w.granted_at),
        access_expires_at: new.access.and_then(|w| w.expires_at),
        block_reason: new.block_reason.clone(),
        block_executed_at: new.block_executed_at,
        block_ends_at: None,
        payment_gateway: new.payment_gateway.clone(),
        payment_external_id: new.payment_external_id.clone(),
        created_at: new.created_at,
        updated_at: new.created_at,
    }
}

// ── MockEnrollmentRepo ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockEnrollmentRepo {
    pub enrollments: Arc<Mutex<Vec<Enrollment>>>,
    pub history: Arc<Mutex<Vec<EnrollmentHistoryEntry>>>,
}

impl MockEnrollmentRepo {
    pub fn new(enrollments: Vec<Enrollment>) -> Self {
        Self {
            enrollments: Arc::new(Mutex::new(enrollments)),
            history: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Returns a shared handle to the stored enrollments for post-execution inspection.
    pub fn enrollments_handle(&self) -> Arc<Mutex<Vec<Enrollment>>> {
        Arc::clone(&self.enrollments)
    }

    /// Returns a shared handle to the history rows, oldest first.
    pub fn history_handle(&self) -> Arc<Mutex<Vec<EnrollmentHistoryEntry>>> {
        Arc::clone(&self.history)
    }
}

impl EnrollmentRepository for MockEnrollmentRepo {
    async fn find_by_id(
        &self,
        id: EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn list(
        &self,
        filter: &EnrollmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Enrollment>, EnrollmentsServiceError> {
        let mut matching: Vec<Enrollment> = self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .filter(|e| filter.student_id.is_none_or(|id| e.student_id == id))
            .filter(|e| filter.institution_id.is_none_or(|id| e.institution_id == id))
            .filter(|e| filter.polo_id.is_none_or(|id| e.polo_id == Some(id)))
            .filter(|e| filter.partner_id.is_none_or(|id| e.partner_id == Some(id)))
            .filter(|e| filter.status.is_none_or(|s| e.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .collect())
    }

    async fn create(
        &self,
        new: &NewEnrollment,
        audit: &AuditNote,
    ) -> Result<Enrollment, EnrollmentsServiceError> {
        let mut enrollments = self.enrollments.lock().unwrap();
        let id = enrollments.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        let enrollment = enrollment_from_new(EnrollmentId(id), new);
        self.history
            .lock()
            .unwrap()
            .push(history_row(&enrollment, None, audit, new.created_at));
        enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn grant_access(
        &self,
        id: EnrollmentId,
        window: AccessWindow,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        let mut enrollments = self.enrollments.lock().unwrap();
        let Some(e) = enrollments
            .iter_mut()
            .find(|e| e.id == id && e.access_granted_at.is_none())
        else {
            return Ok(None);
        };
        e.access_granted_at = Some(window.granted_at);
        e.access_expires_at = window.expires_at;
        e.updated_at = window.granted_at;
        self.history
            .lock()
            .unwrap()
            .push(history_row(e, Some(e.status), audit, window.granted_at));
        Ok(Some(e.clone()))
    }

    async fn set_access_expiry(
        &self,
        id: EnrollmentId,
        expires_at: Option<DateTime<Utc>>,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        let mut enrollments = self.enrollments.lock().unwrap();
        let Some(e) = enrollments
            .iter_mut()
            .find(|e| e.id == id && e.access_granted_at.is_some())
        else {
            return Ok(None);
        };
        let now = Utc::now();
        e.access_expires_at = expires_at;
        e.updated_at = now;
        self.history
            .lock()
            .unwrap()
            .push(history_row(e, Some(e.status), audit, now));
        Ok(Some(e.clone()))
    }

    async fn update_status(
        &self,
        id: EnrollmentId,
        update: &StatusUpdate<EnrollmentStatus>,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        let mut enrollments = self.enrollments.lock().unwrap();
        let Some(e) = enrollments
            .iter_mut()
            .find(|e| e.id == id && e.status == update.from)
        else {
            return Ok(None);
        };
        let now = Utc::now();
        e.status = update.to;
        e.updated_at = now;
        apply_block(e, &update.block);
        self.history
            .lock()
            .unwrap()
            .push(history_row(e, Some(update.from), audit, now));
        Ok(Some(e.clone()))
    }

    async fn history(
        &self,
        id: EnrollmentId,
    ) -> Result<Vec<EnrollmentHistoryEntry>, EnrollmentsServiceError> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|h| h.subject_id == id.0)
            .cloned()
            .collect())
    }
}

/// Enrollment repository whose guarded writes always lose the race.
pub struct RacingEnrollmentRepo {
    pub inner: MockEnrollmentRepo,
}

impl EnrollmentRepository for RacingEnrollmentRepo {
    async fn find_by_id(
        &self,
        id: EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        self.inner.find_by_id(id).await
    }

    async fn list(
        &self,
        filter: &EnrollmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Enrollment>, EnrollmentsServiceError> {
        self.inner.list(filter, page).await
    }

    async fn create(
        &self,
        new: &NewEnrollment,
        audit: &AuditNote,
    ) -> Result<Enrollment, EnrollmentsServiceError> {
        self.inner.create(new, audit).await
    }

    async fn grant_access(
        &self,
        _id: EnrollmentId,
        _window: AccessWindow,
        _audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        Ok(None)
    }

    async fn set_access_expiry(
        &self,
        id: EnrollmentId,
        expires_at: Option<DateTime<Utc>>,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        self.inner.set_access_expiry(id, expires_at, audit).await
    }

    async fn update_status(
        &self,
        _id: EnrollmentId,
        _update: &StatusUpdate<EnrollmentStatus>,
        _audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        Ok(None)
    }

    async fn history(
        &self,
        id: EnrollmentId,
    ) -> Result<Vec<EnrollmentHistoryEntry>, EnrollmentsServiceError> {
        self.inner.history(id).await
    }
}

// ── MockSimplifiedRepo ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockSimplifiedRepo {
    pub records: Arc<Mutex<Vec<SimplifiedEnrollment>>>,
    pub logs: Arc<Mutex<Vec<SimplifiedStatusLog>>>,
}

impl MockSimplifiedRepo {
    pub fn new(records: Vec<SimplifiedEnrollment>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            logs: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn records_handle(&self) -> Arc<Mutex<Vec<SimplifiedEnrollment>>> {
        Arc::clone(&self.records)
    }

    pub fn logs_handle(&self) -> Arc<Mutex<Vec<SimplifiedStatusLog>>> {
        Arc::clone(&self.logs)
    }
}

impl SimplifiedEnrollmentRepository for MockSimplifiedRepo {
    async fn find_by_id(
        &self,
        id: SimplifiedEnrollmentId,
    ) -> Result<Option<SimplifiedEnrollment>, EnrollmentsServiceError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn create(
        &self,
        new: &NewSimplifiedEnrollment,
        audit: &AuditNote,
    ) -> Result<SimplifiedEnrollment, EnrollmentsServiceError> {
        let mut records = self.records.lock().unwrap();
        let id = records.iter().map(|r| r.id.0).max().unwrap_or(0) + 1;
        let record = SimplifiedEnrollment {
            id: SimplifiedEnrollmentId(id),
            student_name: new.student_name.clone(),
            student_email: new.student_email.clone(),
            student_cpf: new.student_cpf.clone(),
            student_phone: new.student_phone.clone(),
            course_id: new.course_id,
            institution_id: new.institution_id,
            polo_id: new.polo_id,
            partner_id: new.partner_id,
            amount_cents: new.amount_cents,
            payment_gateway: new.payment_gateway.clone(),
            payment_external_id: new.payment_external_id.clone(),
            status: SimplifiedStatus::Pending,
            converted_enrollment_id: None,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        self.logs.lock().unwrap().push(StatusChange::new(
            id,
            None,
            SimplifiedStatus::Pending,
            audit.reason.clone(),
            audit.actor_id,
            audit.metadata.clone(),
            new.created_at,
        ));
        records.push(record.clone());
        Ok(record)
    }

    async fn update_status(
        &self,
        id: SimplifiedEnrollmentId,
        update: &StatusUpdate<SimplifiedStatus>,
        audit: &AuditNote,
    ) -> Result<Option<SimplifiedEnrollment>, EnrollmentsServiceError> {
        let mut records = self.records.lock().unwrap();
        let Some(r) = records
            .iter_mut()
            .find(|r| r.id == id && r.status == update.from)
        else {
            return Ok(None);
        };
        let now = Utc::now();
        r.status = update.to;
        r.updated_at = now;
        self.logs.lock().unwrap().push(StatusChange::new(
            id.0,
            Some(update.from),
            update.to,
            audit.reason.clone(),
            audit.actor_id,
            audit.metadata.clone(),
            now,
        ));
        Ok(Some(r.clone()))
    }

    async fn logs(
        &self,
        id: SimplifiedEnrollmentId,
    ) -> Result<Vec<SimplifiedStatusLog>, EnrollmentsServiceError> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|l| l.subject_id == id.0)
            .cloned()
            .collect())
    }
}

// ── MockInstitutionRepo ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockInstitutionRepo {
    pub institutions: Arc<Mutex<Vec<Institution>>>,
}

impl MockInstitutionRepo {
    pub fn new(institutions: Vec<Institution>) -> Self {
        Self {
            institutions: Arc::new(Mutex::new(institutions)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn institutions_handle(&self) -> Arc<Mutex<Vec<Institution>>> {
        Arc::clone(&self.institutions)
    }
}

impl InstitutionRepository for MockInstitutionRepo {
    async fn find_by_id(
        &self,
        id: InstitutionId,
    ) -> Result<Option<Institution>, EnrollmentsServiceError> {
        Ok(self
            .institutions
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn create(
        &self,
        new: &NewInstitution,
    ) -> Result<Institution, EnrollmentsServiceError> {
        let mut institutions = self.institutions.lock().unwrap();
        let id = institutions.iter().map(|i| i.id.0).max().unwrap_or(0) + 1;
        let institution = Institution {
            id: InstitutionId(id),
            name: new.name.clone(),
            policy: new.policy,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        institutions.push(institution.clone());
        Ok(institution)
    }

    async fn update_policy(
        &self,
        id: InstitutionId,
        policy: &AccessPolicy,
    ) -> Result<Option<Institution>, EnrollmentsServiceError> {
        let mut institutions = self.institutions.lock().unwrap();
        Ok(institutions.iter_mut().find(|i| i.id == id).map(|i| {
            i.policy = *policy;
            i.updated_at = Utc::now();
            i.clone()
        }))
    }
}

// ── MockAccountRepo ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockAccountRepo {
    pub accounts: Arc<Mutex<Vec<Account>>>,
}

impl MockAccountRepo {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts: Arc::new(Mutex::new(accounts)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn accounts_handle(&self) -> Arc<Mutex<Vec<Account>>> {
        Arc::clone(&self.accounts)
    }
}

impl AccountRepository for MockAccountRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, EnrollmentsServiceError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_by_login(
        &self,
        login: &str,
    ) -> Result<Option<Account>, EnrollmentsServiceError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == login || a.username == login)
            .cloned())
    }
}

// ── MockConversionPort ───────────────────────────────────────────────────────

/// Converts against the stores of the other mocks. The simplified store lock
/// is held for the whole conversion, like the row lock in the database.
#[derive(Clone)]
pub struct MockConversionPort {
    pub simplified: MockSimplifiedRepo,
    pub enrollments: MockEnrollmentRepo,
    pub accounts: MockAccountRepo,
    pub institutions: MockInstitutionRepo,
    pub outbox: Arc<Mutex<Vec<OutboxEvent>>>,
}

impl MockConversionPort {
    pub fn new(
        simplified: &MockSimplifiedRepo,
        enrollments: &MockEnrollmentRepo,
        accounts: &MockAccountRepo,
        institutions: &MockInstitutionRepo,
    ) -> Self {
        Self {
            simplified: simplified.clone(),
            enrollments: enrollments.clone(),
            accounts: accounts.clone(),
            institutions: institutions.clone(),
            outbox: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn outbox_handle(&self) -> Arc<Mutex<Vec<OutboxEvent>>> {
        Arc::clone(&self.outbox)
    }
}

impl ConversionPort for MockConversionPort {
    async fn convert(
        &self,
        input: &ConversionInput,
    ) -> Result<ConversionOutcome, EnrollmentsServiceError> {
        let mut records = self.simplified.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == input.simplified_id)
            .ok_or(EnrollmentsServiceError::SimplifiedEnrollmentNotFound)?;
        let policy = self
            .institutions
            .institutions
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == record.institution_id)
            .map(|i| i.policy)
            .ok_or(EnrollmentsServiceError::InstitutionNotFound)?;
        let mut accounts = self.accounts.accounts.lock().unwrap();
        let existing_student_id = accounts
            .iter()
            .find(|a| a.email == record.student_email)
            .map(|a| a.id);
        let snapshot = ConversionSnapshot {
            record: record.clone(),
            policy,
            existing_student_id,
        };

        let mut enrollments = self.enrollments.enrollments.lock().unwrap();
        let write = match prepare_conversion(snapshot, input)? {
            ConversionStep::AlreadyConverted(id) => {
                let enrollment = enrollments
                    .iter()
                    .find(|e| e.id == id)
                    .cloned()
                    .ok_or(EnrollmentsServiceError::EnrollmentNotFound)?;
                return Ok(ConversionOutcome::AlreadyConverted(enrollment));
            }
            ConversionStep::Write(write) => write,
        };

        if let Some(new) = &write.new_account {
            accounts.push(Account {
                id: new.id,
                email: new.email.clone(),
                username: new.username.clone(),
                name: new.name.clone(),
                password_hash: new.password_hash.clone(),
                portal: Portal::Student {
                    cpf: new.cpf.clone(),
                    phone: new.phone.clone(),
                },
                created_at: new.created_at,
                updated_at: new.created_at,
            });
        }
        if let Some(event) = &write.credentials_event {
            self.outbox.lock().unwrap().push(event.clone());
        }

        let id = enrollments.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
        let enrollment = enrollment_from_new(EnrollmentId(id), &write.enrollment);
        self.enrollments
            .history
            .lock()
            .unwrap()
            .push(history_row(&enrollment, None, &write.history, write.now));
        enrollments.push(enrollment.clone());

        record.status = SimplifiedStatus::Converted;
        record.converted_enrollment_id = Some(enrollment.id);
        record.updated_at = write.now;
        let note = write.log_note(enrollment.id);
        self.simplified.logs.lock().unwrap().push(StatusChange::new(
            record.id.0,
            Some(write.from),
            SimplifiedStatus::Converted,
            note.reason,
            note.actor_id,
            note.metadata,
            write.now,
        ));

        Ok(ConversionOutcome::Converted {
            enrollment,
            account_created: write.account_created(),
        })
    }
}

// ── TakenUsernameAccounts ────────────────────────────────────────────────────

/// Account store where the next `taken` username lookups hit an existing
/// account. Email lookups go to the inner store.
#[derive(Clone)]
pub struct TakenUsernameAccounts {
    pub inner: MockAccountRepo,
    pub taken: Arc<Mutex<u32>>,
    pub username_lookups: Arc<Mutex<u32>>,
}

impl TakenUsernameAccounts {
    pub fn new(inner: MockAccountRepo, taken: u32) -> Self {
        Self {
            inner,
            taken: Arc::new(Mutex::new(taken)),
            username_lookups: Arc::new(Mutex::new(0)),
        }
    }
}

impl AccountRepository for TakenUsernameAccounts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, EnrollmentsServiceError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_login(
        &self,
        login: &str,
    ) -> Result<Option<Account>, EnrollmentsServiceError> {
        if login.contains('@') {
            return self.inner.find_by_login(login).await;
        }
        *self.username_lookups.lock().unwrap() += 1;
        let mut taken = self.taken.lock().unwrap();
        if *taken == 0 {
            return Ok(None);
        }
        *taken -= 1;
        let mut account = test_student("someone.else@example.com");
        account.username = login.to_owned();
        Ok(Some(account))
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn test_policy(access_type: AccessType, access_period_days: Option<u32>) -> AccessPolicy {
    AccessPolicy {
        access_type,
        access_period_days,
        block_delay_days: 0,
        cancel_delay_days: 0,
    }
}

pub fn test_institution(id: i32, policy: AccessPolicy) -> Institution {
    let now = Utc::now();
    Institution {
        id: InstitutionId(id),
        name: format!("Institution {id}"),
        policy,
        created_at: now,
        updated_at: now,
    }
}

pub fn test_enrollment(id: i32, status: EnrollmentStatus) -> Enrollment {
    let now = Utc::now();
    Enrollment {
        id: EnrollmentId(id),
        code: format!("ENR-20260101-TEST{id:02}"),
        student_id: Uuid::new_v4(),
        course_id: 10,
        institution_id: InstitutionId(1),
        polo_id: Some(3),
        partner_id: None,
        status,
        access_granted_at: None,
        access_expires_at: None,
        block_reason: None,
        block_executed_at: None,
        block_ends_at: None,
        payment_gateway: None,
        payment_external_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn test_simplified(id: i32, status: SimplifiedStatus) -> SimplifiedEnrollment {
    let now = Utc::now();
    SimplifiedEnrollment {
        id: SimplifiedEnrollmentId(id),
        student_name: "Ana Souza".to_owned(),
        student_email: format!("ana.souza{id}@example.com"),
        student_cpf: Some("12345678901".to_owned()),
        student_phone: None,
        course_id: 10,
        institution_id: InstitutionId(1),
        polo_id: Some(3),
        partner_id: None,
        amount_cents: 49_900,
        payment_gateway: Some("pix".to_owned()),
        payment_external_id: Some(format!("pay-{id}")),
        status,
        converted_enrollment_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn test_account(email: &str, password: &str, portal: Portal) -> Account {
    let now = Utc::now();
    Account {
        id: Uuid::now_v7(),
        email: email.to_owned(),
        username: email.split('@').next().unwrap_or_default().to_owned(),
        name: "Test Account".to_owned(),
        password_hash: hash_password(password).unwrap(),
        portal,
        created_at: now,
        updated_at: now,
    }
}

pub fn test_student(email: &str) -> Account {
    test_account(
        email,
        "student-pass",
        Portal::Student {
            cpf: None,
            phone: None,
        },
    )
}
