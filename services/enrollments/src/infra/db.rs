use anyhow::{Context as _, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use campus_core::sea_ext::Paginate as _;
use campus_domain::id::{EnrollmentId, InstitutionId, SimplifiedEnrollmentId};
use campus_domain::pagination::PageRequest;
use campus_enrollments_schema::{
    enrollment_status_history, enrollments, institutions, outbox_events, partner_members,
    polo_members, simplified_enrollment_status_logs, simplified_enrollments, student_profiles,
    users,
};

use crate::domain::conversion::{
    ConversionInput, ConversionOutcome, ConversionSnapshot, ConversionStep, prepare_conversion,
};
use crate::domain::repository::{
    AccountRepository, ConversionPort, EnrollmentRepository, InstitutionRepository,
    SimplifiedEnrollmentRepository,
};
use crate::domain::types::{
    AccessPolicy, AccessType, AccessWindow, Account, AuditNote, BlockChange, Enrollment,
    EnrollmentFilter, EnrollmentHistoryEntry, EnrollmentStatus, Institution, NewEnrollment,
    NewInstitution, NewSimplifiedEnrollment, NewStudentAccount, OutboxEvent, Portal,
    SimplifiedEnrollment, SimplifiedStatus, SimplifiedStatusLog, StatusChange, StatusUpdate,
};
use crate::error::EnrollmentsServiceError;

// ── Shared writers ───────────────────────────────────────────────────────────

async fn insert_history<C: ConnectionTrait>(
    db: &C,
    enrollment_id: i32,
    previous_status: Option<&str>,
    new_status: &str,
    audit: &AuditNote,
    at: DateTime<Utc>,
) -> Result<(), DbErr> {
    enrollment_status_history::ActiveModel {
        id: Set(Uuid::now_v7()),
        enrollment_id: Set(enrollment_id),
        previous_status: Set(previous_status.map(str::to_owned)),
        new_status: Set(new_status.to_owned()),
        reason: Set(audit.reason.clone()),
        actor_id: Set(audit.actor_id),
        metadata: Set(audit.metadata.clone()),
        created_at: Set(at),
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn insert_simplified_log<C: ConnectionTrait>(
    db: &C,
    simplified_enrollment_id: i32,
    previous_status: Option<&str>,
    new_status: &str,
    audit: &AuditNote,
    at: DateTime<Utc>,
) -> Result<(), DbErr> {
    simplified_enrollment_status_logs::ActiveModel {
        id: Set(Uuid::now_v7()),
        simplified_enrollment_id: Set(simplified_enrollment_id),
        previous_status: Set(previous_status.map(str::to_owned)),
        new_status: Set(new_status.to_owned()),
        reason: Set(audit.reason.clone()),
        actor_id: Set(audit.actor_id),
        metadata: Set(audit.metadata.clone()),
        created_at: Set(at),
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn insert_outbox_event<C: ConnectionTrait>(
    db: &C,
    event: &OutboxEvent,
    at: DateTime<Utc>,
) -> Result<(), DbErr> {
    outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        created_at: Set(at),
        processed_at: Set(None),
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn insert_enrollment<C: ConnectionTrait>(
    db: &C,
    enrollment: &NewEnrollment,
) -> Result<enrollments::Model, DbErr> {
    enrollments::ActiveModel {
        code: Set(enrollment.code.clone()),
        student_id: Set(enrollment.student_id),
        course_id: Set(enrollment.course_id),
        institution_id: Set(enrollment.institution_id.0),
        polo_id: Set(enrollment.polo_id),
        partner_id: Set(enrollment.partner_id),
        status: Set(enrollment.status.as_str().to_owned()),
        access_granted_at: Set(enrollment.access.map(|w| w.granted_at)),
        access_expires_at: Set(enrollment.access.and_then(|w| w.expires_at)),
        block_reason: Set(enrollment.block_reason.clone()),
        block_executed_at: Set(enrollment.block_executed_at),
        block_ends_at: Set(None),
        payment_gateway: Set(enrollment.payment_gateway.clone()),
        payment_external_id: Set(enrollment.payment_external_id.clone()),
        created_at: Set(enrollment.created_at),
        updated_at: Set(enrollment.created_at),
        ..Default::default()
    }
    .insert(db)
    .await
}

// ── Enrollment repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEnrollmentRepository {
    pub db: DatabaseConnection,
}

impl EnrollmentRepository for DbEnrollmentRepository {
    async fn find_by_id(
        &self,
        id: EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        let model = enrollments::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .context("find enrollment by id")?;
        Ok(model.map(enrollment_from_model).transpose()?)
    }

    async fn list(
        &self,
        filter: &EnrollmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Enrollment>, EnrollmentsServiceError> {
        let mut query = enrollments::Entity::find();
        if let Some(student_id) = filter.student_id {
            query = query.filter(enrollments::Column::StudentId.eq(student_id));
        }
        if let Some(institution_id) = filter.institution_id {
            query = query.filter(enrollments::Column::InstitutionId.eq(institution_id.0));
        }
        if let Some(polo_id) = filter.polo_id {
            query = query.filter(enrollments::Column::PoloId.eq(polo_id));
        }
        if let Some(partner_id) = filter.partner_id {
            query = query.filter(enrollments::Column::PartnerId.eq(partner_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(enrollments::Column::Status.eq(status.as_str()));
        }
        let models = query
            .order_by_desc(enrollments::Column::Id)
            .paginate(page)
            .all(&self.db)
            .await
            .context("list enrollments")?;
        let items = models
            .into_iter()
            .map(enrollment_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(items)
    }

    async fn create(
        &self,
        enrollment: &NewEnrollment,
        audit: &AuditNote,
    ) -> Result<Enrollment, EnrollmentsServiceError> {
        let model = self
            .db
            .transaction::<_, enrollments::Model, DbErr>(|txn| {
                let enrollment = enrollment.clone();
                let audit = audit.clone();
                Box::pin(async move {
                    let model = insert_enrollment(txn, &enrollment).await?;
                    insert_history(
                        txn,
                        model.id,
                        None,
                        &model.status,
                        &audit,
                        enrollment.created_at,
                    )
                    .await?;
                    Ok(model)
                })
            })
            .await
            .context("create enrollment")?;
        Ok(enrollment_from_model(model)?)
    }

    async fn grant_access(
        &self,
        id: EnrollmentId,
        window: AccessWindow,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        let model = self
            .db
            .transaction::<_, Option<enrollments::Model>, DbErr>(|txn| {
                let audit = audit.clone();
                Box::pin(async move {
                    let updated = enrollments::Entity::update_many()
                        .col_expr(
                            enrollments::Column::AccessGrantedAt,
                            Expr::value(Some(window.granted_at)),
                        )
                        .col_expr(
                            enrollments::Column::AccessExpiresAt,
                            Expr::value(window.expires_at),
                        )
                        .col_expr(enrollments::Column::UpdatedAt, Expr::value(window.granted_at))
                        .filter(enrollments::Column::Id.eq(id.0))
                        .filter(enrollments::Column::AccessGrantedAt.is_null())
                        .exec_with_returning(txn)
                        .await?;
                    let Some(model) = updated.into_iter().next() else {
                        return Ok(None);
                    };
                    insert_history(
                        txn,
                        model.id,
                        Some(model.status.as_str()),
                        &model.status,
                        &audit,
                        window.granted_at,
                    )
                    .await?;
                    Ok(Some(model))
                })
            })
            .await
            .context("grant enrollment access")?;
        Ok(model.map(enrollment_from_model).transpose()?)
    }

    async fn set_access_expiry(
        &self,
        id: EnrollmentId,
        expires_at: Option<DateTime<Utc>>,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        let model = self
            .db
            .transaction::<_, Option<enrollments::Model>, DbErr>(|txn| {
                let audit = audit.clone();
                Box::pin(async move {
                    let now = Utc::now();
                    let updated = enrollments::Entity::update_many()
                        .col_expr(enrollments::Column::AccessExpiresAt, Expr::value(expires_at))
                        .col_expr(enrollments::Column::UpdatedAt, Expr::value(now))
                        .filter(enrollments::Column::Id.eq(id.0))
                        .filter(enrollments::Column::AccessGrantedAt.is_not_null())
                        .exec_with_returning(txn)
                        .await?;
                    let Some(model) = updated.into_iter().next() else {
                        return Ok(None);
                    };
                    insert_history(
                        txn,
                        model.id,
                        Some(model.status.as_str()),
                        &model.status,
                        &audit,
                        now,
                    )
                    .await?;
                    Ok(Some(model))
                })
            })
            .await
            .context("set enrollment access expiry")?;
        Ok(model.map(enrollment_from_model).transpose()?)
    }

    async fn update_status(
        &self,
        id: EnrollmentId,
        update: &StatusUpdate<EnrollmentStatus>,
        audit: &AuditNote,
    ) -> Result<Option<Enrollment>, EnrollmentsServiceError> {
        let model = self
            .db
            .transaction::<_, Option<enrollments::Model>, DbErr>(|txn| {
                let update = update.clone();
                let audit = audit.clone();
                Box::pin(async move {
                    let now = Utc::now();
                    let mut query = enrollments::Entity::update_many()
                        .col_expr(enrollments::Column::Status, Expr::value(update.to.as_str()))
                        .col_expr(enrollments::Column::UpdatedAt, Expr::value(now));
                    match update.block {
                        BlockChange::Keep => {}
                        BlockChange::Start {
                            reason,
                            executed_at,
                            ends_at,
                        } => {
                            query = query
                                .col_expr(enrollments::Column::BlockReason, Expr::value(reason))
                                .col_expr(
                                    enrollments::Column::BlockExecutedAt,
                                    Expr::value(Some(executed_at)),
                                )
                                .col_expr(enrollments::Column::BlockEndsAt, Expr::value(ends_at));
                        }
                        BlockChange::Lift => {
                            query = query.col_expr(
                                enrollments::Column::BlockEndsAt,
                                Expr::value(Option::<DateTime<Utc>>::None),
                            );
                        }
                    }
                    let updated = query
                        .filter(enrollments::Column::Id.eq(id.0))
                        .filter(enrollments::Column::Status.eq(update.from.as_str()))
                        .exec_with_returning(txn)
                        .await?;
                    let Some(model) = updated.into_iter().next() else {
                        return Ok(None);
                    };
                    insert_history(
                        txn,
                        model.id,
                        Some(update.from.as_str()),
                        update.to.as_str(),
                        &audit,
                        now,
                    )
                    .await?;
                    Ok(Some(model))
                })
            })
            .await
            .context("update enrollment status")?;
        Ok(model.map(enrollment_from_model).transpose()?)
    }

    async fn history(
        &self,
        id: EnrollmentId,
    ) -> Result<Vec<EnrollmentHistoryEntry>, EnrollmentsServiceError> {
        let models = enrollment_status_history::Entity::find()
            .filter(enrollment_status_history::Column::EnrollmentId.eq(id.0))
            .order_by_desc(enrollment_status_history::Column::CreatedAt)
            .order_by_desc(enrollment_status_history::Column::Id)
            .all(&self.db)
            .await
            .context("list enrollment history")?;
        let items = models
            .into_iter()
            .map(|m| -> anyhow::Result<EnrollmentHistoryEntry> {
                Ok(StatusChange {
                    id: m.id,
                    subject_id: m.enrollment_id,
                    previous_status: m
                        .previous_status
                        .as_deref()
                        .map(parse_enrollment_status)
                        .transpose()?,
                    new_status: parse_enrollment_status(&m.new_status)?,
                    reason: m.reason,
                    actor_id: m.actor_id,
                    metadata: m.metadata,
                    created_at: m.created_at,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(items)
    }
}

fn parse_enrollment_status(s: &str) -> anyhow::Result<EnrollmentStatus> {
    EnrollmentStatus::parse(s).with_context(|| format!("unknown enrollment status {s:?}"))
}

fn enrollment_from_model(model: enrollments::Model) -> anyhow::Result<Enrollment> {
    Ok(Enrollment {
        id: EnrollmentId(model.id),
        status: parse_enrollment_status(&model.status)?,
        code: model.code,
        student_id: model.student_id,
        course_id: model.course_id,
        institution_id: InstitutionId(model.institution_id),
        polo_id: model.polo_id,
        partner_id: model.partner_id,
        access_granted_at: model.access_granted_at,
        access_expires_at: model.access_expires_at,
        block_reason: model.block_reason,
        block_executed_at: model.block_executed_at,
        block_ends_at: model.block_ends_at,
        payment_gateway: model.payment_gateway,
        payment_external_id: model.payment_external_id,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Simplified enrollment repository ─────────────────────────────────────────

#[derive(Clone)]
pub struct DbSimplifiedEnrollmentRepository {
    pub db: DatabaseConnection,
}

impl SimplifiedEnrollmentRepository for DbSimplifiedEnrollmentRepository {
    async fn find_by_id(
        &self,
        id: SimplifiedEnrollmentId,
    ) -> Result<Option<SimplifiedEnrollment>, EnrollmentsServiceError> {
        let model = simplified_enrollments::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .context("find simplified enrollment by id")?;
        Ok(model.map(simplified_from_model).transpose()?)
    }

    async fn create(
        &self,
        enrollment: &NewSimplifiedEnrollment,
        audit: &AuditNote,
    ) -> Result<SimplifiedEnrollment, EnrollmentsServiceError> {
        let model = self
            .db
            .transaction::<_, simplified_enrollments::Model, DbErr>(|txn| {
                let e = enrollment.clone();
                let audit = audit.clone();
                Box::pin(async move {
                    let model = simplified_enrollments::ActiveModel {
                        student_name: Set(e.student_name),
                        student_email: Set(e.student_email),
                        student_cpf: Set(e.student_cpf),
                        student_phone: Set(e.student_phone),
                        course_id: Set(e.course_id),
                        institution_id: Set(e.institution_id.0),
                        polo_id: Set(e.polo_id),
                        partner_id: Set(e.partner_id),
                        amount_cents: Set(e.amount_cents),
                        payment_gateway: Set(e.payment_gateway),
                        payment_external_id: Set(e.payment_external_id),
                        status: Set(SimplifiedStatus::Pending.as_str().to_owned()),
                        converted_enrollment_id: Set(None),
                        created_at: Set(e.created_at),
                        updated_at: Set(e.created_at),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    insert_simplified_log(
                        txn,
                        model.id,
                        None,
                        &model.status,
                        &audit,
                        e.created_at,
                    )
                    .await?;
                    Ok(model)
                })
            })
            .await
            .context("create simplified enrollment")?;
        Ok(simplified_from_model(model)?)
    }

    async fn update_status(
        &self,
        id: SimplifiedEnrollmentId,
        update: &StatusUpdate<SimplifiedStatus>,
        audit: &AuditNote,
    ) -> Result<Option<SimplifiedEnrollment>, EnrollmentsServiceError> {
        let model = self
            .db
            .transaction::<_, Option<simplified_enrollments::Model>, DbErr>(|txn| {
                let (from, to) = (update.from, update.to);
                let audit = audit.clone();
                Box::pin(async move {
                    let now = Utc::now();
                    let updated = simplified_enrollments::Entity::update_many()
                        .col_expr(
                            simplified_enrollments::Column::Status,
                            Expr::value(to.as_str()),
                        )
                        .col_expr(simplified_enrollments::Column::UpdatedAt, Expr::value(now))
                        .filter(simplified_enrollments::Column::Id.eq(id.0))
                        .filter(simplified_enrollments::Column::Status.eq(from.as_str()))
                        .exec_with_returning(txn)
                        .await?;
                    let Some(model) = updated.into_iter().next() else {
                        return Ok(None);
                    };
                    insert_simplified_log(
                        txn,
                        model.id,
                        Some(from.as_str()),
                        to.as_str(),
                        &audit,
                        now,
                    )
                    .await?;
                    Ok(Some(model))
                })
            })
            .await
            .context("update simplified enrollment status")?;
        Ok(model.map(simplified_from_model).transpose()?)
    }

    async fn logs(
        &self,
        id: SimplifiedEnrollmentId,
    ) -> Result<Vec<SimplifiedStatusLog>, EnrollmentsServiceError> {
        let models = simplified_enrollment_status_logs::Entity::find()
            .filter(simplified_enrollment_status_logs::Column::SimplifiedEnrollmentId.eq(id.0))
            .order_by_desc(simplified_enrollment_status_logs::Column::CreatedAt)
            .order_by_desc(simplified_enrollment_status_logs::Column::Id)
            .all(&self.db)
            .await
            .context("list simplified enrollment status logs")?;
        let items = models
            .into_iter()
            .map(|m| -> anyhow::Result<SimplifiedStatusLog> {
                Ok(StatusChange {
                    id: m.id,
                    subject_id: m.simplified_enrollment_id,
                    previous_status: m
                        .previous_status
                        .as_deref()
                        .map(parse_simplified_status)
                        .transpose()?,
                    new_status: parse_simplified_status(&m.new_status)?,
                    reason: m.reason,
                    actor_id: m.actor_id,
                    metadata: m.metadata,
                    created_at: m.created_at,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(items)
    }
}

fn parse_simplified_status(s: &str) -> anyhow::Result<SimplifiedStatus> {
    SimplifiedStatus::parse(s).with_context(|| format!("unknown simplified status {s:?}"))
}

fn simplified_from_model(model: simplified_enrollments::Model) -> anyhow::Result<SimplifiedEnrollment> {
    Ok(SimplifiedEnrollment {
        id: SimplifiedEnrollmentId(model.id),
        status: parse_simplified_status(&model.status)?,
        student_name: model.student_name,
        student_email: model.student_email,
        student_cpf: model.student_cpf,
        student_phone: model.student_phone,
        course_id: model.course_id,
        institution_id: InstitutionId(model.institution_id),
        polo_id: model.polo_id,
        partner_id: model.partner_id,
        amount_cents: model.amount_cents,
        payment_gateway: model.payment_gateway,
        payment_external_id: model.payment_external_id,
        converted_enrollment_id: model.converted_enrollment_id.map(EnrollmentId),
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Institution repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbInstitutionRepository {
    pub db: DatabaseConnection,
}

impl InstitutionRepository for DbInstitutionRepository {
    async fn find_by_id(
        &self,
        id: InstitutionId,
    ) -> Result<Option<Institution>, EnrollmentsServiceError> {
        let model = institutions::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .context("find institution by id")?;
        Ok(model.map(institution_from_model).transpose()?)
    }

    async fn create(
        &self,
        institution: &NewInstitution,
    ) -> Result<Institution, EnrollmentsServiceError> {
        let policy = &institution.policy;
        let model = institutions::ActiveModel {
            name: Set(institution.name.clone()),
            enrollment_access_type: Set(policy.access_type.as_str().to_owned()),
            access_period_days: Set(policy.access_period_days.map(days_to_column).transpose()?),
            block_delay_days: Set(days_to_column(policy.block_delay_days)?),
            cancel_delay_days: Set(days_to_column(policy.cancel_delay_days)?),
            created_at: Set(institution.created_at),
            updated_at: Set(institution.created_at),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .context("create institution")?;
        Ok(institution_from_model(model)?)
    }

    async fn update_policy(
        &self,
        id: InstitutionId,
        policy: &AccessPolicy,
    ) -> Result<Option<Institution>, EnrollmentsServiceError> {
        let updated = institutions::Entity::update_many()
            .col_expr(
                institutions::Column::EnrollmentAccessType,
                Expr::value(policy.access_type.as_str()),
            )
            .col_expr(
                institutions::Column::AccessPeriodDays,
                Expr::value(policy.access_period_days.map(days_to_column).transpose()?),
            )
            .col_expr(
                institutions::Column::BlockDelayDays,
                Expr::value(days_to_column(policy.block_delay_days)?),
            )
            .col_expr(
                institutions::Column::CancelDelayDays,
                Expr::value(days_to_column(policy.cancel_delay_days)?),
            )
            .col_expr(institutions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(institutions::Column::Id.eq(id.0))
            .exec_with_returning(&self.db)
            .await
            .context("update institution access policy")?;
        Ok(updated
            .into_iter()
            .next()
            .map(institution_from_model)
            .transpose()?)
    }
}

fn days_to_column(days: u32) -> anyhow::Result<i32> {
    i32::try_from(days).with_context(|| format!("day count {days} out of range"))
}

fn days_from_column(days: i32) -> anyhow::Result<u32> {
    u32::try_from(days).with_context(|| format!("negative day count {days}"))
}

fn institution_from_model(model: institutions::Model) -> anyhow::Result<Institution> {
    let access_type = AccessType::parse(&model.enrollment_access_type).with_context(|| {
        format!(
            "unknown enrollment access type {:?}",
            model.enrollment_access_type
        )
    })?;
    Ok(Institution {
        id: InstitutionId(model.id),
        name: model.name,
        policy: AccessPolicy {
            access_type,
            access_period_days: model.access_period_days.map(days_from_column).transpose()?,
            block_delay_days: days_from_column(model.block_delay_days)?,
            cancel_delay_days: days_from_column(model.cancel_delay_days)?,
        },
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Account repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAccountRepository {
    pub db: DatabaseConnection,
}

impl DbAccountRepository {
    async fn load_portal(&self, user: &users::Model) -> anyhow::Result<Portal> {
        let portal = match user.portal_type.as_str() {
            "admin" => Portal::Admin,
            "student" => {
                let profile = student_profiles::Entity::find_by_id(user.id)
                    .one(&self.db)
                    .await
                    .context("find student profile")?;
                Portal::Student {
                    cpf: profile.as_ref().and_then(|p| p.cpf.clone()),
                    phone: profile.and_then(|p| p.phone),
                }
            }
            "polo" => {
                let member = polo_members::Entity::find_by_id(user.id)
                    .one(&self.db)
                    .await
                    .context("find polo membership")?
                    .with_context(|| format!("polo user {} has no polo link", user.id))?;
                Portal::Polo {
                    polo_id: member.polo_id,
                }
            }
            "partner" => {
                let member = partner_members::Entity::find_by_id(user.id)
                    .one(&self.db)
                    .await
                    .context("find partner membership")?
                    .with_context(|| format!("partner user {} has no partner link", user.id))?;
                Portal::Partner {
                    partner_id: member.partner_id,
                }
            }
            other => return Err(anyhow!("unknown portal type {other:?}")),
        };
        Ok(portal)
    }

    async fn account_from_model(&self, user: users::Model) -> anyhow::Result<Account> {
        let portal = self.load_portal(&user).await?;
        Ok(Account {
            id: user.id,
            email: user.email,
            username: user.username,
            name: user.name,
            password_hash: user.password_hash,
            portal,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }
}

impl AccountRepository for DbAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, EnrollmentsServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        match model {
            Some(user) => Ok(Some(self.account_from_model(user).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_login(
        &self,
        login: &str,
    ) -> Result<Option<Account>, EnrollmentsServiceError> {
        let model = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Email.eq(login))
                    .add(users::Column::Username.eq(login)),
            )
            .one(&self.db)
            .await
            .context("find user by login")?;
        match model {
            Some(user) => Ok(Some(self.account_from_model(user).await?)),
            None => Ok(None),
        }
    }
}

// ── Conversion port ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbConversionPort {
    pub db: DatabaseConnection,
}

async fn insert_student<C: ConnectionTrait>(
    db: &C,
    account: &NewStudentAccount,
) -> Result<(), DbErr> {
    users::ActiveModel {
        id: Set(account.id),
        email: Set(account.email.clone()),
        username: Set(account.username.clone()),
        name: Set(account.name.clone()),
        password_hash: Set(account.password_hash.clone()),
        portal_type: Set("student".to_owned()),
        created_at: Set(account.created_at),
        updated_at: Set(account.created_at),
    }
    .insert(db)
    .await?;
    student_profiles::ActiveModel {
        user_id: Set(account.id),
        cpf: Set(account.cpf.clone()),
        phone: Set(account.phone.clone()),
    }
    .insert(db)
    .await?;
    Ok(())
}

impl ConversionPort for DbConversionPort {
    async fn convert(
        &self,
        input: &ConversionInput,
    ) -> Result<ConversionOutcome, EnrollmentsServiceError> {
        let txn = self.db.begin().await.context("begin conversion")?;

        let record = simplified_enrollments::Entity::find_by_id(input.simplified_id.0)
            .lock_exclusive()
            .one(&txn)
            .await
            .context("lock simplified enrollment")?
            .ok_or(EnrollmentsServiceError::SimplifiedEnrollmentNotFound)?;
        let record = simplified_from_model(record)?;
        let institution = institutions::Entity::find_by_id(record.institution_id.0)
            .one(&txn)
            .await
            .context("find institution for conversion")?
            .ok_or(EnrollmentsServiceError::InstitutionNotFound)?;
        let existing_student_id = users::Entity::find()
            .filter(users::Column::Email.eq(record.student_email.as_str()))
            .one(&txn)
            .await
            .context("find student by email")?
            .map(|user| user.id);
        let snapshot = ConversionSnapshot {
            record,
            policy: institution_from_model(institution)?.policy,
            existing_student_id,
        };

        let write = match prepare_conversion(snapshot, input)? {
            ConversionStep::AlreadyConverted(enrollment_id) => {
                let existing = enrollments::Entity::find_by_id(enrollment_id.0)
                    .one(&txn)
                    .await
                    .context("find converted enrollment")?
                    .ok_or(EnrollmentsServiceError::EnrollmentNotFound)?;
                txn.commit().await.context("commit conversion lookup")?;
                return Ok(ConversionOutcome::AlreadyConverted(enrollment_from_model(
                    existing,
                )?));
            }
            ConversionStep::Write(write) => write,
        };

        if let Some(account) = &write.new_account {
            insert_student(&txn, account)
                .await
                .context("create student account")?;
        }
        if let Some(event) = &write.credentials_event {
            insert_outbox_event(&txn, event, write.now)
                .await
                .context("insert credentials outbox event")?;
        }

        let enrollment = insert_enrollment(&txn, &write.enrollment)
            .await
            .context("insert converted enrollment")?;
        insert_history(
            &txn,
            enrollment.id,
            None,
            &enrollment.status,
            &write.history,
            write.now,
        )
        .await
        .context("insert conversion history")?;

        simplified_enrollments::Entity::update_many()
            .col_expr(
                simplified_enrollments::Column::Status,
                Expr::value(SimplifiedStatus::Converted.as_str()),
            )
            .col_expr(
                simplified_enrollments::Column::ConvertedEnrollmentId,
                Expr::value(Some(enrollment.id)),
            )
            .col_expr(simplified_enrollments::Column::UpdatedAt, Expr::value(write.now))
            .filter(simplified_enrollments::Column::Id.eq(write.simplified_id.0))
            .exec(&txn)
            .await
            .context("mark simplified enrollment converted")?;

        insert_simplified_log(
            &txn,
            write.simplified_id.0,
            Some(write.from.as_str()),
            SimplifiedStatus::Converted.as_str(),
            &write.log_note(EnrollmentId(enrollment.id)),
            write.now,
        )
        .await
        .context("insert conversion status log")?;

        txn.commit().await.context("commit conversion")?;
        Ok(ConversionOutcome::Converted {
            enrollment: enrollment_from_model(enrollment)?,
            account_created: write.account_created(),
        })
    }
}
