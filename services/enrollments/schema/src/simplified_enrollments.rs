use sea_orm::entity::prelude::*;

/// Pre-enrollment captured before the student has an account.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "simplified_enrollments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub student_name: String,
    pub student_email: String,
    pub student_cpf: Option<String>,
    pub student_phone: Option<String>,
    pub course_id: i32,
    pub institution_id: i32,
    pub polo_id: Option<i32>,
    pub partner_id: Option<i32>,
    pub amount_cents: i64,
    pub payment_gateway: Option<String>,
    pub payment_external_id: Option<String>,
    pub status: String,
    #[sea_orm(unique)]
    pub converted_enrollment_id: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::institutions::Entity",
        from = "Column::InstitutionId",
        to = "super::institutions::Column::Id"
    )]
    Institution,
    #[sea_orm(
        belongs_to = "super::enrollments::Entity",
        from = "Column::ConvertedEnrollmentId",
        to = "super::enrollments::Column::Id"
    )]
    ConvertedEnrollment,
    #[sea_orm(has_many = "super::simplified_enrollment_status_logs::Entity")]
    StatusLogs,
}

impl Related<super::institutions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Institution.def()
    }
}

impl Related<super::enrollments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConvertedEnrollment.def()
    }
}

impl Related<super::simplified_enrollment_status_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
