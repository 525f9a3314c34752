use sea_orm::entity::prelude::*;

/// Tenant institution and the access policy applied to its enrollments.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "institutions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// `after_link_completion` | `after_payment_confirmation`
    pub enrollment_access_type: String,
    /// `NULL` = unlimited access.
    pub access_period_days: Option<i32>,
    pub block_delay_days: i32,
    pub cancel_delay_days: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::enrollments::Entity")]
    Enrollments,
    #[sea_orm(has_many = "super::simplified_enrollments::Entity")]
    SimplifiedEnrollments,
}

impl Related<super::enrollments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl Related<super::simplified_enrollments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SimplifiedEnrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
