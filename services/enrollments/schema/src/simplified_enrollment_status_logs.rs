use sea_orm::entity::prelude::*;

/// Append-only audit row for a simplified-enrollment status change.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "simplified_enrollment_status_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub simplified_enrollment_id: i32,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub reason: Option<String>,
    pub actor_id: Option<Uuid>,
    pub metadata: Json,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::simplified_enrollments::Entity",
        from = "Column::SimplifiedEnrollmentId",
        to = "super::simplified_enrollments::Column::Id"
    )]
    SimplifiedEnrollment,
}

impl Related<super::simplified_enrollments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SimplifiedEnrollment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
