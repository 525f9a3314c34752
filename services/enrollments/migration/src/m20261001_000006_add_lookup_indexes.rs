use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .table(Enrollments::Table)
                    .col(Enrollments::StudentId)
                    .name("idx_enrollments_student_id")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Enrollments::Table)
                    .col(Enrollments::InstitutionId)
                    .col(Enrollments::Status)
                    .name("idx_enrollments_institution_id_status")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(EnrollmentStatusHistory::Table)
                    .col(EnrollmentStatusHistory::EnrollmentId)
                    .col(EnrollmentStatusHistory::CreatedAt)
                    .name("idx_enrollment_status_history_enrollment_id")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(SimplifiedEnrollmentStatusLogs::Table)
                    .col(SimplifiedEnrollmentStatusLogs::SimplifiedEnrollmentId)
                    .col(SimplifiedEnrollmentStatusLogs::CreatedAt)
                    .name("idx_simplified_status_logs_simplified_enrollment_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_simplified_status_logs_simplified_enrollment_id",
            "idx_enrollment_status_history_enrollment_id",
            "idx_enrollments_institution_id_status",
            "idx_enrollments_student_id",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
enum Enrollments {
    Table,
    StudentId,
    InstitutionId,
    Status,
}

#[derive(Iden)]
enum EnrollmentStatusHistory {
    Table,
    EnrollmentId,
    CreatedAt,
}

#[derive(Iden)]
enum SimplifiedEnrollmentStatusLogs {
    Table,
    SimplifiedEnrollmentId,
    CreatedAt,
}
