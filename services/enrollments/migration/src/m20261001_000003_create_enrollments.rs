use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Enrollments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Enrollments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Enrollments::Code)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Enrollments::StudentId).uuid().not_null())
                    .col(ColumnDef::new(Enrollments::CourseId).integer().not_null())
                    .col(ColumnDef::new(Enrollments::InstitutionId).integer().not_null())
                    .col(ColumnDef::new(Enrollments::PoloId).integer())
                    .col(ColumnDef::new(Enrollments::PartnerId).integer())
                    .col(ColumnDef::new(Enrollments::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Enrollments::AccessGrantedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Enrollments::AccessExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Enrollments::BlockReason).text())
                    .col(ColumnDef::new(Enrollments::BlockExecutedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Enrollments::BlockEndsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Enrollments::PaymentGateway).string_len(64))
                    .col(ColumnDef::new(Enrollments::PaymentExternalId).string())
                    .col(
                        ColumnDef::new(Enrollments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Enrollments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(
                        Expr::col(Enrollments::AccessExpiresAt)
                            .is_null()
                            .or(Expr::col(Enrollments::AccessExpiresAt)
                                .gte(Expr::col(Enrollments::AccessGrantedAt))),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Enrollments::Table, Enrollments::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Enrollments::Table, Enrollments::InstitutionId)
                            .to(Institutions::Table, Institutions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EnrollmentStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EnrollmentStatusHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EnrollmentStatusHistory::EnrollmentId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnrollmentStatusHistory::PreviousStatus).string_len(32))
                    .col(
                        ColumnDef::new(EnrollmentStatusHistory::NewStatus)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnrollmentStatusHistory::Reason).text())
                    .col(ColumnDef::new(EnrollmentStatusHistory::ActorId).uuid())
                    .col(
                        ColumnDef::new(EnrollmentStatusHistory::Metadata)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(EnrollmentStatusHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                EnrollmentStatusHistory::Table,
                                EnrollmentStatusHistory::EnrollmentId,
                            )
                            .to(Enrollments::Table, Enrollments::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EnrollmentStatusHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Enrollments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Enrollments {
    Table,
    Id,
    Code,
    StudentId,
    CourseId,
    InstitutionId,
    PoloId,
    PartnerId,
    Status,
    AccessGrantedAt,
    AccessExpiresAt,
    BlockReason,
    BlockExecutedAt,
    BlockEndsAt,
    PaymentGateway,
    PaymentExternalId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum EnrollmentStatusHistory {
    Table,
    Id,
    EnrollmentId,
    PreviousStatus,
    NewStatus,
    Reason,
    ActorId,
    Metadata,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}

#[derive(Iden)]
enum Institutions {
    Table,
    Id,
}
