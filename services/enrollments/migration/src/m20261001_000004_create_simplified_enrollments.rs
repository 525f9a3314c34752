use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SimplifiedEnrollments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::StudentName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::StudentEmail)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SimplifiedEnrollments::StudentCpf).string_len(14))
                    .col(ColumnDef::new(SimplifiedEnrollments::StudentPhone).string_len(32))
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::CourseId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::InstitutionId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SimplifiedEnrollments::PoloId).integer())
                    .col(ColumnDef::new(SimplifiedEnrollments::PartnerId).integer())
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SimplifiedEnrollments::PaymentGateway).string_len(64))
                    .col(ColumnDef::new(SimplifiedEnrollments::PaymentExternalId).string())
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::ConvertedEnrollmentId)
                            .integer()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                SimplifiedEnrollments::Table,
                                SimplifiedEnrollments::InstitutionId,
                            )
                            .to(Institutions::Table, Institutions::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                SimplifiedEnrollments::Table,
                                SimplifiedEnrollments::ConvertedEnrollmentId,
                            )
                            .to(Enrollments::Table, Enrollments::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SimplifiedEnrollmentStatusLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SimplifiedEnrollmentStatusLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollmentStatusLogs::SimplifiedEnrollmentId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollmentStatusLogs::PreviousStatus)
                            .string_len(32),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollmentStatusLogs::NewStatus)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SimplifiedEnrollmentStatusLogs::Reason).text())
                    .col(ColumnDef::new(SimplifiedEnrollmentStatusLogs::ActorId).uuid())
                    .col(
                        ColumnDef::new(SimplifiedEnrollmentStatusLogs::Metadata)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(SimplifiedEnrollmentStatusLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                SimplifiedEnrollmentStatusLogs::Table,
                                SimplifiedEnrollmentStatusLogs::SimplifiedEnrollmentId,
                            )
                            .to(SimplifiedEnrollments::Table, SimplifiedEnrollments::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SimplifiedEnrollmentStatusLogs::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SimplifiedEnrollments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SimplifiedEnrollments {
    Table,
    Id,
    StudentName,
    StudentEmail,
    StudentCpf,
    StudentPhone,
    CourseId,
    InstitutionId,
    PoloId,
    PartnerId,
    AmountCents,
    PaymentGateway,
    PaymentExternalId,
    Status,
    ConvertedEnrollmentId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SimplifiedEnrollmentStatusLogs {
    Table,
    Id,
    SimplifiedEnrollmentId,
    PreviousStatus,
    NewStatus,
    Reason,
    ActorId,
    Metadata,
    CreatedAt,
}

#[derive(Iden)]
enum Institutions {
    Table,
    Id,
}

#[derive(Iden)]
enum Enrollments {
    Table,
    Id,
}
