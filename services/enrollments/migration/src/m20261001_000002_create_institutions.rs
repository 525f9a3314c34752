use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Institutions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Institutions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Institutions::Name).string().not_null())
                    .col(
                        ColumnDef::new(Institutions::EnrollmentAccessType)
                            .string_len(32)
                            .not_null()
                            .default("after_link_completion"),
                    )
                    .col(ColumnDef::new(Institutions::AccessPeriodDays).integer())
                    .col(
                        ColumnDef::new(Institutions::BlockDelayDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Institutions::CancelDelayDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Institutions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Institutions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Institutions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Institutions {
    Table,
    Id,
    Name,
    EnrollmentAccessType,
    AccessPeriodDays,
    BlockDelayDays,
    CancelDelayDays,
    CreatedAt,
    UpdatedAt,
}
