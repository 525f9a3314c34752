use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_institutions;
mod m20261001_000003_create_enrollments;
mod m20261001_000004_create_simplified_enrollments;
mod m20261001_000005_create_outbox_events;
mod m20261001_000006_add_lookup_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users::Migration),
            Box::new(m20261001_000002_create_institutions::Migration),
            Box::new(m20261001_000003_create_enrollments::Migration),
            Box::new(m20261001_000004_create_simplified_enrollments::Migration),
            Box::new(m20261001_000005_create_outbox_events::Migration),
            Box::new(m20261001_000006_add_lookup_indexes::Migration),
        ]
    }
}
