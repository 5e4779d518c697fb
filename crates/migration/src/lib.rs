pub use sea_orm_migration::prelude::*;

mod m20250612_000001_users;
mod m20250612_000002_tokens;
mod m20250620_000001_transactions;
mod m20250705_000001_conversations;
mod m20250718_000001_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250612_000001_users::Migration),
            Box::new(m20250612_000002_tokens::Migration),
            Box::new(m20250620_000001_transactions::Migration),
            Box::new(m20250705_000001_conversations::Migration),
            Box::new(m20250718_000001_settings::Migration),
        ]
    }
}
