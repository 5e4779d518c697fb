use sea_orm_migration::prelude::*;

use crate::m20250612_000001_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Tokens {
    Table,
    Id,
    UserId,
    Token,
    Kind,
    ExpiresAt,
    UserAgent,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tokens::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tokens::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Tokens::UserId).string().not_null())
                    .col(ColumnDef::new(Tokens::Token).string().not_null())
                    .col(ColumnDef::new(Tokens::Kind).string().not_null())
                    .col(ColumnDef::new(Tokens::ExpiresAt).timestamp().not_null())
                    .col(ColumnDef::new(Tokens::UserAgent).string())
                    .col(ColumnDef::new(Tokens::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-tokens-user_id")
                            .from(Tokens::Table, Tokens::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-tokens-token")
                    .table(Tokens::Table)
                    .col(Tokens::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-tokens-user_id-kind")
                    .table(Tokens::Table)
                    .col(Tokens::UserId)
                    .col(Tokens::Kind)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tokens::Table).to_owned())
            .await
    }
}
