//! Ledger entries.
//!
//! `value` holds non-negative integer cents and `kind` is either `income` or
//! `outcome`; both are enforced with CHECK constraints.

use sea_orm_migration::prelude::*;

use crate::m20261017_090000_categories::Categories;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Entries {
    Table,
    Id,
    Title,
    Value,
    Kind,
    CategoryId,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Entries::Id).blob().not_null().primary_key())
                    .col(ColumnDef::new(Entries::Title).string().not_null())
                    .col(
                        ColumnDef::new(Entries::Value)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Entries::Value).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Entries::Kind)
                            .string()
                            .not_null()
                            .check(Expr::col(Entries::Kind).is_in(["income", "outcome"])),
                    )
                    .col(ColumnDef::new(Entries::CategoryId).blob().not_null())
                    .col(
                        ColumnDef::new(Entries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Entries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-category_id")
                            .from(Entries::Table, Entries::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-category_id")
                    .table(Entries::Table)
                    .col(Entries::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-created_at")
                    .table(Entries::Table)
                    .col(Entries::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await
    }
}
