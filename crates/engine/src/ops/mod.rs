use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;

use crate::ResultEngine;

mod balances;
mod categories;
mod entries;
mod import;

pub use balances::Balance;

/// Rows or titles per statement, well below SQLite's bound parameter limit.
const CHUNK_ROWS: usize = 500;
pub use categories::ResolvedCategories;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// The transaction is dropped (and therefore rolled back) on every early
/// return out of the block.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The ledger engine.
///
/// Every write is one unit of work on the database. Writes that depend on
/// the balance (`create_entry`, `remove_entry`, `reconcile`) additionally run
/// under the ledger write lock, so a balance check and the insert it guards
/// cannot interleave with another writer.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    write_lock: Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            write_lock: Mutex::new(()),
        })
    }
}
