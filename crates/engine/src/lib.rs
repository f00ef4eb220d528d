pub use categories::Category;
pub use commands::{BalanceCheck, CreateEntryCmd, ImportPolicy, ImportRow};
pub use csv_import::{StagedSource, decode_rows};
pub use entries::{Entry, EntryKind};
pub use error::EngineError;
pub use money::MoneyCents;
pub use ops::{Balance, Engine, EngineBuilder, ResolvedCategories};

mod categories;
mod commands;
mod csv_import;
mod entries;
mod error;
mod money;
mod ops;

type ResultEngine<T> = Result<T, EngineError>;
