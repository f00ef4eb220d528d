//! Command structs for engine operations.
//!
//! These types carry raw, not yet validated input into the write operations
//! (create/import), keeping call sites readable and avoiding long argument
//! lists.

/// Create a single ledger entry.
///
/// `value` and `kind` are kept as received from the edge: the engine reports
/// malformed ones as [`EngineError::InvalidValue`] and
/// [`EngineError::InvalidKind`].
///
/// [`EngineError::InvalidValue`]: crate::EngineError::InvalidValue
/// [`EngineError::InvalidKind`]: crate::EngineError::InvalidKind
#[derive(Clone, Debug)]
pub struct CreateEntryCmd {
    pub title: String,
    pub value: String,
    pub kind: String,
    pub category: String,
}

impl CreateEntryCmd {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        value: impl Into<String>,
        kind: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            kind: kind.into(),
            category: category.into(),
        }
    }
}

/// One decoded row of a batch import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRow {
    pub title: String,
    pub value: String,
    pub kind: String,
    pub category: String,
}

impl ImportRow {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        value: impl Into<String>,
        kind: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            kind: kind.into(),
            category: category.into(),
        }
    }
}

/// Whether a batch import must keep the balance non-negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BalanceCheck {
    /// Imported rows are treated as already settled history.
    #[default]
    Skip,
    /// Rows are replayed in order on top of the committed balance and the
    /// whole batch is rejected if the running balance goes negative.
    Enforce,
}

/// Options for [`Engine::reconcile`](crate::Engine::reconcile).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportPolicy {
    pub balance_check: BalanceCheck,
}

impl ImportPolicy {
    #[must_use]
    pub fn enforce_balance() -> Self {
        Self {
            balance_check: BalanceCheck::Enforce,
        }
    }
}
