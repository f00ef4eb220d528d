use std::{
    io::Cursor,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    CreateEntryCmd, Engine, EngineError, EntryKind, ImportPolicy, ImportRow, MoneyCents,
    StagedSource,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn count(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

fn cmd(title: &str, value: &str, kind: &str, category: &str) -> CreateEntryCmd {
    CreateEntryCmd::new(title, value, kind, category)
}

fn cents(units: i64) -> MoneyCents {
    MoneyCents::new(units * 100)
}

#[tokio::test]
async fn balance_scenario_rejects_overdraft() {
    let (engine, db) = engine_with_db().await;
    assert_eq!(engine.current_balance().await.unwrap(), MoneyCents::ZERO);

    engine
        .create_entry(cmd("Salary", "1000", "income", "Job"))
        .await
        .unwrap();
    assert_eq!(engine.current_balance().await.unwrap(), cents(1000));

    let err = engine
        .create_entry(cmd("Rent", "1200", "outcome", "Housing"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(engine.current_balance().await.unwrap(), cents(1000));
    // The rejected outcome left no category behind.
    assert_eq!(count(&db, "categories").await, 1);

    engine
        .create_entry(cmd("Rent", "800", "outcome", "Housing"))
        .await
        .unwrap();
    let balance = engine.balance().await.unwrap();
    assert_eq!(balance.income, cents(1000));
    assert_eq!(balance.outcome, cents(800));
    assert_eq!(balance.total, cents(200));
}

#[tokio::test]
async fn outcome_equal_to_balance_is_allowed() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_entry(cmd("Gift", "50.25", "income", "Misc"))
        .await
        .unwrap();
    engine
        .create_entry(cmd("Dinner", "50,25", "outcome", "Food"))
        .await
        .unwrap();
    assert_eq!(engine.current_balance().await.unwrap(), MoneyCents::ZERO);
}

#[tokio::test]
async fn validation_runs_in_order_and_writes_nothing() {
    let (engine, db) = engine_with_db().await;

    let err = engine
        .create_entry(cmd("Coffee", "not a number", "expense", "Food"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidKind(_)));

    let err = engine
        .create_entry(cmd("Coffee", "not a number", "outcome", "Food"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue(_)));

    let err = engine
        .create_entry(cmd("Coffee", "-3", "income", "Food"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue(_)));

    let err = engine
        .create_entry(cmd("Coffee", "3", "Income", "Food"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidKind(_)));

    assert_eq!(count(&db, "entries").await, 0);
    assert_eq!(count(&db, "categories").await, 0);
}

#[tokio::test]
async fn created_entry_is_returned_and_listed() {
    let (engine, _db) = engine_with_db().await;
    let entry = engine
        .create_entry(cmd("Salary", "1000.50", "income", "Job"))
        .await
        .unwrap();
    assert_eq!(entry.title, "Salary");
    assert_eq!(entry.value, MoneyCents::new(100_050));
    assert_eq!(entry.kind, EntryKind::Income);
    assert_eq!(entry.category.title, "Job");

    let listed = engine.list_entries().await.unwrap();
    assert_eq!(listed.len(), 1);
    let fetched = engine.entry(&entry.id.to_string()).await.unwrap();
    for stored in [&listed[0], &fetched] {
        assert_eq!(stored.id, entry.id);
        assert_eq!(stored.title, entry.title);
        assert_eq!(stored.value, entry.value);
        assert_eq!(stored.kind, entry.kind);
        assert_eq!(stored.category, entry.category);
    }
}

#[tokio::test]
async fn create_then_remove_restores_balance() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_entry(cmd("Salary", "1000", "income", "Job"))
        .await
        .unwrap();
    let before = engine.current_balance().await.unwrap();

    let entry = engine
        .create_entry(cmd("Groceries", "120", "outcome", "Food"))
        .await
        .unwrap();
    assert_eq!(engine.current_balance().await.unwrap(), cents(880));

    engine.remove_entry(&entry.id.to_string()).await.unwrap();
    assert_eq!(engine.current_balance().await.unwrap(), before);
}

#[tokio::test]
async fn remove_keeps_the_category() {
    let (engine, _db) = engine_with_db().await;
    let entry = engine
        .create_entry(cmd("Salary", "10", "income", "Job"))
        .await
        .unwrap();
    engine.remove_entry(&entry.id.to_string()).await.unwrap();

    let categories = engine.list_categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id, entry.category.id);
}

#[tokio::test]
async fn remove_reports_malformed_and_absent_ids_alike() {
    let (engine, _db) = engine_with_db().await;

    let malformed = engine.remove_entry("not-a-uuid").await.unwrap_err();
    let absent = engine
        .remove_entry(&Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert!(matches!(malformed, EngineError::NotFound(_)));
    assert_eq!(malformed, absent);

    let entry = engine
        .create_entry(cmd("Salary", "10", "income", "Job"))
        .await
        .unwrap();
    engine.remove_entry(&entry.id.to_string()).await.unwrap();
    let again = engine
        .remove_entry(&entry.id.to_string())
        .await
        .unwrap_err();
    assert_eq!(again, absent);
}

#[tokio::test]
async fn resolving_the_same_title_is_idempotent() {
    let (engine, db) = engine_with_db().await;

    let first = engine.resolve_category("Food").await.unwrap();
    for _ in 0..5 {
        let again = engine.resolve_category("Food").await.unwrap();
        assert_eq!(again, first);
    }
    assert_eq!(count(&db, "categories").await, 1);

    // Titles are case sensitive.
    let other = engine.resolve_category("food").await.unwrap();
    assert_ne!(other.id, first.id);
    assert_eq!(count(&db, "categories").await, 2);
}

#[tokio::test]
async fn concurrent_resolution_creates_one_category() {
    let (engine, db) = engine_with_db().await;
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move { engine.resolve_category("Travel").await });
    }

    let mut ids = Vec::new();
    while let Some(result) = tasks.join_next().await {
        ids.push(result.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(count(&db, "categories").await, 1);
}

#[tokio::test]
async fn bulk_resolution_matches_single_resolution() {
    let (engine, db) = engine_with_db().await;
    let job = engine.resolve_category("Job").await.unwrap();

    let resolved = engine
        .resolve_categories(["Food", "Job", "Food", "Rent"])
        .await
        .unwrap();
    let titles: Vec<&str> = resolved.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Food", "Job", "Rent"]);
    assert_eq!(resolved.created(), 2);
    assert_eq!(resolved.get("Job"), Some(&job));

    let food = engine.resolve_category("Food").await.unwrap();
    assert_eq!(resolved.get("Food"), Some(&food));
    assert_eq!(count(&db, "categories").await, 3);
}

#[tokio::test]
async fn reconcile_dedups_categories_and_keeps_order() {
    let (engine, db) = engine_with_db().await;
    let job = engine.resolve_category("Job").await.unwrap();

    let rows = vec![
        ImportRow::new("Coffee", "5", "outcome", "Food"),
        ImportRow::new("Coffee", "5", "outcome", "Food"),
        ImportRow::new("Bonus", "200", "income", "Job"),
    ];
    let entries = engine
        .reconcile(rows, ImportPolicy::default())
        .await
        .unwrap();

    assert_eq!(entries.len(), 3);
    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Coffee", "Coffee", "Bonus"]);
    assert_eq!(entries[0].category.id, entries[1].category.id);
    assert_eq!(entries[0].category.title, "Food");
    assert_eq!(entries[2].category, job);

    assert_eq!(count(&db, "categories").await, 2);
    assert_eq!(count(&db, "entries").await, 3);
}

#[tokio::test]
async fn reconcile_rerun_creates_no_categories() {
    let (engine, db) = engine_with_db().await;
    let rows = vec![
        ImportRow::new("Food", "10", "income", "Food"),
        ImportRow::new("Rent", "20", "income", "Rent"),
    ];
    let first = engine
        .reconcile(rows.clone(), ImportPolicy::default())
        .await
        .unwrap();
    let second = engine
        .reconcile(rows, ImportPolicy::default())
        .await
        .unwrap();

    assert_eq!(count(&db, "categories").await, 2);
    assert_eq!(first[0].category, second[0].category);
    assert_eq!(first[1].category, second[1].category);
    assert_eq!(count(&db, "entries").await, 4);
}

#[tokio::test]
async fn reconcile_of_nothing_is_a_no_op() {
    let (engine, db) = engine_with_db().await;
    let entries = engine
        .reconcile(Vec::new(), ImportPolicy::default())
        .await
        .unwrap();
    assert!(entries.is_empty());
    assert_eq!(count(&db, "entries").await, 0);
}

#[tokio::test]
async fn reconcile_skips_balance_check_by_default() {
    let (engine, _db) = engine_with_db().await;
    let rows = vec![ImportRow::new("Old rent", "700", "outcome", "Housing")];
    engine
        .reconcile(rows, ImportPolicy::default())
        .await
        .unwrap();
    assert_eq!(engine.current_balance().await.unwrap(), MoneyCents::new(-70_000));
}

#[tokio::test]
async fn reconcile_can_enforce_the_balance() {
    let (engine, db) = engine_with_db().await;
    engine
        .create_entry(cmd("Salary", "100", "income", "Job"))
        .await
        .unwrap();

    let rows = vec![
        ImportRow::new("Bonus", "50", "income", "Job"),
        ImportRow::new("Laptop", "200", "outcome", "Tech"),
        ImportRow::new("Refund", "500", "income", "Tech"),
    ];
    let err = engine
        .reconcile(rows, ImportPolicy::enforce_balance())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(count(&db, "entries").await, 1);
    assert_eq!(count(&db, "categories").await, 1);

    let rows = vec![
        ImportRow::new("Bonus", "50", "income", "Job"),
        ImportRow::new("Laptop", "150", "outcome", "Tech"),
    ];
    engine
        .reconcile(rows, ImportPolicy::enforce_balance())
        .await
        .unwrap();
    assert_eq!(engine.current_balance().await.unwrap(), MoneyCents::ZERO);
}

#[tokio::test]
async fn reconcile_rejects_unstorable_rows_atomically() {
    let (engine, db) = engine_with_db().await;
    let rows = vec![
        ImportRow::new("Coffee", "5", "outcome", "Food"),
        ImportRow::new("Tea", "abc", "outcome", "Food"),
    ];
    let err = engine
        .reconcile(rows, ImportPolicy::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue(ref msg) if msg.starts_with("row 2")));

    let rows = vec![ImportRow::new("Coffee", "5", "transfer", "Food")];
    let err = engine
        .reconcile(rows, ImportPolicy::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidKind(ref msg) if msg.starts_with("row 1")));

    assert_eq!(count(&db, "entries").await, 0);
    assert_eq!(count(&db, "categories").await, 0);
}

#[tokio::test]
async fn concurrent_outcomes_cannot_overdraw() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_entry(cmd("Salary", "100", "income", "Job"))
        .await
        .unwrap();
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..4 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            engine
                .create_entry(cmd(&format!("Spend {i}"), "80", "outcome", "Food"))
                .await
        });
    }

    let mut succeeded = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert!(matches!(err, EngineError::InsufficientFunds(_))),
        }
    }
    assert_eq!(succeeded, 1);
    assert_eq!(engine.current_balance().await.unwrap(), cents(20));
}

struct MemorySource {
    data: &'static str,
    released: Arc<AtomicBool>,
}

impl StagedSource for MemorySource {
    type Reader = Cursor<&'static [u8]>;

    fn reader(&self) -> std::io::Result<Self::Reader> {
        Ok(Cursor::new(self.data.as_bytes()))
    }

    async fn release(self) -> std::io::Result<()> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn import_csv_reconciles_and_releases_the_source() {
    let (engine, db) = engine_with_db().await;
    let released = Arc::new(AtomicBool::new(false));
    let source = MemorySource {
        data: "title,value,type,category\n\
               Loan,1500,income,Others\n\
               Website Hosting,50,outcome,Others\n\
               this line is broken\n\
               Ice cream,3,outcome,Food\n",
        released: Arc::clone(&released),
    };

    let entries = engine
        .import_csv(source, ImportPolicy::default())
        .await
        .unwrap();

    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Loan", "Website Hosting", "Ice cream"]);
    assert!(released.load(Ordering::SeqCst));
    assert_eq!(count(&db, "categories").await, 2);
    assert_eq!(engine.current_balance().await.unwrap(), cents(1447));
}

#[tokio::test]
async fn failed_import_keeps_the_source() {
    let (engine, db) = engine_with_db().await;
    let released = Arc::new(AtomicBool::new(false));
    let source = MemorySource {
        data: "title,value,type,category\nCoffee,5,outcome,Food\n",
        released: Arc::clone(&released),
    };

    let err = engine
        .import_csv(source, ImportPolicy::enforce_balance())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert!(!released.load(Ordering::SeqCst));
    assert_eq!(count(&db, "entries").await, 0);
}

const HUGE: &str = "90000000000000000";

#[tokio::test]
async fn enforced_reconcile_reports_overflowing_totals() {
    let (engine, db) = engine_with_db().await;
    let rows = vec![
        ImportRow::new("a", HUGE, "income", "X"),
        ImportRow::new("b", HUGE, "income", "X"),
    ];
    let err = engine
        .reconcile(rows, ImportPolicy::enforce_balance())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue(ref msg) if msg.starts_with("row 2")));
    assert_eq!(count(&db, "entries").await, 0);
}

#[tokio::test]
async fn ledger_totals_never_leave_i64() {
    let (engine, db) = engine_with_db().await;
    let rows = vec![
        ImportRow::new("a", HUGE, "income", "X"),
        ImportRow::new("b", HUGE, "income", "X"),
    ];
    let err = engine
        .reconcile(rows, ImportPolicy::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue(_)));
    assert_eq!(count(&db, "entries").await, 0);

    engine
        .create_entry(cmd("a", HUGE, "income", "X"))
        .await
        .unwrap();
    let err = engine
        .create_entry(cmd("b", HUGE, "income", "X"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue(_)));

    engine
        .create_entry(cmd("c", "1", "outcome", "Y"))
        .await
        .unwrap();
    let balance = engine.balance().await.unwrap();
    assert_eq!(balance.income, MoneyCents::new(9_000_000_000_000_000_000));
    assert_eq!(balance.total, MoneyCents::new(8_999_999_999_999_999_900));
}

#[tokio::test]
async fn reconcile_handles_batches_beyond_one_statement() {
    let (engine, db) = engine_with_db().await;
    let rows: Vec<ImportRow> = (0..9000)
        .map(|i| ImportRow::new(format!("entry-{i}"), "1", "income", format!("cat-{i}")))
        .collect();

    let entries = engine
        .reconcile(rows, ImportPolicy::default())
        .await
        .unwrap();

    assert_eq!(entries.len(), 9000);
    assert_eq!(entries[0].title, "entry-0");
    assert_eq!(entries[8999].title, "entry-8999");
    assert_eq!(entries[8999].category.title, "cat-8999");
    assert_eq!(count(&db, "entries").await, 9000);
    assert_eq!(count(&db, "categories").await, 9000);
    assert_eq!(engine.current_balance().await.unwrap(), cents(9000));
}

#[tokio::test]
async fn bulk_resolution_spans_several_chunks() {
    let (engine, db) = engine_with_db().await;
    engine.resolve_category("title-700").await.unwrap();

    let titles: Vec<String> = (0..1200).map(|i| format!("title-{i}")).collect();
    let resolved = engine.resolve_categories(&titles).await.unwrap();

    assert_eq!(resolved.len(), 1200);
    assert_eq!(resolved.created(), 1199);
    let ordered: Vec<_> = resolved.iter().map(|c| c.title.clone()).collect();
    assert_eq!(ordered, titles);
    assert_eq!(count(&db, "categories").await, 1200);
}
