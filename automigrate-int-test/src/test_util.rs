use automigrate::errors::{AutomigrateError, AutomigrateResult, ErrorKind};
use automigrate::schema::CollectionDefinition;
use automigrate::store::{InMemorySchemaStore, SchemaStore, SchemaStoreProvider};
use automigrate::{AutoMigrator, AutomigrateBuilder, SchemaEventBus, TemplateLang};
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use std::{env, fs};

/// Runs `test` between `before` and `after`, reporting failures and panics
/// with the time they took. `after` runs even when the test fails.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> AutomigrateResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> AutomigrateResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> AutomigrateResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    init_logging();
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        let ctx = match before() {
            Ok(ctx) => ctx,
            Err(e) => return Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        };

        match test(ctx.clone()) {
            Ok(_) => after(ctx)
                .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
            Err(e) => {
                let _ = after(ctx);
                Err((format!("Test failed: {:?}", e), backtrace.to_string()))
            }
        }
    });

    let elapsed = start_time.elapsed();
    let (error, backtrace) = match result {
        Ok(Ok(_)) => return,
        Ok(Err((error, backtrace))) => (error, Some(backtrace)),
        Err(panic_err) => {
            let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (format!("Panic: {}", message), None)
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {:?}", elapsed);
    eprintln!("Error: {}", error);
    if let Some(bt) = &backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!("{}", error);
}

/// Installs the colored test logger once per process.
pub fn init_logging() {
    let _ = colog::default_builder().try_init();
}

/// A schema store that can be switched into failure mode.
#[derive(Clone)]
pub struct FlakyStore {
    memory: InMemorySchemaStore,
    failing: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new(memory: InMemorySchemaStore) -> Self {
        FlakyStore {
            memory,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> AutomigrateResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AutomigrateError::new(
                "schema store is unavailable",
                ErrorKind::StoreError,
            ));
        }
        Ok(())
    }
}

impl SchemaStoreProvider for FlakyStore {
    fn find_all(&self) -> AutomigrateResult<Vec<CollectionDefinition>> {
        self.check()?;
        self.memory.find_all()
    }

    fn find_by_name_or_id(&self, name_or_id: &str) -> AutomigrateResult<CollectionDefinition> {
        self.check()?;
        self.memory.find_by_name_or_id(name_or_id)
    }
}

/// A registered migrator over an in-memory store, writing into its own
/// directory.
#[derive(Clone)]
pub struct TestContext {
    dir: PathBuf,
    store: InMemorySchemaStore,
    flaky: FlakyStore,
    bus: SchemaEventBus,
    migrator: AutoMigrator,
}

impl TestContext {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The host store; saving or deleting through it triggers migrations.
    pub fn store(&self) -> InMemorySchemaStore {
        self.store.clone()
    }

    pub fn bus(&self) -> SchemaEventBus {
        self.bus.clone()
    }

    pub fn migrator(&self) -> AutoMigrator {
        self.migrator.clone()
    }

    /// Makes every store query of the migrator fail, or stop failing.
    pub fn fail_store(&self, failing: bool) {
        self.flaky.set_failing(failing);
    }

    /// Migration files written so far, in file name order.
    pub fn migration_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = match fs::read_dir(&self.dir) {
            Ok(entries) => entries.flatten().map(|entry| entry.path()).collect(),
            Err(_) => Vec::new(),
        };
        files.sort();
        files
    }

    /// Reads the single file whose name ends with `suffix`.
    pub fn read_migration(&self, suffix: &str) -> String {
        let matching: Vec<PathBuf> = self
            .migration_files()
            .into_iter()
            .filter(|path| file_name(path).ends_with(suffix))
            .collect();
        assert_eq!(matching.len(), 1, "expected one migration ending with {}", suffix);
        fs::read_to_string(&matching[0]).unwrap_or_default()
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("automigrate-{}", id))
}

/// Splits a rendered migration into its up and down blocks.
pub fn split_blocks(script: &str) -> (String, String) {
    for separator in ["}, (app) => {", "}, func(app core.App) error {"] {
        if let Some((up, down)) = script.split_once(separator) {
            return (up.to_string(), down.to_string());
        }
    }
    (script.to_string(), String::new())
}

pub fn create_test_context() -> AutomigrateResult<TestContext> {
    create_test_context_with(TemplateLang::Js, true)
}

pub fn create_go_test_context() -> AutomigrateResult<TestContext> {
    create_test_context_with(TemplateLang::Go, true)
}

pub fn create_disabled_test_context() -> AutomigrateResult<TestContext> {
    create_test_context_with(TemplateLang::Js, false)
}

pub fn create_test_context_with(lang: TemplateLang, enabled: bool) -> AutomigrateResult<TestContext> {
    let dir = random_path();
    let config = AutomigrateBuilder::new()
        .template_lang(lang)
        .migrations_dir(&dir)
        .auto_enabled(enabled)
        .build()?;

    let bus = SchemaEventBus::new();
    let store = InMemorySchemaStore::new();
    store.attach_event_bus(bus.clone());

    let flaky = FlakyStore::new(store.clone());
    let migrator = AutoMigrator::new(config, SchemaStore::new(flaky.clone()));
    migrator.register(&bus)?;

    Ok(TestContext {
        dir,
        store,
        flaky,
        bus,
        migrator,
    })
}

pub fn cleanup(ctx: TestContext) -> AutomigrateResult<()> {
    ctx.migrator().unregister()?;
    ctx.bus().close()?;
    match fs::remove_dir_all(ctx.dir()) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AutomigrateError::from(e)),
    }
}
