pub mod analyzer;
pub mod database;
pub mod metrics;
pub mod storage;

pub use analyzer::{Analyzer, AnalyzerError, MockAnalyzer, RemoteAnalyzer};
pub use database::Database;
pub use self::metrics::{get_metrics, init_metrics};
pub use storage::{sanitize_filename, LocalStorage, Storage};
