// Library surface for the headless engine and integration tests.
// The terminal front end lives in main.rs and ui/.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod hand_table;
pub mod logging;
pub mod progress;
pub mod runtime;
pub mod selector;
pub mod session;
pub mod storage;

pub use error::{LoadError, PersistError, StorageError};
pub use hand_table::{Item, TableSource};
pub use progress::{ProgressRecord, ProgressStore};
pub use selector::{pick, HandSelector, UniformSelector, WeightedSelector};
pub use session::{AnswerStatus, Drill, Feedback, MissSummary, Tally};
pub use storage::{KeyValueStore, MemoryStore};
