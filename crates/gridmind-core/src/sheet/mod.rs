mod merge;
mod ops;
mod state;

pub use merge::AiResolution;
pub use state::{ChangeRecord, Sheet, TableColumn, TableSchema};
