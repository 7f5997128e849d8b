//! gridmind-core - UI-agnostic sheet document and AI merge protocol.

pub mod sheet;

pub use sheet::{AiResolution, ChangeRecord, Sheet, TableColumn, TableSchema};

pub use gridmind_engine::engine::CellRef;
