use chrono::{DateTime, Utc};
use gridmind_engine::engine::{Cell, CellRef, Grid};
use std::collections::{HashMap, HashSet};

/// A column in a table schema definition.
#[derive(Clone, Debug)]
pub struct TableColumn {
    pub name: String,
    pub kind: String,
    pub foreign_key: Option<String>,
}

/// A relational table definition. Carried by the data model for the
/// Database view; no current operation creates or reads one.
#[derive(Clone, Debug)]
pub struct TableSchema {
    pub id: String,
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<TableColumn>,
}

/// One entry in the sheet's change history. Appended on every mutation,
/// read by nothing.
#[derive(Clone, Debug)]
pub struct ChangeRecord {
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub description: String,
    pub diff: HashMap<CellRef, Cell>,
}

/// UI-agnostic sheet document.
pub struct Sheet {
    pub id: String,
    pub name: String,
    /// The cell store (DashMap is internally Arc-based, clones are cheap).
    pub grid: Grid,
    /// Table schema definitions (unused stub).
    pub tables: Vec<TableSchema>,
    /// Append-only change history.
    pub history: Vec<ChangeRecord>,
    /// The cell currently focused in the view, if any.
    pub active_cell: Option<CellRef>,
    /// Currently selected cells.
    pub selection: Vec<CellRef>,
    /// Reverse dependency map: cell -> cells whose formulas read it.
    pub dependents: HashMap<CellRef, HashSet<CellRef>>,
}

impl Sheet {
    /// Create an empty sheet.
    ///
    /// This constructor is side-effect free: no filesystem, no network.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Sheet {
            id: id.into(),
            name: name.into(),
            grid: Grid::default(),
            tables: Vec::new(),
            history: Vec::new(),
            active_cell: None,
            selection: Vec::new(),
            dependents: HashMap::new(),
        }
    }

    /// The default demo sheet: a small supply-chain table with one formula.
    pub fn with_demo_data() -> Self {
        let mut sheet = Sheet::new("project-1", "Global Supply Chain Analysis");
        let seed = [
            ("A1", "Product Name"),
            ("B1", "Quantity"),
            ("C1", "Unit Price"),
            ("D1", "Total"),
            ("A2", "Omnistation 5"),
            ("B2", "150"),
            ("C2", "499.99"),
            ("D2", "=150*499.99"),
        ];
        for (id, input) in seed {
            let cell_ref = CellRef::from_str(id).expect("demo seed addresses are valid");
            sheet.set_cell_from_input(cell_ref, input);
        }
        sheet.active_cell = CellRef::from_str("D2");
        sheet
    }

    /// Number of cells with any content.
    pub fn populated_count(&self) -> usize {
        self.grid.len()
    }

    /// Rebuild the reverse dependency map from the grid.
    /// Call after cells are added, removed, or their formulas change.
    pub(crate) fn rebuild_dependents(&mut self) {
        self.dependents.clear();
        for entry in self.grid.iter() {
            let cell_ref = entry.key();
            for dep in &entry.value().depends_on {
                self.dependents
                    .entry(dep.clone())
                    .or_default()
                    .insert(cell_ref.clone());
            }
        }
    }
}
