use std::fmt;

/// Packed symbol identifier: a builtin table position or a radix-40 name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// Index into the cell arena. This is the GC handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub u32);

/// A reference held by the interpreter: either empty or a cell in the arena.
/// Copy semantics: the cell contents live in the heap.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Value {
    #[default]
    Nil,
    Cell(CellId),
}

impl Value {
    pub fn is_nil(self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_cell(self) -> Option<CellId> {
        match self {
            Value::Cell(id) => Some(id),
            Value::Nil => None,
        }
    }
}

impl From<CellId> for Value {
    fn from(id: CellId) -> Self {
        Value::Cell(id)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Cell(id) => write!(f, "Cell({})", id.0),
        }
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({})", self.0)
    }
}
