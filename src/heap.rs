use crate::error::{LispError, LispResult};
use crate::value::{CellId, SymbolId, Value};

/// What a cell currently holds. The tag is explicit, so a pair whose head is
/// empty is still a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Pair { head: Value, tail: Value },
    Symbol(SymbolId),
    /// On the free list; `next` threads to the following free cell.
    Free { next: Value },
}

/// A single arena slot.
struct Cell {
    kind: CellKind,
    /// Only the collector reads or writes this.
    mark: bool,
}

/// The fixed-capacity cell arena. All cells are preallocated at startup and
/// unused ones are chained through an intrusive free list.
pub struct Heap {
    cells: Vec<Cell>,
    free_list: Value,
    free_count: usize,
}

impl Heap {
    /// Preallocate `capacity` cells, all free. The chain starts at cell 0.
    pub fn new(capacity: usize) -> Self {
        let mut heap = Heap {
            cells: Vec::with_capacity(capacity),
            free_list: Value::Nil,
            free_count: 0,
        };
        heap.cells.resize_with(capacity, || Cell {
            kind: CellKind::Free { next: Value::Nil },
            mark: false,
        });
        for i in (0..capacity).rev() {
            heap.release(CellId(i as u32));
        }
        heap
    }

    fn take(&mut self, kind: CellKind) -> LispResult<CellId> {
        let id = self.free_list.as_cell().ok_or(LispError::NoRoom)?;
        let cell = &mut self.cells[id.0 as usize];
        self.free_list = match cell.kind {
            CellKind::Free { next } => next,
            _ => Value::Nil,
        };
        cell.kind = kind;
        cell.mark = false;
        self.free_count -= 1;
        Ok(id)
    }

    /// Allocate a pair cell.
    pub fn alloc_pair(&mut self, head: Value, tail: Value) -> LispResult<CellId> {
        self.take(CellKind::Pair { head, tail })
    }

    /// Allocate a symbol atom.
    pub fn alloc_symbol(&mut self, name: SymbolId) -> LispResult<CellId> {
        self.take(CellKind::Symbol(name))
    }

    /// Allocate a pair and return it as a value.
    pub fn cons(&mut self, head: Value, tail: Value) -> LispResult<Value> {
        Ok(Value::Cell(self.alloc_pair(head, tail)?))
    }

    /// Allocate a symbol and return it as a value.
    pub fn symbol(&mut self, name: SymbolId) -> LispResult<Value> {
        Ok(Value::Cell(self.alloc_symbol(name)?))
    }

    /// Put a cell back on the free list.
    pub fn release(&mut self, id: CellId) {
        let cell = &mut self.cells[id.0 as usize];
        cell.kind = CellKind::Free {
            next: self.free_list,
        };
        cell.mark = false;
        self.free_list = Value::Cell(id);
        self.free_count += 1;
    }

    /// The shape of a non-empty value.
    #[inline]
    pub fn kind(&self, id: CellId) -> CellKind {
        self.cells[id.0 as usize].kind
    }

    pub fn is_pair(&self, val: Value) -> bool {
        match val {
            Value::Cell(id) => matches!(self.kind(id), CellKind::Pair { .. }),
            Value::Nil => false,
        }
    }

    pub fn is_symbol(&self, val: Value) -> bool {
        self.symbol_id(val).is_some()
    }

    /// Empty or a pair.
    pub fn is_list(&self, val: Value) -> bool {
        val.is_nil() || self.is_pair(val)
    }

    /// Empty or anything that is not a pair.
    pub fn is_atom(&self, val: Value) -> bool {
        !self.is_pair(val)
    }

    pub fn symbol_id(&self, val: Value) -> Option<SymbolId> {
        match self.kind(val.as_cell()?) {
            CellKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// True if `val` is a symbol atom with the given id.
    pub fn is_named(&self, val: Value, name: SymbolId) -> bool {
        self.symbol_id(val) == Some(name)
    }

    /// Head of a pair; empty for anything else.
    #[inline]
    pub fn car(&self, val: Value) -> Value {
        match val.as_cell().map(|id| self.kind(id)) {
            Some(CellKind::Pair { head, .. }) => head,
            _ => Value::Nil,
        }
    }

    /// Tail of a pair; empty for anything else.
    #[inline]
    pub fn cdr(&self, val: Value) -> Value {
        match val.as_cell().map(|id| self.kind(id)) {
            Some(CellKind::Pair { tail, .. }) => tail,
            _ => Value::Nil,
        }
    }

    pub fn second(&self, val: Value) -> Value {
        self.car(self.cdr(val))
    }

    pub fn third(&self, val: Value) -> Value {
        self.car(self.cdr(self.cdr(val)))
    }

    /// Checked head: empty yields empty, an atom is an error.
    pub fn car_val(&self, val: Value) -> LispResult<Value> {
        if !self.is_list(val) {
            return Err(LispError::CantTakeCar);
        }
        Ok(self.car(val))
    }

    /// Checked tail: empty yields empty, an atom is an error.
    pub fn cdr_val(&self, val: Value) -> LispResult<Value> {
        if !self.is_list(val) {
            return Err(LispError::CantTakeCdr);
        }
        Ok(self.cdr(val))
    }

    /// Replace the head of a pair. Other shapes are left untouched.
    pub fn set_car(&mut self, id: CellId, val: Value) {
        if let CellKind::Pair { head, .. } = &mut self.cells[id.0 as usize].kind {
            *head = val;
        }
    }

    /// Replace the tail of a pair. Other shapes are left untouched.
    pub fn set_cdr(&mut self, id: CellId, val: Value) {
        if let CellKind::Pair { tail, .. } = &mut self.cells[id.0 as usize].kind {
            *tail = val;
        }
    }

    /// Build a proper list from a slice of values.
    #[cfg(test)]
    pub fn list(&mut self, values: &[Value]) -> LispResult<Value> {
        let mut result = Value::Nil;
        for &val in values.iter().rev() {
            result = self.cons(val, result)?;
        }
        Ok(result)
    }

    /// Collect the elements of a list into a Vec, ignoring any dotted tail.
    #[cfg(test)]
    pub fn list_to_vec(&self, val: Value) -> Vec<Value> {
        let mut result = Vec::new();
        let mut current = val;
        while self.is_pair(current) {
            result.push(self.car(current));
            current = self.cdr(current);
        }
        result
    }

    /// Number of proper elements before the list ends or turns dotted.
    #[cfg(test)]
    pub fn length(&self, val: Value) -> usize {
        let mut n = 0;
        let mut current = val;
        while self.is_pair(current) {
            n += 1;
            current = self.cdr(current);
        }
        n
    }

    /// Total number of cells in the arena.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells on the free list.
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Number of cells currently handed out.
    pub fn live_count(&self) -> usize {
        self.cells.len() - self.free_count
    }

    // === GC methods ===

    /// Mark everything reachable from `root`. Recurses into heads and walks
    /// tails in a loop, so a long list costs no native stack.
    pub fn mark(&mut self, root: Value) {
        let mut current = root;
        while let Value::Cell(id) = current {
            let cell = &mut self.cells[id.0 as usize];
            if cell.mark {
                return;
            }
            cell.mark = true;
            let kind = cell.kind;
            match kind {
                CellKind::Pair { head, tail } => {
                    self.mark(head);
                    current = tail;
                }
                _ => return,
            }
        }
    }

    /// Rebuild the free list from every unmarked cell and clear the marks of
    /// the survivors. Returns the number of free cells afterwards.
    pub fn sweep(&mut self) -> usize {
        self.free_list = Value::Nil;
        self.free_count = 0;
        for i in (0..self.cells.len()).rev() {
            if self.cells[i].mark {
                self.cells[i].mark = false;
            } else {
                self.release(CellId(i as u32));
            }
        }
        self.free_count
    }

    #[cfg(test)]
    fn is_marked(&self, id: CellId) -> bool {
        self.cells[id.0 as usize].mark
    }
}
