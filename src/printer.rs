use crate::error::{LispError, LispResult};
use crate::heap::{CellKind, Heap};
use crate::symbol;
use crate::value::Value;

/// Render a value the way the reader would accept it back.
pub fn print_val(val: Value, heap: &Heap) -> LispResult<String> {
    let mut out = String::new();
    print_inner(val, heap, &mut out)?;
    Ok(out)
}

/// The printed name of a symbol atom.
pub fn name_of(val: Value, heap: &Heap) -> LispResult<String> {
    heap.symbol_id(val).map(symbol::name).ok_or(LispError::NameError)
}

fn print_inner(val: Value, heap: &Heap, out: &mut String) -> LispResult<()> {
    let Value::Cell(id) = val else {
        out.push_str("NIL");
        return Ok(());
    };

    match heap.kind(id) {
        CellKind::Symbol(_) => out.push_str(&name_of(val, heap)?),
        CellKind::Pair { head, tail } => {
            out.push('(');
            print_inner(head, heap, out)?;

            let mut current = tail;
            while heap.is_pair(current) {
                out.push(' ');
                print_inner(heap.car(current), heap, out)?;
                current = heap.cdr(current);
            }
            if !current.is_nil() {
                out.push_str(" . ");
                print_inner(current, heap, out)?;
            }
            out.push(')');
        }
        CellKind::Free { .. } => return Err(LispError::PrintError),
    }
    Ok(())
}
