use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::printer::print_val;
use crate::value::{CellId, SymbolId, Value};

/// Look up a binding in an environment (association list).
/// Frame markers (empty entries) are skipped. Returns the (name . value)
/// pair if found.
pub fn env_lookup(name: SymbolId, env: Value, heap: &Heap) -> Option<CellId> {
    let mut current = env;
    while heap.is_pair(current) {
        let binding = heap.car(current);
        if heap.symbol_id(heap.car(binding)) == Some(name) {
            return binding.as_cell();
        }
        current = heap.cdr(current);
    }
    None
}

/// Open a new frame on top of `env`.
pub fn push_frame(env: Value, heap: &mut Heap) -> LispResult<Value> {
    heap.cons(Value::Nil, env)
}

/// Prepend a (var . val) binding to `env`.
pub fn bind(var: Value, val: Value, env: Value, heap: &mut Heap) -> LispResult<Value> {
    let binding = heap.cons(var, val)?;
    heap.cons(binding, env)
}

/// Set or add a binding in the global environment.
/// If the name already exists, mutate its value. Otherwise prepend.
pub fn env_set(var: Value, val: Value, globe: &mut Value, heap: &mut Heap) -> LispResult<()> {
    let name = heap
        .symbol_id(var)
        .ok_or_else(|| LispError::NotASymbol(render(var, heap)))?;
    match env_lookup(name, *globe, heap) {
        Some(binding) => heap.set_cdr(binding, val),
        None => *globe = bind(var, val, *globe, heap)?,
    }
    Ok(())
}

/// The existing binding for `var`: innermost local first, then global.
pub fn find_value(var: Value, env: Value, globe: Value, heap: &Heap) -> LispResult<CellId> {
    let name = heap
        .symbol_id(var)
        .ok_or_else(|| LispError::NotASymbol(render(var, heap)))?;
    env_lookup(name, env, heap)
        .or_else(|| env_lookup(name, globe, heap))
        .ok_or_else(|| LispError::UnknownVariable(render(var, heap)))
}

/// Printed form for a diagnostic; empty for the empty value.
pub fn render(val: Value, heap: &Heap) -> String {
    if val.is_nil() {
        return String::new();
    }
    print_val(val, heap).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::pack;

    fn named(heap: &mut Heap, text: &str) -> Value {
        heap.symbol(pack(text).unwrap()).unwrap()
    }

    #[test]
    fn nearest_binding_wins() {
        let mut heap = Heap::new(64);
        let x = named(&mut heap, "X");
        let a = named(&mut heap, "A");
        let b = named(&mut heap, "B");
        let env = bind(x, a, Value::Nil, &mut heap).unwrap();
        let env = push_frame(env, &mut heap).unwrap();
        let env = bind(x, b, env, &mut heap).unwrap();

        let found = env_lookup(pack("X").unwrap(), env, &heap).unwrap();
        assert_eq!(heap.cdr(Value::Cell(found)), b);
        assert!(env_lookup(pack("Y").unwrap(), env, &heap).is_none());
    }

    #[test]
    fn env_set_replaces_in_place() {
        let mut heap = Heap::new(64);
        let x = named(&mut heap, "X");
        let a = named(&mut heap, "A");
        let b = named(&mut heap, "B");
        let mut globe = Value::Nil;
        env_set(x, a, &mut globe, &mut heap).unwrap();
        let first = globe;
        env_set(x, b, &mut globe, &mut heap).unwrap();

        assert_eq!(globe, first);
        assert_eq!(heap.length(globe), 1);
        let binding = env_lookup(pack("X").unwrap(), globe, &heap).unwrap();
        assert_eq!(heap.cdr(Value::Cell(binding)), b);
    }

    #[test]
    fn env_set_rejects_non_symbols() {
        let mut heap = Heap::new(64);
        let a = named(&mut heap, "A");
        let pair = heap.cons(a, a).unwrap();
        let mut globe = Value::Nil;
        assert_eq!(
            env_set(pair, a, &mut globe, &mut heap),
            Err(LispError::NotASymbol("(A . A)".into()))
        );
    }

    #[test]
    fn find_value_falls_back_to_globals() {
        let mut heap = Heap::new(64);
        let x = named(&mut heap, "X");
        let y = named(&mut heap, "Y");
        let a = named(&mut heap, "A");
        let mut globe = Value::Nil;
        env_set(x, a, &mut globe, &mut heap).unwrap();
        let local = push_frame(Value::Nil, &mut heap).unwrap();

        assert!(find_value(x, local, globe, &heap).is_ok());
        assert_eq!(
            find_value(y, local, globe, &heap),
            Err(LispError::UnknownVariable("Y".into()))
        );
    }
}
