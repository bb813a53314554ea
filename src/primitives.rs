use crate::error::LispResult;
use crate::eval::Machine;
use crate::value::Value;

// Builtin functions. Each receives its evaluated argument list, already
// checked against the arity in the builtin table, and the caller's
// environment.
impl Machine {
    fn first(&self, args: Value) -> Value {
        self.heap.car(args)
    }

    fn second(&self, args: Value) -> Value {
        self.heap.second(args)
    }

    /// (NOT x) / (NULL x): T iff x is empty.
    pub(crate) fn fn_not(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        Ok(self.truth_of(self.first(args).is_nil()))
    }

    /// (CONS a b): create a new pair.
    pub(crate) fn fn_cons(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        let (a, b) = (self.first(args), self.second(args));
        self.heap.cons(a, b)
    }

    /// (ATOM x): empty or a symbol.
    pub(crate) fn fn_atom(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        Ok(self.truth_of(self.heap.is_atom(self.first(args))))
    }

    /// (LISTP x): empty or a pair.
    pub(crate) fn fn_listp(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        Ok(self.truth_of(self.heap.is_list(self.first(args))))
    }

    /// (CONSP x): a pair.
    pub(crate) fn fn_consp(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        Ok(self.truth_of(self.heap.is_pair(self.first(args))))
    }

    /// (SYMBOLP x): a symbol atom. The empty value is not one.
    pub(crate) fn fn_symbolp(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        Ok(self.truth_of(self.heap.is_symbol(self.first(args))))
    }

    /// (EQ a b): identity for pairs, id equality for symbols.
    pub(crate) fn fn_eq(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        let (a, b) = (self.first(args), self.second(args));
        let same_object = a == b;
        let same_symbol = match (self.heap.symbol_id(a), self.heap.symbol_id(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        };
        Ok(self.truth_of(same_object || same_symbol))
    }

    /// (CAR x): head of a pair, empty of empty.
    pub(crate) fn fn_car(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        self.heap.car_val(self.first(args))
    }

    /// (CDR x): tail of a pair, empty of empty.
    pub(crate) fn fn_cdr(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        self.heap.cdr_val(self.first(args))
    }

    /// (EVAL x): evaluate x again in the caller's environment.
    pub(crate) fn fn_eval(&mut self, args: Value, env: Value) -> LispResult<Value> {
        let form = self.first(args);
        self.eval(form, env)
    }

    /// (GLOBALS): the global environment itself.
    pub(crate) fn fn_globals(&mut self, _args: Value, _env: Value) -> LispResult<Value> {
        Ok(self.globe)
    }

    /// (LOCALS): the caller's environment itself.
    pub(crate) fn fn_locals(&mut self, _args: Value, env: Value) -> LispResult<Value> {
        Ok(env)
    }
}
