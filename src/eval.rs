use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{LispError, LispResult};
use crate::globals::{self, env_lookup, env_set, find_value, render};
use crate::heap::Heap;
use crate::reader::Reader;
use crate::stream::Console;
use crate::symbol::{self, sym};
use crate::value::Value;

/// The interpreter context.
/// All interpreter state lives here so GC can find roots.
pub struct Machine {
    pub heap: Heap,
    pub console: Console,
    pub config: Config,

    /// The global environment: alist of (symbol . value) pairs, mutated in place.
    pub globe: Value,
    /// Values under construction that no environment reaches yet.
    pub gc_stack: Value,
    /// The T singleton returned by predicates.
    pub tee: Value,

    /// Raised from outside to abandon the current evaluation.
    pub interrupted: Arc<AtomicBool>,
    /// Number of collections run so far.
    pub collections: usize,
}

impl Machine {
    pub fn new(config: Config, mut console: Console) -> LispResult<Self> {
        let mut heap = Heap::new(config.workspace_size);
        let tee = heap.symbol(sym::TEE)?;
        console.echo = config.echo;

        Ok(Machine {
            heap,
            console,
            config,
            globe: Value::Nil,
            gc_stack: Value::Nil,
            tee,
            interrupted: Arc::new(AtomicBool::new(false)),
            collections: 0,
        })
    }

    /// Get the interrupt flag for use with a Ctrl+C handler.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Read one expression from the console.
    pub fn read(&mut self) -> LispResult<Value> {
        Reader::new(&mut self.console, &mut self.heap).read()
    }

    pub(crate) fn truth_of(&self, cond: bool) -> Value {
        if cond {
            self.tee
        } else {
            Value::Nil
        }
    }

    // ========================================================================
    // Garbage collection
    // ========================================================================

    /// Mark from T, the globals, the protection stack and the form and
    /// environment being evaluated, then sweep.
    pub fn gc(&mut self, form: Value, env: Value) {
        let before = self.heap.free_count();
        self.heap.mark(self.tee);
        self.heap.mark(self.globe);
        self.heap.mark(self.gc_stack);
        self.heap.mark(form);
        self.heap.mark(env);
        let free = self.heap.sweep();
        self.collections += 1;
        log::debug!(
            "gc #{}: {} free before, {} free after, {} live",
            self.collections,
            before,
            free,
            self.heap.live_count()
        );
    }

    pub(crate) fn protect(&mut self, val: Value) -> LispResult<()> {
        self.gc_stack = self.heap.cons(val, self.gc_stack)?;
        Ok(())
    }

    pub(crate) fn unprotect(&mut self) {
        self.gc_stack = self.heap.cdr(self.gc_stack);
    }

    // ========================================================================
    // Core evaluation entry point
    // ========================================================================

    /// Evaluate `form` in `env`. The empty environment is the top level.
    pub fn eval(&mut self, form: Value, env: Value) -> LispResult<Value> {
        if self.heap.free_count() < self.config.gc_threshold {
            self.gc(form, env);
        }
        if self.interrupted.swap(false, Ordering::Relaxed) {
            return Err(LispError::Escape);
        }

        if form.is_nil() {
            return Ok(Value::Nil);
        }

        if let Some(name) = self.heap.symbol_id(form) {
            if name == sym::NIL {
                return Ok(Value::Nil);
            }
            let binding = env_lookup(name, env, &self.heap)
                .or_else(|| env_lookup(name, self.globe, &self.heap));
            if let Some(binding) = binding {
                return Ok(self.heap.cdr(binding.into()));
            }
            if symbol::is_builtin(name) {
                return Ok(form);
            }
            return Err(LispError::Undefined(render(form, &self.heap)));
        }

        let function = self.heap.car(form);
        let args = self.heap.cdr(form);

        if let Some(name) = self.heap.symbol_id(function) {
            if name == sym::LAMBDA {
                if env.is_nil() {
                    return Ok(form);
                }
                return Err(LispError::ClosuresNotSupported);
            }
            if symbol::is_special_form(name) {
                if let Some(proc) = symbol::builtin(name).and_then(|b| b.proc) {
                    return proc(self, args, env);
                }
            }
        }

        self.apply(form, env)
    }

    /// General application: evaluate the operator and the arguments, then
    /// dispatch on the operator's shape.
    fn apply(&mut self, form: Value, env: Value) -> LispResult<Value> {
        let fname = self.heap.car(form);
        let op = self.eval(fname, env)?;

        // The argument list is built in place behind this head cell, which
        // stays on the protection stack until the application is over.
        let head = self.heap.alloc_pair(op, Value::Nil)?;
        self.protect(head.into())?;

        let mut tail = head;
        let mut rest = self.heap.cdr(form);
        let mut nargs = 0;
        while self.heap.is_pair(rest) {
            let val = self.eval(self.heap.car(rest), env)?;
            let cell = self.heap.alloc_pair(val, Value::Nil)?;
            self.heap.set_cdr(tail, cell.into());
            tail = cell;
            rest = self.heap.cdr(rest);
            nargs += 1;
        }

        let function = self.heap.car(head.into());
        let args = self.heap.cdr(head.into());

        if let Some(name) = self.heap.symbol_id(function) {
            let Some(builtin) = symbol::builtin(name) else {
                return Err(LispError::NotValidHere(render(fname, &self.heap)));
            };
            if nargs < builtin.min {
                return Err(LispError::TooFewArguments(render(fname, &self.heap)));
            }
            if nargs > builtin.max {
                return Err(LispError::TooManyArguments(render(fname, &self.heap)));
            }
            let Some(proc) = builtin.proc else {
                return Err(LispError::NotValidHere(render(fname, &self.heap)));
            };
            let result = proc(self, args, env)?;
            self.unprotect();
            return Ok(result);
        }

        if self.heap.is_list(function) && self.heap.is_named(self.heap.car(function), sym::LAMBDA) {
            let frame = globals::push_frame(env, &mut self.heap)?;
            let local = self.closure(fname, self.heap.cdr(function), args, frame)?;
            // Nested calls only see their own environment, so this one is
            // kept reachable until the body is done with it.
            self.protect(local)?;
            let body = self.heap.cdr(self.heap.cdr(function));
            let last = self.progn(body, local)?;
            let result = self.eval(last, local)?;
            self.unprotect();
            self.unprotect();
            return Ok(result);
        }

        Err(LispError::IllegalFunction(render(fname, &self.heap)))
    }

    // ========================================================================
    // User functions
    // ========================================================================

    /// Bind each parameter to its argument on top of `env` and return the
    /// extended environment.
    fn closure(
        &mut self,
        fname: Value,
        function: Value,
        args: Value,
        env: Value,
    ) -> LispResult<Value> {
        let mut params = self.heap.car(function);
        let mut args = args;
        let mut env = env;

        log::trace!(
            "apply {} to {}",
            render(fname, &self.heap),
            render(args, &self.heap)
        );

        while self.heap.is_pair(params) && self.heap.is_pair(args) {
            let var = self.heap.car(params);
            let val = self.heap.car(args);
            env = globals::bind(var, val, env, &mut self.heap)?;
            params = self.heap.cdr(params);
            args = self.heap.cdr(args);
        }
        if !params.is_nil() {
            return Err(LispError::TooFewParameters(render(fname, &self.heap)));
        }
        if !args.is_nil() {
            return Err(LispError::TooManyParameters(render(fname, &self.heap)));
        }
        Ok(env)
    }

    /// Evaluate every form but the last; return the last unevaluated.
    fn progn(&mut self, body: Value, env: Value) -> LispResult<Value> {
        let mut current = body;
        while self.heap.is_pair(self.heap.cdr(current)) {
            self.eval(self.heap.car(current), env)?;
            current = self.heap.cdr(current);
        }
        Ok(self.heap.car(current))
    }

    // ========================================================================
    // Special forms
    // ========================================================================

    /// (QUOTE x)
    pub(crate) fn sp_quote(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        Ok(self.heap.car(args))
    }

    /// (DEFUN name params . body): binds name to (LAMBDA params . body).
    pub(crate) fn sp_defun(&mut self, args: Value, _env: Value) -> LispResult<Value> {
        let var = self.heap.car(args);
        if !self.heap.is_symbol(var) {
            return Err(LispError::NotASymbol(render(var, &self.heap)));
        }
        let lambda = self.heap.symbol(sym::LAMBDA)?;
        let val = self.heap.cons(lambda, self.heap.cdr(args))?;
        env_set(var, val, &mut self.globe, &mut self.heap)?;
        Ok(var)
    }

    /// (DEFVAR name expr)
    pub(crate) fn sp_defvar(&mut self, args: Value, env: Value) -> LispResult<Value> {
        let var = self.heap.car(args);
        if !self.heap.is_symbol(var) {
            return Err(LispError::NotASymbol(render(var, &self.heap)));
        }
        let val = self.eval(self.heap.second(args), env)?;
        env_set(var, val, &mut self.globe, &mut self.heap)?;
        Ok(var)
    }

    /// (SETQ name expr): only updates an existing binding.
    pub(crate) fn sp_setq(&mut self, args: Value, env: Value) -> LispResult<Value> {
        let val = self.eval(self.heap.second(args), env)?;
        let binding = find_value(self.heap.car(args), env, self.globe, &self.heap)?;
        self.heap.set_cdr(binding, val);
        Ok(val)
    }

    /// (IF test then [else])
    pub(crate) fn sp_if(&mut self, args: Value, env: Value) -> LispResult<Value> {
        if !self.eval(self.heap.car(args), env)?.is_nil() {
            return self.eval(self.heap.second(args), env);
        }
        self.eval(self.heap.third(args), env)
    }
}
