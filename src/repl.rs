use crate::config::BANNER;
use crate::error::{LispError, LispResult};
use crate::eval::Machine;
use crate::printer::print_val;
use crate::stream::Console;
use crate::value::Value;

/// Print the banner and run read-eval-print cycles until the input ends.
///
/// A fault abandons the whole loop: the diagnostic is printed, the
/// protection stack is dropped and the loop starts over from its first
/// step. Only the global environment carries across.
pub fn run(machine: &mut Machine) -> LispResult<()> {
    if machine.config.banner {
        machine.console.put_str(BANNER)?;
        machine.console.newline()?;
    }

    loop {
        match cycles(machine) {
            Ok(()) | Err(LispError::EndOfInput) => break,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                report(machine, &e)?;
                log::debug!("restarting after fault: {}", e);
            }
        }
    }

    machine.console.fresh_line()?;
    machine.console.flush()
}

fn cycles(machine: &mut Machine) -> LispResult<()> {
    loop {
        cycle(machine)?;
    }
}

/// One read-eval-print step at the top level.
fn cycle(machine: &mut Machine) -> LispResult<()> {
    machine.gc(Value::Nil, Value::Nil);
    if machine.config.show_freespace {
        let free = machine.heap.free_count().to_string();
        machine.console.put_str(&free)?;
    }
    machine.console.put_str("> ")?;

    let line = machine.read()?;
    machine.protect(line)?;
    machine.console.fresh_line()?;
    let result = machine.eval(line, Value::Nil)?;
    machine.console.fresh_line()?;
    let text = print_val(result, &machine.heap)?;
    machine.console.put_str(&text)?;
    machine.unprotect();
    machine.console.fresh_line()?;
    machine.console.newline()
}

/// Write a one-line diagnostic and abandon everything the failed
/// evaluation was protecting.
pub fn report(machine: &mut Machine, err: &LispError) -> LispResult<()> {
    machine.gc_stack = Value::Nil;
    machine.console.fresh_line()?;
    machine.console.put_str("ERROR: ")?;
    machine.console.put_str(&err.to_string())?;
    machine.console.newline()
}

/// Evaluate every form the console yields, silently, collecting between
/// forms. Returns the number of forms evaluated.
fn eval_all(machine: &mut Machine) -> LispResult<usize> {
    let mut count = 0;
    loop {
        machine.gc(Value::Nil, Value::Nil);
        let form = match machine.read() {
            Ok(form) => form,
            Err(LispError::EndOfInput) => return Ok(count),
            Err(e) => return Err(e),
        };
        machine.protect(form)?;
        machine.eval(form, Value::Nil)?;
        machine.unprotect();
        count += 1;
    }
}

/// Run `f` with `console` swapped in, restoring the original afterwards.
fn with_console<T>(
    machine: &mut Machine,
    console: Console,
    f: impl FnOnce(&mut Machine) -> LispResult<T>,
) -> LispResult<T> {
    let saved = std::mem::replace(&mut machine.console, console);
    let result = f(machine);
    machine.console = saved;
    if result.is_err() {
        machine.gc_stack = Value::Nil;
    }
    result
}

/// Load a source file: evaluate each of its forms at the top level.
pub fn load_file(machine: &mut Machine, path: &str) -> LispResult<usize> {
    let console = Console::open_file(path)?;
    let count = with_console(machine, console, eval_all)?;
    log::info!("loaded {} forms from {}", count, path);
    Ok(count)
}

/// Evaluate every form in `text` and return the printed value of the last.
pub fn eval_str(machine: &mut Machine, text: &str) -> LispResult<String> {
    with_console(machine, Console::from_text(text), |m| {
        let mut last = Value::Nil;
        loop {
            m.gc(last, Value::Nil);
            let form = match m.read() {
                Ok(form) => form,
                Err(LispError::EndOfInput) => break,
                Err(e) => return Err(e),
            };
            m.protect(form)?;
            last = m.eval(form, Value::Nil)?;
            m.unprotect();
        }
        print_val(last, &m.heap)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn machine() -> Machine {
        Machine::new(Config::default().quiet(), Console::from_text("")).unwrap()
    }

    #[test]
    fn eval_str_returns_last_value() {
        let mut m = machine();
        assert_eq!(eval_str(&mut m, "(DEFVAR X 'A) X").unwrap(), "A");
    }

    #[test]
    fn eval_str_restores_the_console() {
        let mut m = machine();
        m.console.put_str("kept").unwrap();
        eval_str(&mut m, "'Q").unwrap();
        assert_eq!(m.console.output(), "kept");
    }

    #[test]
    fn failed_load_drops_protection() {
        let mut m = machine();
        assert!(eval_str(&mut m, "(CONS 'A (CAR 'B))").is_err());
        assert!(m.gc_stack.is_nil());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut m = machine();
        assert!(matches!(
            load_file(&mut m, "/nonexistent/ulisp/source.lsp"),
            Err(LispError::Io(_))
        ));
    }

    #[test]
    fn report_formats_a_diagnostic_line() {
        let mut m = machine();
        m.console.put_str("1000> ").unwrap();
        report(&mut m, &LispError::Undefined("ZZ".into())).unwrap();
        assert_eq!(m.console.output(), "1000> \nERROR: 'ZZ' UNDEFINED\n");
    }
}
