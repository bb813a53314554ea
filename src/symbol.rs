use crate::error::LispResult;
use crate::eval::Machine;
use crate::value::{SymbolId, Value};

/// Native implementation of a builtin: receives the argument list (evaluated
/// for functions, raw for special forms) and the caller's environment.
pub type NativeFn = fn(&mut Machine, Value, Value) -> LispResult<Value>;

/// One row of the builtin table. The row index is the symbol id.
pub struct Builtin {
    pub name: &'static str,
    /// None for keywords and range markers, which are never invoked.
    pub proc: Option<NativeFn>,
    pub min: usize,
    pub max: usize,
}

/// Builtin symbol ids. These must match the row order of `BUILTINS`.
pub mod sym {
    use crate::value::SymbolId;

    pub const SYMBOLS: SymbolId = SymbolId(0);
    pub const NIL: SymbolId = SymbolId(1);
    pub const TEE: SymbolId = SymbolId(2);
    pub const LAMBDA: SymbolId = SymbolId(3);
    pub const SPECIAL_FORMS: SymbolId = SymbolId(4);
    pub const QUOTE: SymbolId = SymbolId(5);
    pub const DEFUN: SymbolId = SymbolId(6);
    pub const DEFVAR: SymbolId = SymbolId(7);
    pub const SETQ: SymbolId = SymbolId(8);
    pub const IF: SymbolId = SymbolId(9);
    pub const FUNCTIONS: SymbolId = SymbolId(10);
    pub const NOT: SymbolId = SymbolId(11);
    pub const NULL: SymbolId = SymbolId(12);
    pub const CONS: SymbolId = SymbolId(13);
    pub const ATOM: SymbolId = SymbolId(14);
    pub const LISTP: SymbolId = SymbolId(15);
    pub const CONSP: SymbolId = SymbolId(16);
    pub const SYMBOLP: SymbolId = SymbolId(17);
    pub const EQ: SymbolId = SymbolId(18);
    pub const CAR: SymbolId = SymbolId(19);
    pub const CDR: SymbolId = SymbolId(20);
    pub const EVAL: SymbolId = SymbolId(21);
    pub const GLOBALS: SymbolId = SymbolId(22);
    pub const LOCALS: SymbolId = SymbolId(23);
    pub const ENDFUNCTIONS: SymbolId = SymbolId(24);
}

const fn keyword(name: &'static str, min: usize, max: usize) -> Builtin {
    Builtin {
        name,
        proc: None,
        min,
        max,
    }
}

const fn native(name: &'static str, proc: NativeFn, min: usize, max: usize) -> Builtin {
    Builtin {
        name,
        proc: Some(proc),
        min,
        max,
    }
}

/// The static builtin table, indexed by symbol id.
pub static BUILTINS: [Builtin; sym::ENDFUNCTIONS.0 as usize] = [
    keyword("SYMBOLS", 1, 1),
    keyword("NIL", 0, 0),
    keyword("T", 1, 0),
    keyword("LAMBDA", 0, 127),
    keyword("SPECIAL_FORMS", 1, 1),
    native("QUOTE", Machine::sp_quote, 1, 1),
    native("DEFUN", Machine::sp_defun, 0, 127),
    native("DEFVAR", Machine::sp_defvar, 2, 2),
    native("SETQ", Machine::sp_setq, 2, 2),
    native("IF", Machine::sp_if, 2, 3),
    keyword("FUNCTIONS", 1, 1),
    native("NOT", Machine::fn_not, 1, 1),
    native("NULL", Machine::fn_not, 1, 1),
    native("CONS", Machine::fn_cons, 2, 2),
    native("ATOM", Machine::fn_atom, 1, 1),
    native("LISTP", Machine::fn_listp, 1, 1),
    native("CONSP", Machine::fn_consp, 1, 1),
    native("SYMBOLP", Machine::fn_symbolp, 1, 1),
    native("EQ", Machine::fn_eq, 2, 2),
    native("CAR", Machine::fn_car, 1, 1),
    native("CDR", Machine::fn_cdr, 1, 1),
    native("EVAL", Machine::fn_eval, 1, 1),
    native("GLOBALS", Machine::fn_globals, 0, 0),
    native("LOCALS", Machine::fn_locals, 0, 0),
];

/// Smallest id a packed identifier can have: a single `A`.
pub const FIRST_PACKED: u32 = 40 * 40;

/// Longest identifier that fits in a packed id.
pub const MAX_PACKED_LEN: usize = 3;

/// The builtin row for `id`, if it is in the builtin range.
pub fn builtin(id: SymbolId) -> Option<&'static Builtin> {
    BUILTINS.get(id.0 as usize)
}

pub fn is_builtin(id: SymbolId) -> bool {
    id < sym::ENDFUNCTIONS
}

/// Ids strictly between the special-forms and functions markers.
pub fn is_special_form(id: SymbolId) -> bool {
    id > sym::SPECIAL_FORMS && id < sym::FUNCTIONS
}

/// Linear, case-sensitive scan of the builtin table.
pub fn resolve_builtin(text: &str) -> Option<SymbolId> {
    BUILTINS
        .iter()
        .position(|b| b.name == text)
        .map(|i| SymbolId(i as u32))
}

fn to_radix40(ch: u8) -> Option<u32> {
    match ch {
        b'A'..=b'Z' => Some((ch - b'A') as u32 + 1),
        b'0'..=b'9' => Some((ch - b'0') as u32 + 30),
        _ => None,
    }
}

fn from_radix40(n: u32) -> Option<char> {
    match n {
        1..=26 => Some((b'A' + (n - 1) as u8) as char),
        30..=39 => Some((b'0' + (n - 30) as u8) as char),
        _ => None,
    }
}

/// Pack an identifier of one to three characters from `A-Z0-9` into a
/// radix-40 id. Missing trailing characters count as digit 0.
pub fn pack(text: &str) -> Option<SymbolId> {
    let bytes = text.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_PACKED_LEN {
        return None;
    }
    let mut id = 0;
    for i in 0..MAX_PACKED_LEN {
        let digit = match bytes.get(i) {
            Some(&ch) => to_radix40(ch)?,
            None => 0,
        };
        id = id * 40 + digit;
    }
    Some(SymbolId(id))
}

/// Exact inverse of `pack` for ids in the packed range.
pub fn unpack(id: SymbolId) -> String {
    let mut x = id.0;
    let mut digits = [0u32; MAX_PACKED_LEN];
    for slot in digits.iter_mut().rev() {
        *slot = x % 40;
        x /= 40;
    }
    digits.iter().filter_map(|&d| from_radix40(d)).collect()
}

/// Printable name of a symbol id.
pub fn name(id: SymbolId) -> String {
    match builtin(id) {
        Some(b) => b.name.to_string(),
        None => unpack(id),
    }
}

/// Classify a token: builtin name first, then radix-40 packing.
pub fn intern(text: &str) -> Option<SymbolId> {
    resolve_builtin(text).or_else(|| pack(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    #[test]
    fn table_rows_match_constants() {
        assert_eq!(BUILTINS.len(), sym::ENDFUNCTIONS.0 as usize);
        assert_eq!(BUILTINS[sym::QUOTE.0 as usize].name, "QUOTE");
        assert_eq!(BUILTINS[sym::LOCALS.0 as usize].name, "LOCALS");
        assert_eq!(resolve_builtin("CAR"), Some(sym::CAR));
        assert_eq!(resolve_builtin("NULL"), Some(sym::NULL));
    }

    #[test]
    fn builtin_lookup_is_case_sensitive() {
        assert_eq!(resolve_builtin("car"), None);
        assert_eq!(resolve_builtin("Car"), None);
    }

    #[test]
    fn keywords_have_no_procedure() {
        for id in [sym::SYMBOLS, sym::NIL, sym::TEE, sym::LAMBDA, sym::SPECIAL_FORMS, sym::FUNCTIONS] {
            assert!(builtin(id).unwrap().proc.is_none());
        }
        assert!(builtin(sym::CONS).unwrap().proc.is_some());
    }

    #[test]
    fn special_form_range() {
        for id in [sym::QUOTE, sym::DEFUN, sym::DEFVAR, sym::SETQ, sym::IF] {
            assert!(is_special_form(id));
        }
        assert!(!is_special_form(sym::SPECIAL_FORMS));
        assert!(!is_special_form(sym::FUNCTIONS));
        assert!(!is_special_form(sym::CAR));
        assert!(!is_special_form(sym::LAMBDA));
    }

    #[test]
    fn pack_known_values() {
        assert_eq!(pack("A"), Some(SymbolId(1600)));
        assert_eq!(pack("AB"), Some(SymbolId(1600 + 80)));
        assert_eq!(pack("999"), Some(SymbolId(39 * 1600 + 39 * 40 + 39)));
        assert_eq!(pack("0"), Some(SymbolId(30 * 1600)));
    }

    #[test]
    fn pack_rejects_bad_identifiers() {
        assert_eq!(pack(""), None);
        assert_eq!(pack("ABCD"), None);
        assert_eq!(pack("a"), None);
        assert_eq!(pack("A-B"), None);
        assert_eq!(pack("X*"), None);
    }

    #[test]
    fn every_short_identifier_round_trips() {
        let mut names = Vec::new();
        for &a in ALPHABET {
            names.push(vec![a]);
            for &b in ALPHABET {
                names.push(vec![a, b]);
                for &c in ALPHABET {
                    names.push(vec![a, b, c]);
                }
            }
        }
        for bytes in names {
            let text = std::str::from_utf8(&bytes).unwrap();
            let id = pack(text).unwrap();
            assert!(id.0 >= FIRST_PACKED, "{} packed below the user range", text);
            assert!(!is_builtin(id));
            assert_eq!(unpack(id), text);
        }
    }

    #[test]
    fn builtin_names_win_over_packing() {
        assert_eq!(intern("EQ"), Some(sym::EQ));
        assert_eq!(intern("IF"), Some(sym::IF));
        assert_eq!(intern("T"), Some(sym::TEE));
        assert_eq!(intern("FOO"), pack("FOO"));
        assert_eq!(intern("GLOBAL"), None);
    }

    #[test]
    fn names_decode_both_ranges() {
        assert_eq!(name(sym::DEFUN), "DEFUN");
        assert_eq!(name(pack("X1").unwrap()), "X1");
    }
}
