use std::fmt;

/// Faults raised anywhere in the interpreter.
///
/// Variants that name an offending form carry it already rendered, since
/// rendering needs the heap and the error outlives the evaluation that
/// produced it. An empty string stands for the empty form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LispError {
    /// The arena is exhausted even after a full collection.
    NoRoom,

    /// The escape flag was raised while evaluating.
    Escape,

    /// Symbol has no binding and is not a builtin name.
    Undefined(String),

    /// Definition or assignment target is not a symbol.
    NotASymbol(String),

    /// Builtin called with fewer arguments than its declared minimum.
    TooFewArguments(String),

    /// Builtin called with more arguments than its declared maximum.
    TooManyArguments(String),

    /// User function has parameters left over after binding.
    TooFewParameters(String),

    /// User function received more arguments than it has parameters.
    TooManyParameters(String),

    /// Operator evaluated to a symbol that cannot be applied.
    NotValidHere(String),

    /// Operator is neither a builtin nor a lambda-shaped pair.
    IllegalFunction(String),

    /// A lambda expression was evaluated inside a function body.
    ClosuresNotSupported,

    /// SETQ target has no binding anywhere.
    UnknownVariable(String),

    /// Something followed the tail of a dotted pair.
    MalformedList,

    /// Token is neither a builtin name nor a packable identifier.
    IllegalSymbol,

    /// `)` read where an expression was expected.
    UnmatchedRightBracket,

    CantTakeCar,
    CantTakeCdr,

    /// Value of unrecognized shape reached the printer.
    PrintError,

    /// Name requested for a value that is not a symbol.
    NameError,

    /// The input source has no more characters.
    EndOfInput,

    /// Console I/O failure.
    Io(String),
}

impl LispError {
    /// True for the conditions that end the session rather than restart the loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LispError::EndOfInput | LispError::Io(_))
    }
}

fn named(f: &mut fmt::Formatter<'_>, form: &str, msg: &str) -> fmt::Result {
    if form.is_empty() {
        write!(f, "FUNCTION {}", msg)
    } else {
        write!(f, "'{}' {}", form, msg)
    }
}

impl fmt::Display for LispError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LispError::NoRoom => write!(f, "NO ROOM"),
            LispError::Escape => write!(f, "ESCAPE!"),
            LispError::Undefined(name) => named(f, name, "UNDEFINED"),
            LispError::NotASymbol(form) => named(f, form, "IS NOT A SYMBOL"),
            LispError::TooFewArguments(form) => named(f, form, "HAS TOO FEW ARGUMENTS"),
            LispError::TooManyArguments(form) => named(f, form, "HAS TOO MANY ARGUMENTS"),
            LispError::TooFewParameters(form) => named(f, form, "HAS TOO FEW PARAMETERS"),
            LispError::TooManyParameters(form) => named(f, form, "HAS TOO MANY PARAMETERS"),
            LispError::NotValidHere(form) => named(f, form, "IS NOT VALID HERE"),
            LispError::IllegalFunction(form) => named(f, form, "IS AN ILLEGAL FUNCTION"),
            LispError::ClosuresNotSupported => write!(f, "CLOSURES NOT SUPPORTED"),
            LispError::UnknownVariable(name) => named(f, name, "UNKNOWN VARIABLE"),
            LispError::MalformedList => write!(f, "MALFORMED LIST"),
            LispError::IllegalSymbol => write!(f, "ILLEGAL SYMBOL"),
            LispError::UnmatchedRightBracket => write!(f, "UNMATCHED RIGHT BRACKET"),
            LispError::CantTakeCar => write!(f, "CAN'T TAKE CAR"),
            LispError::CantTakeCdr => write!(f, "CAN'T TAKE CDR"),
            LispError::PrintError => write!(f, "ERROR IN PRINT."),
            LispError::NameError => write!(f, "ERROR IN NAME"),
            LispError::EndOfInput => write!(f, "end of input"),
            LispError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for LispError {}

pub type LispResult<T> = Result<T, LispError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_diagnostics_quote_the_form() {
        assert_eq!(
            LispError::TooFewParameters("F".into()).to_string(),
            "'F' HAS TOO FEW PARAMETERS"
        );
        assert_eq!(LispError::Undefined("XY".into()).to_string(), "'XY' UNDEFINED");
    }

    #[test]
    fn empty_form_is_reported_as_function() {
        assert_eq!(
            LispError::IllegalFunction(String::new()).to_string(),
            "FUNCTION IS AN ILLEGAL FUNCTION"
        );
    }

    #[test]
    fn only_host_conditions_are_fatal() {
        assert!(LispError::EndOfInput.is_fatal());
        assert!(LispError::Io("broken pipe".into()).is_fatal());
        assert!(!LispError::NoRoom.is_fatal());
        assert!(!LispError::Escape.is_fatal());
    }
}
