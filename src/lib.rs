pub mod config;
pub mod error;
pub mod eval;
pub mod globals;
pub mod heap;
pub mod primitives;
pub mod printer;
pub mod reader;
pub mod repl;
pub mod stream;
pub mod symbol;
pub mod value;
