use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::stream::Console;
use crate::symbol::{self, sym};
use crate::value::Value;

/// Token buffer capacity; one slot is reserved, so tokens stop at 17 characters.
pub const BUFFER_SIZE: usize = 18;

/// What the tokenizer hands to the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    Open,
    Close,
    Quote,
    Dot,
    Atom(Value),
}

fn is_space(ch: u8) -> bool {
    ch == b' ' || ch == b'\t' || ch == b'\n' || ch == b'\r'
}

/// Recursive-descent reader pulling characters from the console.
pub struct Reader<'a> {
    console: &'a mut Console,
    heap: &'a mut Heap,
}

impl<'a> Reader<'a> {
    pub fn new(console: &'a mut Console, heap: &'a mut Heap) -> Self {
        Reader { console, heap }
    }

    /// Read one expression.
    pub fn read(&mut self) -> LispResult<Value> {
        match self.next_item()? {
            Item::Open => self.read_rest(),
            // A stray dot outside a list is ignored.
            Item::Dot => self.read(),
            Item::Quote => {
                let quoted = self.read()?;
                self.make_quoted(quoted)
            }
            Item::Close => Err(LispError::UnmatchedRightBracket),
            Item::Atom(val) => Ok(val),
        }
    }

    /// Read the remainder of a list whose `(` has been consumed.
    fn read_rest(&mut self) -> LispResult<Value> {
        let mut elements = Vec::new();
        let mut dot_tail = Value::Nil;

        loop {
            match self.next_item()? {
                Item::Close => break,
                Item::Dot => {
                    dot_tail = self.read()?;
                    if !self.read_rest()?.is_nil() {
                        return Err(LispError::MalformedList);
                    }
                    break;
                }
                Item::Quote => {
                    let quoted = self.read()?;
                    elements.push(self.make_quoted(quoted)?);
                }
                Item::Open => elements.push(self.read_rest()?),
                Item::Atom(val) => elements.push(val),
            }
        }

        let mut result = dot_tail;
        for val in elements.into_iter().rev() {
            result = self.heap.cons(val, result)?;
        }
        Ok(result)
    }

    /// Make (QUOTE val)
    fn make_quoted(&mut self, val: Value) -> LispResult<Value> {
        let quote = self.heap.symbol(sym::QUOTE)?;
        let inner = self.heap.cons(val, Value::Nil)?;
        self.heap.cons(quote, inner)
    }

    fn next_item(&mut self) -> LispResult<Item> {
        let mut ch = self.console.get_char()?;
        while is_space(ch) {
            ch = self.console.get_char()?;
        }

        // A comment runs up to the next open bracket, which starts the item.
        if ch == b';' {
            while ch != b'(' {
                ch = self.console.get_char()?;
            }
        }

        match ch {
            b')' => return Ok(Item::Close),
            b'(' => return Ok(Item::Open),
            b'\'' => return Ok(Item::Quote),
            b'.' => return Ok(Item::Dot),
            _ => {}
        }

        let mut buffer = Vec::with_capacity(BUFFER_SIZE);
        let mut next = Some(ch);
        while let Some(c) = next {
            if is_space(c) || c == b'(' || c == b')' || buffer.len() >= BUFFER_SIZE - 1 {
                break;
            }
            buffer.push(c);
            next = match self.console.get_char() {
                Ok(c) => Some(c),
                Err(LispError::EndOfInput) => None,
                Err(e) => return Err(e),
            };
        }
        if let Some(c @ (b'(' | b')')) = next {
            self.console.unget(c);
        }

        self.classify(&buffer)
    }

    fn classify(&mut self, buffer: &[u8]) -> LispResult<Item> {
        let text = std::str::from_utf8(buffer).map_err(|_| LispError::IllegalSymbol)?;
        match symbol::intern(text) {
            Some(sym::NIL) => Ok(Item::Atom(Value::Nil)),
            Some(id) => Ok(Item::Atom(self.heap.symbol(id)?)),
            None => Err(LispError::IllegalSymbol),
        }
    }
}

/// Read a single expression from a string.
#[cfg(test)]
pub fn read_str(input: &str, heap: &mut Heap) -> LispResult<Value> {
    let mut console = Console::from_text(input);
    Reader::new(&mut console, heap).read()
}
