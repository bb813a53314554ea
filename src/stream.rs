use std::fs::File;
use std::io::{self, BufReader, Read, Write};

use crate::error::{LispError, LispResult};

/// Where input characters come from.
pub enum Source {
    Stdin,
    File(BufReader<File>),
    /// In-memory text, used for loading and for tests.
    Text { bytes: Vec<u8>, pos: usize },
}

/// Where output characters go.
pub enum Sink {
    Stdout(io::Stdout),
    /// Captured output, used for tests.
    Buffer(Vec<u8>),
}

const NEWLINE: u8 = b'\n';

/// The character I/O boundary: one blocking input primitive with a single
/// character of pushback, and one output primitive that remembers the last
/// character written so a fresh line can be started on demand.
pub struct Console {
    source: Source,
    sink: Sink,
    last_char: Option<u8>,
    last_print: u8,
    /// Copy every consumed input character (except CR) to the sink.
    pub echo: bool,
}

impl Console {
    pub fn new(source: Source, sink: Sink) -> Self {
        Console {
            source,
            sink,
            last_char: None,
            last_print: NEWLINE,
            echo: false,
        }
    }

    /// Standard input and output.
    pub fn stdio() -> Self {
        Console::new(Source::Stdin, Sink::Stdout(io::stdout()))
    }

    /// Read from a file, write to standard output.
    pub fn open_file(path: &str) -> LispResult<Self> {
        let file = File::open(path)
            .map_err(|e| LispError::Io(format!("cannot open '{}': {}", path, e)))?;
        Ok(Console::new(
            Source::File(BufReader::new(file)),
            Sink::Stdout(io::stdout()),
        ))
    }

    /// Read from `text`, capture output in memory.
    pub fn from_text(text: &str) -> Self {
        Console::new(
            Source::Text {
                bytes: text.as_bytes().to_vec(),
                pos: 0,
            },
            Sink::Buffer(Vec::new()),
        )
    }

    fn read_raw(&mut self) -> LispResult<u8> {
        let mut buf = [0u8; 1];
        if matches!(self.source, Source::Stdin) {
            self.flush()?;
        }
        let n = match &mut self.source {
            Source::Text { bytes, pos } => {
                let Some(&ch) = bytes.get(*pos) else {
                    return Err(LispError::EndOfInput);
                };
                *pos += 1;
                return Ok(ch);
            }
            Source::File(reader) => reader.read(&mut buf),
            Source::Stdin => io::stdin().lock().read(&mut buf),
        };
        match n {
            Ok(0) => Err(LispError::EndOfInput),
            Ok(_) => Ok(buf[0]),
            Err(e) => Err(LispError::Io(e.to_string())),
        }
    }

    /// Next input character, taking the pushback slot first. Blocks on a
    /// live source until a character arrives.
    pub fn get_char(&mut self) -> LispResult<u8> {
        if let Some(ch) = self.last_char.take() {
            return Ok(ch);
        }
        let ch = self.read_raw()? & 0x7f;
        if self.echo && ch != b'\r' {
            self.put_char(ch)?;
        }
        Ok(ch)
    }

    /// Push one character back so the next `get_char` returns it.
    pub fn unget(&mut self, ch: u8) {
        self.last_char = Some(ch);
    }

    pub fn put_char(&mut self, ch: u8) -> LispResult<()> {
        self.last_print = ch;
        match &mut self.sink {
            Sink::Stdout(out) => out
                .write_all(&[ch])
                .map_err(|e| LispError::Io(e.to_string())),
            Sink::Buffer(buf) => {
                buf.push(ch);
                Ok(())
            }
        }
    }

    pub fn put_str(&mut self, s: &str) -> LispResult<()> {
        s.bytes().try_for_each(|ch| self.put_char(ch))
    }

    pub fn newline(&mut self) -> LispResult<()> {
        self.put_char(NEWLINE)
    }

    /// Start a new line unless the last character written ended one.
    pub fn fresh_line(&mut self) -> LispResult<()> {
        if self.last_print != NEWLINE {
            self.newline()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> LispResult<()> {
        match &mut self.sink {
            Sink::Stdout(out) => out.flush().map_err(|e| LispError::Io(e.to_string())),
            Sink::Buffer(_) => Ok(()),
        }
    }

    /// Everything written so far to a captured sink.
    pub fn output(&self) -> String {
        match &self.sink {
            Sink::Buffer(buf) => String::from_utf8_lossy(buf).into_owned(),
            Sink::Stdout(_) => String::new(),
        }
    }

    /// Drain a captured sink.
    #[cfg(test)]
    pub fn take_output(&mut self) -> String {
        match &mut self.sink {
            Sink::Buffer(buf) => String::from_utf8_lossy(&std::mem::take(buf)).into_owned(),
            Sink::Stdout(_) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushback_is_returned_first() {
        let mut con = Console::from_text("AB");
        assert_eq!(con.get_char(), Ok(b'A'));
        con.unget(b'(');
        assert_eq!(con.get_char(), Ok(b'('));
        assert_eq!(con.get_char(), Ok(b'B'));
        assert_eq!(con.get_char(), Err(LispError::EndOfInput));
    }

    #[test]
    fn echo_copies_input_but_not_cr() {
        let mut con = Console::from_text("X\rY");
        con.echo = true;
        for _ in 0..3 {
            con.get_char().unwrap();
        }
        assert_eq!(con.output(), "XY");
    }

    #[test]
    fn pushed_back_characters_are_not_echoed_twice() {
        let mut con = Console::from_text("Q");
        con.echo = true;
        let ch = con.get_char().unwrap();
        con.unget(ch);
        con.get_char().unwrap();
        assert_eq!(con.output(), "Q");
    }

    #[test]
    fn fresh_line_only_breaks_after_text() {
        let mut con = Console::from_text("");
        con.fresh_line().unwrap();
        assert_eq!(con.output(), "");
        con.put_str("NIL").unwrap();
        con.fresh_line().unwrap();
        con.fresh_line().unwrap();
        assert_eq!(con.take_output(), "NIL\n");
        assert_eq!(con.output(), "");
    }

    #[test]
    fn high_bit_is_stripped_from_input() {
        let mut con = Console::new(
            Source::Text {
                bytes: vec![0x80 | b'A'],
                pos: 0,
            },
            Sink::Buffer(Vec::new()),
        );
        assert_eq!(con.get_char(), Ok(b'A'));
    }
}
