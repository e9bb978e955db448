//! Console seams for `print`, `read` and assert reports.

use std::io::{self, BufRead, Write};

pub trait OutputSink {
    fn write(&mut self, text: &str) -> io::Result<()>;
}

impl<W: Write> OutputSink for W {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.write_all(text.as_bytes())?;
        self.flush()
    }
}

/// Supplies raw input one line at a time. `Ok(None)` means end of input.
pub trait InputSource {
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

impl<R: BufRead> InputSource for R {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        match BufRead::read_line(self, &mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lines_until_exhausted() {
        let mut input: &[u8] = b"1 2\nthree";
        assert_eq!(InputSource::read_line(&mut input).unwrap().as_deref(), Some("1 2\n"));
        assert_eq!(InputSource::read_line(&mut input).unwrap().as_deref(), Some("three"));
        assert_eq!(InputSource::read_line(&mut input).unwrap(), None);
    }

    #[test]
    fn writes_into_byte_buffers() {
        let mut output = Vec::<u8>::new();
        OutputSink::write(&mut output, "a").unwrap();
        OutputSink::write(&mut output, "b\n").unwrap();
        assert_eq!(output, b"ab\n");
    }
}
