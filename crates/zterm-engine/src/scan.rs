//! Line scanner over an async byte pipe.
//!
//! Splits a producer's output pipe into lines. Binary output is decoded
//! best-effort: invalid UTF-8 is passed through lossily. Lines longer than
//! the internal buffer are split at the buffer boundary, and a final line
//! without a trailing newline is still delivered at EOF.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Lines longer than this are split.
const MAX_LINE: usize = 64 * 1024;

pub(crate) struct LineScanner<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineScanner<R> {
    pub(crate) fn new(pipe: R) -> Self {
        Self {
            reader: BufReader::new(pipe),
            buf: Vec::new(),
            eof: false,
        }
    }

    /// Next line, without the terminator. `None` once the pipe is exhausted;
    /// read errors end the stream the same way EOF does.
    ///
    /// Cancel safe: partially read line bytes stay buffered in the scanner.
    pub(crate) async fn next_line(&mut self) -> Option<String> {
        if self.eof {
            return None;
        }
        loop {
            let chunk = match self.reader.fill_buf().await {
                Ok(chunk) => chunk,
                Err(_) => &[],
            };
            if chunk.is_empty() {
                self.eof = true;
                if self.buf.is_empty() {
                    return None;
                }
                return Some(self.take_line());
            }

            if let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
                self.buf.extend_from_slice(&chunk[..pos]);
                self.reader.consume(pos + 1);
                return Some(self.take_line());
            }

            let len = chunk.len();
            self.buf.extend_from_slice(chunk);
            self.reader.consume(len);
            if self.buf.len() >= MAX_LINE {
                return Some(self.take_line());
            }
        }
    }

    fn take_line(&mut self) -> String {
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}
