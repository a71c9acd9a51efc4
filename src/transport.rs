use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};

use log::debug;

use crate::message::{Message, ParseResult, ProtocolError};


// Longest accepted line, newline included. Valid messages are far shorter.
pub const MAX_LINE_LEN: u64 = 1024;

pub struct LineReader<R> {
    reader: R,
}

pub struct LineWriter<W> {
    writer: W,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self { LineReader { reader } }

    // Blocks for the next line. `Ok(None)` means end of stream. A line that is not valid
    // UTF-8, is too long or has an unknown type still counts as received.
    pub fn receive(&mut self) -> io::Result<Option<ParseResult>> {
        let mut buf = Vec::new();
        if self.read_capped(&mut buf)? == 0 {
            return Ok(None);
        }
        if buf.len() as u64 == MAX_LINE_LEN && !buf.ends_with(b"\n") {
            debug!("Received a line longer than {MAX_LINE_LEN} bytes");
            self.skip_rest_of_line()?;
            return Ok(Some(Err(ProtocolError::InvalidMessage)));
        }
        let Ok(line) = String::from_utf8(buf) else {
            debug!("Received non-UTF-8 line");
            return Ok(Some(Err(ProtocolError::InvalidMessage)));
        };
        debug!("Received: {}", line.trim_end());
        Ok(Some(Message::parse(&line)))
    }

    fn read_capped(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        (&mut self.reader).take(MAX_LINE_LEN).read_until(b'\n', buf)
    }

    fn skip_rest_of_line(&mut self) -> io::Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if self.read_capped(&mut buf)? == 0 || buf.ends_with(b"\n") {
                return Ok(());
            }
        }
    }
}

impl<W: Write> LineWriter<W> {
    pub fn new(writer: W) -> Self { LineWriter { writer } }

    pub fn send(&mut self, message: &Message) -> io::Result<()> {
        writeln!(self.writer, "{message}")?;
        self.writer.flush()?;
        debug!("Sent: {message}");
        Ok(())
    }

    pub fn get_ref(&self) -> &W { &self.writer }
}

pub type TcpLineReader = LineReader<BufReader<TcpStream>>;
pub type TcpLineWriter = LineWriter<TcpStream>;

pub fn split(stream: TcpStream) -> io::Result<(TcpLineReader, TcpLineWriter)> {
    let read_half = stream.try_clone()?;
    Ok((LineReader::new(BufReader::new(read_half)), LineWriter::new(stream)))
}

// Closes both directions. Wakes up any thread blocked reading from the socket.
pub fn shutdown(stream: &TcpStream) -> io::Result<()> {
    match stream.shutdown(Shutdown::Both) {
        Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}


#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::coord::Point;
    use crate::message::{MessageKind, ReplayVote};

    #[test]
    fn reads_lines_until_eof() {
        let input = "MOVE 4 1 4 3\nREPLAY Yes\nBOGUS\nREPLAY No";
        let mut reader = LineReader::new(Cursor::new(input));
        let first = reader.receive().unwrap().unwrap().unwrap();
        assert_eq!(first.as_move(), Some((Point::new(4, 1), Point::new(4, 3))));
        let second = reader.receive().unwrap().unwrap().unwrap();
        assert_eq!(second.as_replay(), Some(ReplayVote::Yes));
        assert_eq!(reader.receive().unwrap().unwrap(), Err(ProtocolError::InvalidMessage));
        let last = reader.receive().unwrap().unwrap().unwrap();
        assert_eq!(last.kind(), MessageKind::Replay);
        assert!(reader.receive().unwrap().is_none());
    }

    #[test]
    fn invalid_utf8_is_invalid_message() {
        let mut reader = LineReader::new(Cursor::new(b"MOVE \xff\n".to_vec()));
        assert_eq!(reader.receive().unwrap().unwrap(), Err(ProtocolError::InvalidMessage));
    }

    #[test]
    fn overlong_line_is_invalid_message() {
        let input = format!("MOVE{}\nREPLAY Yes\n", " 1".repeat(3 * MAX_LINE_LEN as usize));
        let mut reader = LineReader::new(Cursor::new(input));
        assert_eq!(reader.receive().unwrap().unwrap(), Err(ProtocolError::InvalidMessage));
        let next = reader.receive().unwrap().unwrap().unwrap();
        assert_eq!(next.as_replay(), Some(ReplayVote::Yes));
        assert!(reader.receive().unwrap().is_none());
    }

    #[test]
    fn writes_newline_terminated_lines() {
        let mut writer = LineWriter::new(Vec::new());
        writer.send(&Message::replay(ReplayVote::No)).unwrap();
        writer.send(&Message::error(ProtocolError::InvalidMove)).unwrap();
        assert_eq!(writer.get_ref().as_slice(), b"REPLAY No\nERROR 2\n");
    }
}
