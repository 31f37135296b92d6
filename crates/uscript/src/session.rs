//! Lockstep message channel
//!
//! A session owns one inbound and one outbound byte stream. Exchanges are
//! strictly serial: write a line, flush, then block on the next line. End
//! of stream on the inbound side is a normal shutdown and reads as `None`.

use crate::error::ProtocolError;
use crate::message::{Message, Request, Response};
use std::io::{BufRead, Write};
use tracing::debug;
use uuid::Uuid;

pub struct Session<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Session { reader, writer }
    }

    /// Give back the underlying streams
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Write one message, assigning a fresh id if it has none.
    /// Returns the id the message was sent with.
    pub fn send(&mut self, mut message: Message) -> Result<String, ProtocolError> {
        let id = match message.id() {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                message.set_id(id.as_str());
                id
            }
        };
        let line = message.encode();
        debug!("send: {}", line);
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(id)
    }

    /// Block for the next message; `None` at end of stream
    pub fn read_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            debug!("recv: end of stream");
            return Ok(None);
        }
        debug!("recv: {}", line.trim_end());
        Message::decode(&line).map(Some)
    }

    pub fn read_request(&mut self) -> Result<Option<Request>, ProtocolError> {
        match self.read_message()? {
            Some(message) => Request::from_message(&message).map(Some),
            None => Ok(None),
        }
    }

    pub fn read_response(&mut self) -> Result<Option<Response>, ProtocolError> {
        match self.read_message()? {
            Some(message) => Response::from_message(&message).map(Some),
            None => Ok(None),
        }
    }

    /// Call `method` on the other side and wait for its response
    pub fn call<S: AsRef<str>>(
        &mut self,
        method: &str,
        args: &[S],
    ) -> Result<Response, ProtocolError> {
        let args = args.iter().map(|a| a.as_ref().to_string()).collect();
        let request = Request::new(method, args);
        let id = self.send(request.to_message())?;
        let response = self.read_response()?.ok_or(ProtocolError::Closed)?;
        if response.id != id {
            return Err(ProtocolError::IdMismatch {
                expected: id,
                actual: response.id,
            });
        }
        Ok(response)
    }

    /// Answer a request
    pub fn respond(&mut self, response: &Response) -> Result<(), ProtocolError> {
        self.send(response.to_message())?;
        Ok(())
    }
}
