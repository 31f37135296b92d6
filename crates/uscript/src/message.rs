//! Line codec
//!
//! One message per line, encoded as a URL query string:
//! ```text
//! method=mark_insert_before&params%5B%5D=m1&params%5B%5D=hello&id=7
//! result%5Brc%5D=0&error=&id=7
//! ```
//! Array indices are dropped on the wire (`params[]`), so parameters are
//! positional. Decoding accepts explicit indices too and keeps the order
//! the fields appear in.

use crate::error::ProtocolError;
use url::form_urlencoded;

const ID: &str = "id";
const METHOD: &str = "method";
const PARAMS: &str = "params";
const RESULT: &str = "result";
const ERROR: &str = "error";

/// An ordered list of key/value fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: Vec<(String, String)>,
}

impl Message {
    pub fn new() -> Self {
        Message::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// The message id, if present and non-empty
    pub fn id(&self) -> Option<&str> {
        self.get(ID).filter(|id| !id.is_empty())
    }

    /// Set the id, replacing any existing one
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.fields.retain(|(k, _)| k != ID);
        self.push(ID, id);
    }

    /// Values of `name[...]` fields in order, with their bracketed keys
    fn array(&self, name: &str) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().filter_map(move |(k, v)| {
            let key = k.strip_prefix(name)?.strip_prefix('[')?.strip_suffix(']')?;
            Some((key, v.as_str()))
        })
    }

    /// Encode as a single line, without the trailing newline
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }

    /// Decode one line. Every message must carry a non-empty id.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<(String, String)> = form_urlencoded::parse(line.as_bytes())
            .into_owned()
            .collect();
        let message = Message { fields };
        if message.id().is_none() {
            return Err(ProtocolError::MissingId(line.to_string()));
        }
        Ok(message)
    }
}

/// A call into the other side
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Empty until assigned by the sender
    pub id: String,
    pub method: String,
    pub params: Vec<String>,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Vec<String>) -> Self {
        Request {
            id: String::new(),
            method: method.into(),
            params,
        }
    }

    pub fn to_message(&self) -> Message {
        let mut message = Message::new();
        message.push(METHOD, self.method.as_str());
        for param in &self.params {
            message.push(format!("{}[]", PARAMS), param.as_str());
        }
        if !self.id.is_empty() {
            message.push(ID, self.id.as_str());
        }
        message
    }

    pub fn from_message(message: &Message) -> Result<Self, ProtocolError> {
        let id = message
            .id()
            .ok_or_else(|| ProtocolError::MissingId(message.encode()))?;
        let method = match message.get(METHOD) {
            Some(m) if !m.is_empty() => m,
            _ => return Err(ProtocolError::BadRequest(message.encode())),
        };
        Ok(Request {
            id: id.to_string(),
            method: method.to_string(),
            params: message.array(PARAMS).map(|(_, v)| v.to_string()).collect(),
        })
    }
}

/// The answer to a request, correlated by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub id: String,
    /// Named result values in the order they were sent
    pub result: Vec<(String, String)>,
    /// Empty on success
    pub error: String,
}

impl Response {
    /// Look up a result value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.result
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty() && self.error != "0"
    }

    pub fn to_message(&self) -> Message {
        let mut message = Message::new();
        for (name, value) in &self.result {
            message.push(format!("{}[{}]", RESULT, name), value.as_str());
        }
        message.push(ERROR, self.error.as_str());
        if !self.id.is_empty() {
            message.push(ID, self.id.as_str());
        }
        message
    }

    pub fn from_message(message: &Message) -> Result<Self, ProtocolError> {
        let id = message
            .id()
            .ok_or_else(|| ProtocolError::MissingId(message.encode()))?;
        if message.get(METHOD).is_some() {
            return Err(ProtocolError::BadResponse(message.encode()));
        }
        Ok(Response {
            id: id.to_string(),
            result: message
                .array(RESULT)
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            error: message.get(ERROR).unwrap_or_default().to_string(),
        })
    }
}
