//! mle User Script Protocol
//!
//! A user script is a separate process that talks to the editor over a
//! pair of pipes using a line protocol (see [`message`]). The script first
//! registers the commands it implements, then serves editor requests one at
//! a time. While serving a request it may call back into the editor through
//! the same [`Session`].
//!
//! ```rust,ignore
//! use std::io::{BufRead, Write};
//! use uscript::{MLE_ERR, MLE_OK, Request, Session, Uscript, run};
//!
//! struct Hello;
//!
//! impl Uscript for Hello {
//!     fn commands(&self) -> Vec<String> {
//!         vec!["hello".to_string()]
//!     }
//!
//!     fn handle_request<R: BufRead, W: Write>(
//!         &mut self,
//!         session: &mut Session<R, W>,
//!         request: &Request,
//!     ) -> i32 {
//!         let mark = request.params.first().map(String::as_str).unwrap_or("");
//!         match session.call("mark_insert_before", &[mark, "hello", "5"]) {
//!             Ok(_) => MLE_OK,
//!             Err(_) => MLE_ERR,
//!         }
//!     }
//! }
//!
//! let stdin = std::io::stdin().lock();
//! run(&mut Hello, &mut Session::new(stdin, std::io::stdout()))?;
//! ```

pub mod error;
pub mod message;
pub mod session;

pub use error::ProtocolError;
pub use message::{Message, Request, Response};
pub use session::Session;

use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Editor success code
pub const MLE_OK: i32 = 0;
/// Editor failure code
pub const MLE_ERR: i32 = -1;

/// Editor command used to register script commands
pub const REGISTER_CMD: &str = "editor_register_cmd";

/// A user script: the commands it serves and how it serves them
pub trait Uscript {
    /// Command names registered with the editor at startup
    fn commands(&self) -> Vec<String>;

    /// Serve one editor request, returning an editor status code
    fn handle_request<R: BufRead, W: Write>(
        &mut self,
        session: &mut Session<R, W>,
        request: &Request,
    ) -> i32;
}

/// Register the script's commands, then answer requests until the editor
/// closes the channel.
///
/// Each request is answered with `result[rc]`, an `error` that is empty
/// on success and the status code otherwise, and the request's id.
pub fn run<S, R, W>(script: &mut S, session: &mut Session<R, W>) -> Result<(), ProtocolError>
where
    S: Uscript,
    R: BufRead,
    W: Write,
{
    for command in script.commands() {
        let response = session.call(REGISTER_CMD, &[command.as_str()])?;
        debug!("registered {} ({:?})", command, response.result);
    }

    while let Some(request) = session.read_request()? {
        let rc = script.handle_request(session, &request);
        let response = Response {
            id: request.id.clone(),
            result: vec![("rc".to_string(), rc.to_string())],
            error: if rc != MLE_OK {
                rc.to_string()
            } else {
                String::new()
            },
        };
        session.respond(&response)?;
    }

    info!("editor closed the channel");
    Ok(())
}
