//! `httpwire` — HTTP/1.1 request parsing and response serialization, no
//! socket or filesystem code here. The ring-facing half (recv/send/splice
//! awaiters that feed and consume this) lives in `ringserver`.

mod message;
mod parser;

pub use message::{HttpRequest, HttpResponse};
pub use parser::HttpParser;
