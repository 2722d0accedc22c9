//! `ringserver` — socket/file awaiters, the per-connection handler, and the
//! worker/server assembly that ties `ringio`, `ringpool`, `ringtask`, and
//! `httpwire` together into a running static file server.

mod accept;
mod handler;
mod io_ops;
mod server;
mod worker;

pub use accept::{ListenSocket, MultishotAccept};
pub use handler::DocRoot;
pub use server::{Server, ServerConfig};
