//! `ringhttpd` — process entry point.
//!
//! Usage:
//!     ringhttpd [--port 8080] [--dir ./www] [--threads N]
//!
//! Flags are parsed by hand rather than through a CLI-parsing crate, since
//! the whole flag surface here is three options.

use std::env;
use std::path::PathBuf;

use ringcore::rlog_info;
use ringserver::{Server, ServerConfig};

fn main() {
    ringcore::log::init();

    let args: Vec<String> = env::args().collect();
    let mut port: u16 = env::var("RINGD_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let mut docroot = PathBuf::from(".");
    let mut worker_count: Option<usize> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if let Some(v) = args.get(i) {
                    port = v.parse().unwrap_or(port);
                }
            }
            "--dir" | "-d" => {
                i += 1;
                if let Some(v) = args.get(i) {
                    docroot = PathBuf::from(v);
                }
            }
            "--threads" | "-t" => {
                i += 1;
                if let Some(v) = args.get(i) {
                    worker_count = v.parse().ok();
                }
            }
            other => {
                eprintln!("ringhttpd: unrecognized argument '{other}'");
            }
        }
        i += 1;
    }

    unsafe {
        libc::signal(libc::SIGINT, handle_shutdown_signal as usize);
        libc::signal(libc::SIGTERM, handle_shutdown_signal as usize);
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }

    let mut config = ServerConfig::new("", port, docroot.clone());
    if let Some(count) = worker_count {
        config.worker_count = count.max(1);
    }

    rlog_info!(
        "ringhttpd: port={} threads={} docroot={}",
        config.port,
        config.worker_count,
        docroot.display()
    );

    Server::new(config).listen();
}

extern "C" fn handle_shutdown_signal(_sig: libc::c_int) {
    ringcore::shutdown::request_shutdown();
}
