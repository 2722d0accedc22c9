//! Per-connection request/response loop: recv, parse, resolve the URL
//! against the document root, respond, repeat. A `..` path segment is
//! rejected outright before `open()` rather than relying on path
//! normalization alone, which would happily walk back out of the document
//! root.

use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use httpwire::{HttpParser, HttpRequest, HttpResponse};
use ringcore::{rlog_debug, rlog_warn};
use ringpool::BufferPool;

use crate::io_ops::{self, close_fd};

/// Static configuration every connection handler reads; shared (not cloned)
/// across every connection on a worker via `Rc`.
pub struct DocRoot {
    root: PathBuf,
}

impl DocRoot {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve a request URL to a path under the document root, rejecting
    /// any `..` segment outright instead of relying on `relative()` to
    /// normalize it away.
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let url_path = url.split('?').next().unwrap_or(url);
        let relative = Path::new(url_path.trim_start_matches('/'));
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(self.root.join(relative))
    }
}

/// Drive one accepted connection until the client disconnects or a fatal
/// I/O error occurs. Each call runs as a separate task spawned on the
/// worker's `LocalExecutor` — the direct analogue of a `detach()`ed
/// `handle_client` coroutine.
pub async fn handle_connection(fd: i32, bgid: u16, pool: Rc<BufferPool>, docroot: Rc<DocRoot>) {
    let mut parser = HttpParser::new();

    loop {
        let outcome = match io_ops::recv_once(fd, bgid).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => break,
            Err(e) => {
                rlog_debug!("connection {fd} recv failed: {e}");
                break;
            }
        };

        let fed = pool.take(outcome.buf_id, outcome.len, |bytes| parser.feed(bytes));
        pool.release(outcome.buf_id);

        let request = match fed {
            Some(request) => request,
            None => continue,
        };

        if let Err(e) = respond(fd, &docroot, &request).await {
            rlog_warn!("connection {fd} response failed: {e}");
            break;
        }
    }

    close_fd(fd);
}

async fn respond(fd: i32, docroot: &DocRoot, request: &HttpRequest) -> std::io::Result<()> {
    let path = match docroot.resolve(&request.url) {
        Some(path) => path,
        None => return send_not_found(fd, &request.version).await,
    };

    let metadata = match std::fs::metadata(&path) {
        Ok(m) if m.is_file() => m,
        _ => return send_not_found(fd, &request.version).await,
    };

    let response = HttpResponse::ok(request.version.clone())
        .header("content-length", metadata.len().to_string());
    io_ops::send_all(fd, response.serialize().as_bytes()).await?;

    if metadata.len() == 0 {
        return Ok(());
    }

    let file_fd = io_ops::open_file(&path)?;
    let result = io_ops::splice_all(file_fd, fd, metadata.len()).await;
    close_fd(file_fd);
    result.map(|_| ())
}

async fn send_not_found(fd: i32, version: &str) -> std::io::Result<()> {
    let response = HttpResponse::not_found(version.to_string()).header("content-length", "0");
    io_ops::send_all(fd, response.serialize().as_bytes()).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_parent_traversal() {
        let docroot = DocRoot::new(PathBuf::from("/srv/www"));
        assert!(docroot.resolve("/../etc/passwd").is_none());
        assert!(docroot.resolve("/a/../../etc/passwd").is_none());
    }

    #[test]
    fn resolve_joins_normal_segments() {
        let docroot = DocRoot::new(PathBuf::from("/srv/www"));
        assert_eq!(docroot.resolve("/index.html").unwrap(), PathBuf::from("/srv/www/index.html"));
    }

    #[test]
    fn resolve_strips_query_string() {
        let docroot = DocRoot::new(PathBuf::from("/srv/www"));
        assert_eq!(docroot.resolve("/a.html?x=1").unwrap(), PathBuf::from("/srv/www/a.html"));
    }
}
