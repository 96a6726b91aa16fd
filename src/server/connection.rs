// Connection handling module
// Accepts a single TCP connection and serves HTTP/1.1 on it

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppState, PerformanceConfig};
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing `max_connections`.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment first, then check the limit, so concurrent accepts cannot overshoot
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
    );
}

/// Serve one connection in a local task.
///
/// Each request's headers must arrive within `read_timeout`. When the
/// session outlives [`session_lifetime`] or shutdown begins, hyper is told
/// to finish the in-flight response and close; that drain is bounded by
/// `write_timeout`. The counter is decremented when the task ends.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let drain_timeout = Duration::from_secs(performance.write_timeout);

        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new());
        builder.keep_alive(performance.keep_alive_timeout > 0);
        if performance.read_timeout > 0 {
            builder.header_read_timeout(Duration::from_secs(performance.read_timeout));
        }

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
        );
        tokio::pin!(conn);

        let lifetime = tokio::time::sleep(session_lifetime(performance));
        tokio::pin!(lifetime);

        let finished = tokio::select! {
            result = conn.as_mut() => Some(result),
            () = state.shutdown_requested() => None,
            () = &mut lifetime => None,
        };

        let result = match finished {
            Some(result) => Ok(result),
            None => {
                conn.as_mut().graceful_shutdown();
                tokio::time::timeout(drain_timeout, conn).await
            }
        };

        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} did not close within {} seconds",
                    drain_timeout.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// How long one connection may stay open before it is wound down:
/// `keep_alive_timeout` with keep-alive on, otherwise the longer of the
/// read and write timeouts
fn session_lifetime(performance: &PerformanceConfig) -> Duration {
    let secs = if performance.keep_alive_timeout > 0 {
        performance.keep_alive_timeout
    } else {
        std::cmp::max(performance.read_timeout, performance.write_timeout)
    };
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn performance(keep_alive: u64, read: u64, write: u64) -> PerformanceConfig {
        let mut config = Config::load_from("does-not-exist/config").unwrap();
        config.performance.keep_alive_timeout = keep_alive;
        config.performance.read_timeout = read;
        config.performance.write_timeout = write;
        config.performance
    }

    #[test]
    fn test_keep_alive_session_is_not_capped_by_io_timeouts() {
        let lifetime = session_lifetime(&performance(75, 30, 30));
        assert_eq!(lifetime, Duration::from_secs(75));
    }

    #[test]
    fn test_session_without_keep_alive_uses_io_timeouts() {
        let lifetime = session_lifetime(&performance(0, 10, 30));
        assert_eq!(lifetime, Duration::from_secs(30));
    }
}
