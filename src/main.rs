use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod handler;
mod http;
mod logger;
mod server;
mod store;
mod users;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = parse_config_path(std::env::args().skip(1))?;
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Worker thread count follows server.workers, else one per core
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

/// `-c <path>` / `--config <path>`, defaulting to `config`
fn parse_config_path(
    mut args: impl Iterator<Item = String>,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut path = config::DEFAULT_CONFIG_PATH.to_string();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                path = args
                    .next()
                    .ok_or_else(|| format!("{arg} requires a path argument"))?;
            }
            other => return Err(format!("Unknown argument: {other}").into()),
        }
    }
    Ok(path)
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let store = store::from_config(&cfg.store)?;
    let listener = server::create_listener(addr)?;

    let state = Arc::new(config::AppState::new(&cfg, store));
    let active_connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &cfg);
    server::start_signal_handler(Arc::clone(&state));

    // Connections are served with spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            server::start_server_loop(listener, Arc::clone(&state), Arc::clone(&active_connections))
                .await?;

            let grace = Duration::from_secs(cfg.performance.write_timeout);
            let open = server::wait_for_connections(&active_connections, grace).await;
            if open > 0 {
                logger::log_warning(&format!("Exiting with {open} connection(s) still open"));
            }
            Ok::<(), Box<dyn std::error::Error>>(())
        })
        .await
}
