use log::info;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};

use sysgpio::{
    AppConfig, AppState, BackendKind, CommandExecutor, FileBackend, GpioManager, MockBackend,
    ShellBackend, SysfsBackend,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SYSGPIO_CONFIG").ok())
        .unwrap_or_else(|| "config.json".to_string());
    let config = AppConfig::load_from_file(&config_path).map_err(io::Error::other)?;

    let timeout = config.sysfs.timeout();
    match config.sysfs.backend {
        BackendKind::File => serve(config, FileBackend::new(timeout)).await,
        BackendKind::Shell => serve(config, ShellBackend::new(CommandExecutor::new(timeout))).await,
        BackendKind::Mock => {
            let layout = config.sysfs.layout();
            serve(config, MockBackend::new(layout)).await
        }
    }
}

async fn serve<B: SysfsBackend>(config: AppConfig, backend: B) -> io::Result<()> {
    info!(
        "Using {:?} backend on {}",
        config.sysfs.backend,
        config.sysfs.root.display()
    );
    let manager =
        Arc::new(GpioManager::new(&config, Arc::new(backend)).map_err(io::Error::other)?);
    let app_state = AppState {
        manager: manager.clone(),
    };

    let scope_path = config.http.path.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .service(app_state.api_scope(&scope_path))
    });

    let bind_addrs: String;
    let http_cfg = config.http.clone();
    let server = match (&http_cfg.unix_socket, &http_cfg.host) {
        (Some(socket_path), Some(host)) => {
            if Path::new(socket_path).exists() {
                fs::remove_file(socket_path)?;
            }
            bind_addrs = format!("{} and {}", socket_path, host);

            server.bind_uds(socket_path)?.bind(host)?
        }
        (Some(socket_path), None) => {
            if Path::new(socket_path).exists() {
                fs::remove_file(socket_path)?;
            }
            bind_addrs = socket_path.clone();

            server.bind_uds(socket_path)?
        }
        (None, Some(host)) => {
            bind_addrs = host.clone();

            server.bind(host)?
        }
        (None, None) => {
            return Err(io::Error::other(
                "Config error: either 'unix_socket' or 'host' must be specified",
            ));
        }
    };

    info!("Starting server on {}...", bind_addrs);

    let result = server.run().await;
    manager.release_all().await;
    result
}
