pub mod app;
pub mod db;
pub mod scanner;
pub mod server;
pub mod settings;
pub mod sink;
mod utils;

#[cfg(test)]
mod test_support;

/// Initializes logging (reads RUST_LOG, defaults to info).
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
