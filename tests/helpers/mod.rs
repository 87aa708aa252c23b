#![allow(dead_code)]

pub mod mock_server;
pub mod mock_transport;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mimicry=debug")
        .with_test_writer()
        .try_init();
}
