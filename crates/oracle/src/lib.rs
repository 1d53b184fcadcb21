pub mod collector;
pub mod config;
pub mod dashboard;
pub mod logger;
pub mod server;
pub mod service;
pub mod stats;

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the library (loads environment variables from .env file)
/// This is automatically called when the library is loaded
fn init() {
    INIT.call_once(|| {
        dotenv::dotenv().ok();
    });
}

// Automatically initialize when the library is loaded
#[ctor::ctor]
fn setup() {
    init();
}
