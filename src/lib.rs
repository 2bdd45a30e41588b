// lib.rs
#![warn(clippy::large_futures)]

pub use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicI32, AtomicU32, Ordering},
        Arc,
    },
};

pub use tokio::{
    sync::RwLock,
    time::{sleep, Duration},
};
pub use tracing::*;

mod config;
pub use config::*;

mod state;
pub use state::*;

mod sensor;
pub use sensor::*;

mod blink;
pub use blink::*;

mod apiserver;
pub use apiserver::*;

mod wifi;
pub use wifi::*;

pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");

// EOF
