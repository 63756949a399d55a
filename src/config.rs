use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::codec::{FrameCodec, DEFAULT_MAX_FRAME_SIZE};
use crate::frame::DEFAULT_MAX_DEPTH;

const HOST: &str = "127.0.0.1";
const PORT: u16 = 31337;
const MAX_CLIENTS: usize = 64;

/// Server settings. Every flag can also be given through its environment variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "rustkv", version, about)]
pub struct Config {
    /// The address to listen on
    #[arg(long, env = "RUSTKV_HOST", default_value = HOST)]
    pub host: String,

    /// The port to listen on
    #[arg(short, long, env = "RUSTKV_PORT", default_value_t = PORT)]
    pub port: u16,

    /// Maximum number of clients served at the same time
    #[arg(
        long,
        env = "RUSTKV_MAX_CLIENTS",
        default_value_t = MAX_CLIENTS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=Semaphore::MAX_PERMITS as u64)
    )]
    pub max_clients: usize,

    /// Largest frame, in bytes, a client may send
    #[arg(long, env = "RUSTKV_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,

    /// Deepest nesting of arrays and maps accepted in a request
    #[arg(long, env = "RUSTKV_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Seconds a connection may sit idle on a read or write before it is dropped
    #[arg(long, env = "RUSTKV_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl Config {
    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(self.max_frame_size, self.max_depth)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: HOST.to_string(),
            port: PORT,
            max_clients: MAX_CLIENTS,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: None,
        }
    }
}
