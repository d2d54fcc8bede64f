#![cfg(feature = "std")]

use std::time::Duration;

/// Default UDP port both peers bind and address.
pub const DEFAULT_PORT: u16 = 5000;
/// Size of the receive buffer handed to the socket.
pub const RECV_BUFFER_SIZE: usize = 4096;
/// Capacity of the dispatcher-to-simulation queue.
pub const INBOUND_QUEUE_CAPACITY: usize = 256;
/// Capacity of the input-to-node channel.
pub const INPUT_CHANNEL_CAPACITY: usize = 64;
/// Length of the pre-game countdown.
pub const COUNTDOWN: Duration = Duration::from_secs(3);

/// Networking and session timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetConfig {
    pub port: u16,
    /// Delay between repeated `request` messages during matchmaking.
    pub request_interval: Duration,
    /// Give up on matchmaking after this long.
    pub handshake_deadline: Duration,
    /// Upper bound on a single transport receive.
    pub recv_timeout: Duration,
    pub reliable_retry_interval: Duration,
    pub reliable_deadline: Duration,
    pub reliable_max_in_flight: usize,
    pub inbound_capacity: usize,
    /// Node frame period.
    pub frame_period: Duration,
    pub countdown: Duration,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            request_interval: Duration::from_secs(1),
            handshake_deadline: Duration::from_secs(5),
            recv_timeout: Duration::from_millis(200),
            reliable_retry_interval: Duration::from_millis(200),
            reliable_deadline: Duration::from_secs(5),
            reliable_max_in_flight: 4,
            inbound_capacity: INBOUND_QUEUE_CAPACITY,
            frame_period: Duration::from_secs(1) / crate::sim::FRAME_RATE,
            countdown: COUNTDOWN,
        }
    }
}
