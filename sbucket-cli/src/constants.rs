pub const DEFAULT_PROJECTION: &str = "merc";
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Source argument that selects the remote directory at its configured URL.
pub const REMOTE_SOURCE: &str = "remote";

pub const DEFAULT_MEASUREMENT_TARGET: &str = "example.net";
pub const DEFAULT_MEASUREMENT_API: &str = "https://atlas.ripe.net/api/v2/measurements/";
pub const DEFAULT_AF: u8 = 4;
pub const DEFAULT_PACKETS: u32 = 3;
pub const DEFAULT_PACKET_SIZE: u32 = 48;
pub const DEFAULT_INTERVAL_SECS: u32 = 240;
pub const API_KEY_PLACEHOLDER: &str = "INSERT_KEY_HERE";
