use serde::{Deserialize, Serialize};

/// Configuration for one primary-facing replication relationship.
///
/// Mirrors the fields the handshake and dump-request need: where the
/// primary is, who we claim to be when registering as its replica, and
/// where in the binlog stream to resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub primary_host: String,
    pub primary_port: u16,
    pub primary_username: String,
    pub primary_password: String,

    /// Server id this component presents to the primary when registering
    /// as a replica.
    pub self_server_id: u32,
    /// UUID this component presents via `SET @slave_uuid=...`.
    pub self_uuid: String,
    /// Port this component listens on for its own downstream replicas,
    /// reported in the registration packet.
    pub self_listen_port: u16,

    /// Binlog file name to resume streaming from.
    pub binlog_file: String,
    /// Binlog file offset to resume streaming from.
    pub binlog_position: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            primary_host: "127.0.0.1".to_string(),
            primary_port: 3306,
            primary_username: "root".to_string(),
            primary_password: String::new(),
            self_server_id: 65535,
            self_uuid: "00000000-0000-0000-0000-000000000000".to_string(),
            self_listen_port: 4000,
            binlog_file: String::new(),
            binlog_position: 4,
        }
    }
}
