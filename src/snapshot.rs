use serde::{Deserialize, Serialize};

/// Side length of the simulation's square coordinate space.
/// Fixed contract shared with the backend; do not change independently.
pub const AREA_SIZE: f64 = 1000.0;

/// One backend-reported state of the simulation at a given tick,
/// as returned by `GET /step`.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Snapshot {
    pub sim_time: u64,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
    pub gateway: [f64; 2],
    // Absent means "skip the dashboard update this tick", not "clear it".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_stats: Option<Vec<FailureStat>>,
}

impl Snapshot {
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.dead).count()
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Node {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    /// `#rrggbb` hex, battery/role encoding owned by the backend.
    pub color: String,
    pub is_head: bool,
    pub dead: bool,
}

/// Undirected visual edge. No identity beyond its endpoints; the backend
/// recomputes adjacency every tick.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Link {
    pub start: [f64; 2],
    pub end: [f64; 2],
}

/// Historical record of one node's dead period, cumulative across the
/// session. Entries persist even if the node were to revive.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct FailureStat {
    pub id: u32,
    pub dead_since: u64,
    pub downtime: u64,
}
