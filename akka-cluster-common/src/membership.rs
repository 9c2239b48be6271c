use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;

/// Membership view returned by the Akka Management `/members` route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MembershipSnapshot {
    /// Address of the node that answered the request.
    #[serde(deserialize_with = "null_as_default")]
    pub self_node: String,

    /// Current cluster leader (empty while there is none).
    #[serde(deserialize_with = "null_as_default")]
    pub leader: String,

    /// Oldest member of the cluster (empty while there is none).
    #[serde(deserialize_with = "null_as_default")]
    pub oldest: String,

    /// Nodes flagged unreachable by the failure detector.
    #[serde(deserialize_with = "null_as_default")]
    pub unreachable: Vec<ClusterNode>,

    /// All members known to the responding node.
    #[serde(deserialize_with = "null_as_default")]
    pub members: Vec<ClusterNode>,
}

impl MembershipSnapshot {
    /// Decode a snapshot from a JSON payload.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Count members by status.
    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::from_members(&self.members)
    }
}

/// Deserialize a field, treating an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single cluster participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterNode {
    /// Node address (e.g., "akka://system@10.0.0.1:2552").
    #[serde(deserialize_with = "null_as_default")]
    pub node: String,

    /// Unique incarnation id of the node.
    #[serde(deserialize_with = "null_as_default")]
    pub node_uid: String,

    /// Raw member status as reported upstream.
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,

    /// Cluster roles of the node.
    #[serde(deserialize_with = "null_as_default")]
    pub roles: BTreeSet<String>,
}

impl ClusterNode {
    /// Create a node with the given address and status.
    pub fn new(node: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            status: status.into(),
            ..Default::default()
        }
    }

    /// The recognized status of this node, if any.
    pub fn member_status(&self) -> Option<MemberStatus> {
        MemberStatus::parse(&self.status)
    }
}

/// Akka cluster member lifecycle states.
///
/// See the member state diagram in the Akka cluster documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MemberStatus {
    Up,
    Down,
    Joining,
    Leaving,
    Exiting,
    Removed,
}

impl MemberStatus {
    /// Every known status, in exposition order.
    pub const ALL: [MemberStatus; 6] = [
        MemberStatus::Up,
        MemberStatus::Down,
        MemberStatus::Joining,
        MemberStatus::Leaving,
        MemberStatus::Exiting,
        MemberStatus::Removed,
    ];

    /// Parse a status string. Matching is exact and case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Up" => Some(MemberStatus::Up),
            "Down" => Some(MemberStatus::Down),
            "Joining" => Some(MemberStatus::Joining),
            "Leaving" => Some(MemberStatus::Leaving),
            "Exiting" => Some(MemberStatus::Exiting),
            "Removed" => Some(MemberStatus::Removed),
            _ => None,
        }
    }

    /// Get the string representation used as the `status` label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Up => "Up",
            MemberStatus::Down => "Down",
            MemberStatus::Joining => "Joining",
            MemberStatus::Leaving => "Leaving",
            MemberStatus::Exiting => "Exiting",
            MemberStatus::Removed => "Removed",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Number of members per known status for one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    counts: [u64; MemberStatus::ALL.len()],
}

impl StatusCounts {
    /// Count members by status. Nodes with an unrecognized status are skipped.
    pub fn from_members(members: &[ClusterNode]) -> Self {
        let mut counts = Self::default();
        for status in members.iter().filter_map(ClusterNode::member_status) {
            counts.counts[status.index()] += 1;
        }
        counts
    }

    /// Count for a single status.
    pub fn get(&self, status: MemberStatus) -> u64 {
        self.counts[status.index()]
    }

    /// Sum over all known statuses.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Iterate over all six statuses with their counts, zeros included.
    pub fn iter(&self) -> impl Iterator<Item = (MemberStatus, u64)> + '_ {
        MemberStatus::ALL.iter().map(|s| (*s, self.get(*s)))
    }
}
