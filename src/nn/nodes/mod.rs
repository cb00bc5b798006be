mod node_handle;
pub(in crate::nn) mod raw_node;

pub(in crate::nn) use node_handle::NodeHandle;
pub(in crate::nn) use raw_node::NodeType;
pub(in crate::nn) use raw_node::RunningStats;
pub use raw_node::Reduction;

/// 节点在图中的唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);
