pub mod flags;
pub mod ids;
pub mod node;

pub use flags::{ModifierFlags, ScopeFlags};
pub use ids::{NodeId, NodeIdGen};
pub use node::*;
