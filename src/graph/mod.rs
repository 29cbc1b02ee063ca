//! Graph snapshot and queries
//!
//! - [`GraphContext`]: borrowed, read-only view of a graph with O(1) lookups
//! - [`maps`]: map type definitions and builders
//! - [`accessors`]: shape, use-count and op-type queries
//! - [`validation`]: structural checks run before and after rewrites
//!
//! # Example
//!
//! ```ignore
//! use graph_fusion::graph::GraphContext;
//!
//! let ctx = GraphContext::new(&graph);
//!
//! let producer = ctx.get_producer("matmul_out");
//! let consumers = ctx.get_consumers("matmul_out");
//!
//! if ctx.is_single_use("matmul_out") {
//!     // safe to fold into the consumer
//! }
//! ```
//!
//! # Maps
//!
//! | Map | Description |
//! |-----|-------------|
//! | `producer_map` | output name → producer position |
//! | `consumer_map` | tensor name → consumer positions |
//! | `op_type_map` | op type → node positions |
//! | `initializer_map` | name → TensorProto |
//! | `value_info_map` | name → ValueInfoProto |

pub mod accessors;
pub mod context;
pub mod maps;
pub mod validation;

pub use accessors::{Dim, TypeAndShape};
pub use context::GraphContext;
pub use maps::{
    ConsumerMap, InitializerMap, InputCountMap, NodeIndices, OpTypeMap, ProducerMap, ValueInfoMap,
};
pub use validation::{check_graph, validate_graph, ValidationResult};
