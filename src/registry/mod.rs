//! Optimizer registry and entry point
//!
//! An [`OptimizerRegistry`] is an ordered table of optimizers, each guarded
//! by a [`DevicePredicate`]. [`optimize_graph`] runs the optimizers whose
//! predicate accepts the target device, in registration order, each on the
//! previous one's output.
//!
//! # Example
//!
//! ```ignore
//! use graph_fusion::prelude::*;
//!
//! let config = OptimizerConfig::default()
//!     .with_registry(graph_fusion::passes::default_registry()?)
//!     .continue_on_error(false);
//!
//! let report = optimize_graph(&mut graph, "cuda", &config)?;
//! println!("{} rewrites", report.total().transforms_applied);
//! ```

use std::fmt;

use tracing::{info, warn};

use crate::error::{OnnxResult, TransformError};
use crate::graph::validate_graph;
use crate::proto::GraphProto;
use crate::traits::GraphOptimizer;
use crate::transform::TransformStats;

/// Which devices an optimizer applies to
#[derive(Clone)]
pub enum DevicePredicate {
    /// Every device
    Any,
    /// Exact device names
    Devices(Vec<String>),
    /// Arbitrary test
    Custom(fn(&str) -> bool),
}

impl DevicePredicate {
    /// Predicate for a list of device names
    pub fn devices<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DevicePredicate::Devices(names.into_iter().map(Into::into).collect())
    }

    /// Check a device
    pub fn matches(&self, device: &str) -> bool {
        match self {
            DevicePredicate::Any => true,
            DevicePredicate::Devices(names) => names.iter().any(|n| n == device),
            DevicePredicate::Custom(f) => f(device),
        }
    }
}

impl fmt::Debug for DevicePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevicePredicate::Any => f.write_str("Any"),
            DevicePredicate::Devices(names) => f.debug_tuple("Devices").field(names).finish(),
            DevicePredicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

struct RegistryEntry {
    predicate: DevicePredicate,
    optimizer: Box<dyn GraphOptimizer>,
}

/// Ordered optimizer table
#[derive(Default)]
pub struct OptimizerRegistry {
    entries: Vec<RegistryEntry>,
}

impl OptimizerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an optimizer
    pub fn register(
        &mut self,
        predicate: DevicePredicate,
        optimizer: impl GraphOptimizer + 'static,
    ) -> &mut Self {
        self.entries.push(RegistryEntry {
            predicate,
            optimizer: Box::new(optimizer),
        });
        self
    }

    /// Append an optimizer, builder style
    pub fn with(
        mut self,
        predicate: DevicePredicate,
        optimizer: impl GraphOptimizer + 'static,
    ) -> Self {
        self.register(predicate, optimizer);
        self
    }

    /// Optimizers that apply to `device`, in registration order
    pub fn optimizers_for<'a>(
        &'a self,
        device: &'a str,
    ) -> impl Iterator<Item = &'a dyn GraphOptimizer> {
        self.entries
            .iter()
            .filter(move |e| e.predicate.matches(device))
            .map(|e| e.optimizer.as_ref())
    }

    /// Names of all registered optimizers
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.optimizer.name()).collect()
    }

    /// Number of registered optimizers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for OptimizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.optimizer.name(), &e.predicate)))
            .finish()
    }
}

/// Driver options plus the registry
#[derive(Debug)]
pub struct OptimizerConfig {
    /// Optimizers to run
    pub registry: OptimizerRegistry,
    /// Skip a failing optimizer instead of stopping
    pub continue_on_error: bool,
    /// Validate the graph after each optimizer
    pub validate_after: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            registry: OptimizerRegistry::new(),
            continue_on_error: true,
            validate_after: true,
        }
    }
}

impl OptimizerConfig {
    /// Set the registry
    pub fn with_registry(mut self, registry: OptimizerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set `continue_on_error`
    pub fn continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = value;
        self
    }

    /// Set `validate_after`
    pub fn validate_after(mut self, value: bool) -> Self {
        self.validate_after = value;
        self
    }
}

/// How one optimizer ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassStatus {
    /// Ran; the graph holds its output
    Applied(TransformStats),
    /// Failed; the graph holds the previous optimizer's output
    Skipped(String),
}

/// Per-optimizer entry of an [`OptimizeReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    /// Optimizer name
    pub name: String,
    /// Result
    pub status: PassStatus,
}

/// What [`optimize_graph`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    /// Target device
    pub device: String,
    /// One entry per optimizer run, in order
    pub passes: Vec<PassOutcome>,
}

impl OptimizeReport {
    /// Summed stats of the applied optimizers
    pub fn total(&self) -> TransformStats {
        let mut total = TransformStats::default();
        for pass in &self.passes {
            if let PassStatus::Applied(stats) = &pass.status {
                total.merge(stats);
            }
        }
        total
    }

    /// Names of skipped optimizers
    pub fn skipped(&self) -> Vec<&str> {
        self.passes
            .iter()
            .filter(|p| matches!(p.status, PassStatus::Skipped(_)))
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Run every optimizer registered for `device` over `graph`
///
/// A failing optimizer, or one that turns a valid graph invalid when
/// `validate_after` is set, has its output discarded. With
/// `continue_on_error` the driver logs it and moves on; otherwise the error
/// is returned and the graph keeps the output of the optimizers before it.
pub fn optimize_graph(
    graph: &mut GraphProto,
    device: &str,
    config: &OptimizerConfig,
) -> OnnxResult<OptimizeReport> {
    let mut report = OptimizeReport {
        device: device.to_string(),
        passes: Vec::new(),
    };
    let mut valid = config.validate_after && validate_graph(graph).is_valid;

    for optimizer in config.registry.optimizers_for(device) {
        let name = optimizer.name();
        let snapshot = graph.clone();

        let result = optimizer.optimize(graph).and_then(|stats| {
            if valid {
                let check = validate_graph(graph);
                if !check.is_valid {
                    return Err(TransformError::ValidationFailed(check.errors.join("; ")));
                }
            }
            Ok(stats)
        });

        match result {
            Ok(stats) => {
                info!(
                    optimizer = name,
                    device,
                    applied = stats.transforms_applied,
                    removed = stats.nodes_removed,
                    added = stats.nodes_added,
                    "optimizer finished"
                );
                report.passes.push(PassOutcome {
                    name: name.to_string(),
                    status: PassStatus::Applied(stats),
                });
            }
            Err(e) => {
                *graph = snapshot;
                if !config.continue_on_error {
                    warn!(optimizer = name, device, error = %e, "optimizer failed, stopping");
                    return Err(e);
                }
                warn!(optimizer = name, device, error = %e, "optimizer failed, skipped");
                report.passes.push(PassOutcome {
                    name: name.to_string(),
                    status: PassStatus::Skipped(e.to_string()),
                });
            }
        }

        if !valid && config.validate_after {
            valid = validate_graph(graph).is_valid;
        }
    }

    let total = report.total();
    info!(
        device,
        optimizers = report.passes.len(),
        skipped = report.skipped().len(),
        applied = total.transforms_applied,
        "optimization finished"
    );

    Ok(report)
}
