// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-execution profiling.
//!
//! When profiling is enabled in [`crate::RuntimeConfig`], each execution
//! records per-node wall-clock timings. The profile of the most recent
//! execution is retrievable from the request.

use std::time::Duration;

/// Timing record for a single node of one execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NodeProfile {
    /// Node name.
    pub node_name: String,
    /// Op label (e.g. `"fully_connected"`).
    pub op_type: String,
    /// Wall-clock time spent evaluating the node.
    pub duration: Duration,
    /// Whether the node actually ran (false when a prior node failed).
    pub executed: bool,
}

/// Profile of one complete execution.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutionProfile {
    /// Per-node records, in execution order. Empty when profiling is off.
    pub nodes: Vec<NodeProfile>,
    /// Total wall-clock time of the execution.
    pub total_duration: Duration,
}

impl ExecutionProfile {
    /// Records one node's timing.
    pub fn record(&mut self, node_name: String, op_type: String, duration: Duration) {
        self.nodes.push(NodeProfile {
            node_name,
            op_type,
            duration,
            executed: true,
        });
    }

    /// Finalises the profile with the total wall-clock time.
    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let node_ms: f64 = self
            .nodes
            .iter()
            .map(|n| n.duration.as_secs_f64() * 1000.0)
            .sum();
        format!(
            "Execution: {:.3}ms total, {} nodes profiled ({:.3}ms in kernels)",
            self.total_duration.as_secs_f64() * 1000.0,
            self.nodes.len(),
            node_ms,
        )
    }
}
