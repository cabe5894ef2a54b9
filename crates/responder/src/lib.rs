#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ResponderError`)
//! - [`config`]: Responder configuration (`ResponderConfig`)
//! - [`rules`]: Response rules (`ResponseRule`, `RuleEngine`, `RemediationDecision`)
//! - [`cluster`]: Kubernetes API abstraction (`ClusterClient` trait, `KubeClusterClient`)
//! - [`dispatch`]: Pod delete execution (`RemediationDispatcher`, `DispatchOutcome`)
//! - [`responder`]: Main orchestrator (`PodResponder`, `PodResponderBuilder`)

pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod responder;
pub mod rules;

// --- Public API Re-exports ---

// Responder (main orchestrator)
pub use responder::{PodResponder, PodResponderBuilder, RemediationOutcome};

// Configuration
pub use config::ResponderConfig;

// Error
pub use error::ResponderError;

// Cluster API
pub use cluster::{ClusterClient, DeleteOutcome, KubeClusterClient};

// Rules
pub use rules::{
    IgnoreReason, RemediationDecision, ResponseRule, RuleEngine, default_rules,
    load_rule_from_file, load_rules_from_dir,
};

// Dispatch
pub use dispatch::{ACTION_TYPE_POD_DELETE, DispatchOutcome, RemediationDispatcher};
