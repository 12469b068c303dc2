//! Simple Operator: a Kubernetes operator that runs a container image behind
//! a Service and a TLS-terminated Ingress
//!
//! Each `SimpleOperator` object owns one Deployment, one Service and one
//! Ingress. The controller keeps them in line with the object's spec, reports
//! their state on its status, and removes them when the object is deleted.

pub mod controller;
pub mod crd;
pub mod error;

pub use crate::error::{Error, Result};
