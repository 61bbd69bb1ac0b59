//! VMS tenant provisioning service
//!
//! - [`api`]: HTTP API over [`vms_provision::TenantService`]
//! - [`config`]: flag / environment configuration shared with the CLI

pub mod api;
pub mod config;
