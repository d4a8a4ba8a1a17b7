//! Integration tests for the artifact vault

mod cli_contracts;
mod offline_cache;
mod selection_flow;
mod support;
mod views_and_hierarchy;
