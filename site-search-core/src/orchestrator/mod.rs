//! Search orchestrator: authorize, fetch, cap, dedup, rank.
//!
//! This module visits record types in name order, asks the authorization
//! hook for each caller-visible scope, runs the eligible indices in
//! relevance order, and assembles one result per record type from the
//! capped, deduplicated hits.

pub mod assemble;
pub mod dedup;
pub mod search;
