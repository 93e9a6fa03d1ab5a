//! Core routing and translation pipeline
//!
//! Identifier resolution, parameter transformation, adapter dispatch, and
//! streaming relay. Everything here is independent of the HTTP transport.

pub mod adapters;
pub mod model_id;
pub mod registry;
pub mod relay;
pub mod router;
pub mod transform;
pub mod types;
