//! Test support for code built on the contract
//!
//! [`synthetic`] answers introspector queries from hand-written resource
//! tables; [`spirv`] assembles small SPIR-V modules that go through the real
//! parser.

pub mod spirv;
pub mod synthetic;
