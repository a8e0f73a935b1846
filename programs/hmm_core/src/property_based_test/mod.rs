//! Property-based tests over randomly generated operation sequences.

pub mod pool_property_tests;
