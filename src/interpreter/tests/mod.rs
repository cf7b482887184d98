//! Tests for the suspendable interpreter core
//!
//! Organized by feature area. `helpers` holds the AST shorthands and the
//! host-side instruments the feature tests share.

mod helpers;

mod async_fn_tests;
mod control_flow_tests;
