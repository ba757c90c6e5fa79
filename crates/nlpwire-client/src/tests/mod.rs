//! Test suites for the client facade.

mod support;
