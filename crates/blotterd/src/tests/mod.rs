//! Test suites for the service bootstrap.

mod support;
