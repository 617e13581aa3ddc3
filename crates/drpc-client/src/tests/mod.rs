//! Test suites for the dRPC client connection.

mod support;
