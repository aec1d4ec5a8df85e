/*!
 * Monitoring
 * Tracing setup for binaries and tests
 */

mod tracer;

pub use tracer::{init_test_tracing, init_tracing, span_teardown, TeardownSpan, TRACE_JSON_ENV};
