pub use reemit_test_utils::init_tracing;
