#![allow(dead_code)]

pub use evalrun_test_utils::builders;
pub use evalrun_test_utils::fake_engine;
pub use evalrun_test_utils::{init_tracing, with_timeout};
