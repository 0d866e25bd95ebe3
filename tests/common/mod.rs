use kz_points::utils::logging::init_tracing;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test logging at warn level
pub fn init_test_env() {
    INIT.call_once(|| init_tracing("warn"));
}
