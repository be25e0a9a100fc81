//! Logging for tests.

use std::sync::Once;

static INIT: Once = Once::new();

/// Route log output through env_logger.  Safe to call from every test.
pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
