use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

pub fn init_test_tracing() {
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()),
            )
            .with_test_writer()
            .try_init();
    });
}
