/// `tracing::debug!` guarded by a runtime flag, for output too noisy for `RUST_LOG=debug` alone.
#[macro_export]
macro_rules! debug_if {
    ($enabled:expr, $($arg:tt)+) => {
        {
            if $enabled {
                tracing::debug!($($arg)+)
            }
        }
    };
}
