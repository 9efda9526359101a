#[doc(hidden)]
#[macro_export]
macro_rules! dict {
    ($($key:expr => $value:expr),* $(,)?) => ({
        #[allow(unused_mut)]
        let mut dict = $crate::value::Dict::new();
        $(dict.insert($key.into(), $value.into());)*
        dict
    });
}

/// Evaluates the block and logs how long it took at `INFO` under `$phase`.
#[doc(hidden)]
#[macro_export]
macro_rules! time {
    ($phase:expr, $($token:tt)*) => ({
        let start = std::time::Instant::now();
        let value = { $($token)* };
        tracing::info!(phase = $phase, elapsed_ms = start.elapsed().as_millis() as u64, "finished");
        value
    });
}

pub use {dict, time};
