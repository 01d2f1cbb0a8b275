/// Logs a debug message under the `stackchain` target if the given options
/// have `debug` turned on.
macro_rules! stackchain_debug {
    ($options:expr, $($arg:tt)*) => {
        if $options.debug {
            ::log::debug!(target: "stackchain", $($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::TracerOptions;

    #[test]
    fn stackchain_debug_accepts_format_args() {
        let options = TracerOptions {
            debug: true,
            ..Default::default()
        };
        let frames = 3;
        stackchain_debug!(options, "captured {} frames", frames);
        stackchain_debug!(TracerOptions::default(), "not logged: {frames}");
    }
}
