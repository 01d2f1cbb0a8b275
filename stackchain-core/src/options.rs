use std::borrow::Cow;

use stackchain_backtrace::SymbolizeOptions;

/// Configuration settings for a [`Tracer`](crate::Tracer).
///
/// # Examples
///
/// ```
/// let _options = stackchain_core::TracerOptions {
///     debug: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerOptions {
    /// Enables debug mode.
    ///
    /// In debug mode the tracer reports marker detection and launches through
    /// the `log` crate, using the `stackchain` target at `Debug` level.
    pub debug: bool,
    /// Strip symbol hashes and crate disambiguators from function names.
    /// (defaults to true)
    pub strip_hashes: bool,
    /// Emit a separate frame for every inlined function. (defaults to true)
    pub include_inlined: bool,
    /// The name given to threads spawned by [`Tracer::launch`](crate::Tracer::launch).
    pub thread_name: Option<Cow<'static, str>>,
}

impl Default for TracerOptions {
    fn default() -> TracerOptions {
        TracerOptions {
            debug: false,
            strip_hashes: true,
            include_inlined: true,
            thread_name: None,
        }
    }
}

impl TracerOptions {
    /// Creates new Options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates new Options and immediately configures them.
    pub fn configure<F>(f: F) -> Self
    where
        F: FnOnce(&mut TracerOptions) -> &mut TracerOptions,
    {
        let mut opts = Self::new();
        f(&mut opts);
        opts
    }

    pub(crate) fn symbolize_options(&self) -> SymbolizeOptions {
        SymbolizeOptions {
            strip_hashes: self.strip_hashes,
            include_inlined: self.include_inlined,
        }
    }
}
