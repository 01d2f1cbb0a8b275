use std::ffi::c_void;

use stackchain_types::protocol::{Addr, Frame, UNKNOWN};

use crate::capture::OpaqueFrame;
use crate::utils::{demangle_symbol, strip_symbol};

/// Controls how opaque frames are turned into resolved frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolizeOptions {
    /// Strip trailing symbol hashes and crate disambiguators from function
    /// names.  (defaults to true)
    pub strip_hashes: bool,
    /// Emit one frame per inlined function instead of a single frame for the
    /// physical function.  (defaults to true)
    pub include_inlined: bool,
}

impl Default for SymbolizeOptions {
    fn default() -> Self {
        SymbolizeOptions {
            strip_hashes: true,
            include_inlined: true,
        }
    }
}

/// Resolves a single opaque frame, calling `f` for every resulting frame.
///
/// A physical frame yields one resolved frame per inlined function, innermost
/// first, unless [`SymbolizeOptions::include_inlined`] is turned off.  If the
/// address cannot be symbolicated at all, a single placeholder frame is
/// produced so that the position of the frame is not lost.
pub fn symbolize<F>(frame: OpaqueFrame, options: SymbolizeOptions, mut f: F)
where
    F: FnMut(Frame),
{
    let program_counter = Addr::from(frame.program_counter());
    let function_entry = Addr::from(frame.symbol_address());
    let mut emitted = false;
    let mut physical: Option<Frame> = None;

    // The unwinder reports return addresses; `resolve` looks up the call
    // instruction itself.
    backtrace::resolve(frame.ip() as *mut c_void, |symbol| {
        let function = match symbol.name() {
            Some(name) => clean_function_name(&name.to_string(), options),
            None => UNKNOWN.to_owned(),
        };
        let resolved = Frame {
            file: symbol
                .filename()
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_else(|| UNKNOWN.to_owned()),
            function,
            line: symbol.lineno().unwrap_or(0),
            program_counter,
            function_entry,
        };

        if options.include_inlined {
            emitted = true;
            f(resolved);
        } else {
            // the last symbol reported for an address is the physical function
            physical = Some(resolved);
        }
    });

    if let Some(resolved) = physical {
        f(resolved);
    } else if !emitted {
        f(Frame::unknown(program_counter, function_entry));
    }
}

/// Resolves a single opaque frame into a list of frames.
///
/// This is a convenience wrapper around [`symbolize`].
pub fn symbolize_frame(frame: OpaqueFrame, options: SymbolizeOptions) -> Vec<Frame> {
    let mut frames = Vec::new();
    symbolize(frame, options, |resolved| frames.push(resolved));
    frames
}

fn clean_function_name(raw: &str, options: SymbolizeOptions) -> String {
    if options.strip_hashes {
        demangle_symbol(&strip_symbol(raw))
    } else {
        demangle_symbol(raw)
    }
}
