use std::fmt;

use stackchain_backtrace::{filename, short_function_name};
use stackchain_types::protocol::Frame;

/// The text rendered for a trace without frames.
pub const NO_STACK_TRACE: &str = "No stack trace";

/// Renders a human-readable stack trace.
///
/// The compact form names every frame by its function and containing module
/// and by the base name of its file:
///
/// ```text
/// Stack trace:
///   server::handle@server.rs:41
///   main::main@main.rs:12
/// ```
///
/// The verbose form uses the full function path and file path and appends
/// the function entry and the offset of the program counter into it:
///
/// ```text
/// Stack trace:
///   app::server::handle@/src/app/server.rs:41(0x55d0c0+0x2f)
/// ```
///
/// The exact format is meant for humans and may change.
///
/// # Examples
///
/// ```
/// use stackchain_core::format_frames;
///
/// assert_eq!(format_frames(&[], true), "No stack trace");
/// ```
pub fn format_frames(frames: &[Frame], verbose: bool) -> String {
    DisplayFrames::new(frames, verbose).to_string()
}

/// Lazily rendered stack trace, see [`format_frames`].
#[derive(Debug, Clone, Copy)]
pub struct DisplayFrames<'a> {
    frames: &'a [Frame],
    verbose: bool,
}

impl<'a> DisplayFrames<'a> {
    /// Wraps `frames` for display.
    pub fn new(frames: &'a [Frame], verbose: bool) -> DisplayFrames<'a> {
        DisplayFrames { frames, verbose }
    }
}

impl fmt::Display for DisplayFrames<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return f.write_str(NO_STACK_TRACE);
        }

        f.write_str("Stack trace:")?;
        for frame in self.frames {
            if self.verbose {
                write!(f, "\n  {}@{}:{}", frame.function, frame.file, frame.line)?;
                write_program_counter(f, frame)?;
            } else {
                write!(
                    f,
                    "\n  {}@{}:{}",
                    short_function_name(&frame.function),
                    filename(&frame.file),
                    frame.line
                )?;
            }
        }
        Ok(())
    }
}

fn write_program_counter(f: &mut fmt::Formatter<'_>, frame: &Frame) -> fmt::Result {
    let pc = frame.program_counter.0;
    if pc == 0 {
        return Ok(());
    }

    let entry = frame.function_entry.0;
    f.write_str("(")?;
    if entry != 0 {
        write!(f, "0x{entry:x}+")?;
    }
    write!(f, "0x{:x})", pc.wrapping_sub(entry))
}
