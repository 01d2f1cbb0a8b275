use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Wake, Waker};

use stackchain_backtrace::{
    capture_frames, strip_symbol, symbolize_frame, OpaqueFrame, SymbolizeOptions,
};
use stackchain_types::protocol::Frame;

use crate::launch::{launch_entry, launch_entry_poll, launch_exit};
use crate::Carrier;

/// How a marker function is recognized in a resolved stack.
///
/// A frame is a marker frame if its physical function starts at `entry`, or
/// if its function name equals `name`.  Names are compared without symbol
/// hashes and generic arguments.  Either part may be unknown, in which case
/// it never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerIdentity {
    entry: usize,
    name: Option<String>,
}

impl MarkerIdentity {
    /// Creates an identity from an entry address and a function name.
    ///
    /// A zero `entry` means the address is unknown.
    pub fn new(entry: usize, name: Option<String>) -> MarkerIdentity {
        MarkerIdentity {
            entry,
            name: name.map(|name| marker_key(&name)),
        }
    }

    /// The start address of the marker function, or zero.
    pub fn entry(&self) -> usize {
        self.entry
    }

    /// The function name of the marker, if it could be resolved.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` if the identity can match anything at all.
    pub fn is_known(&self) -> bool {
        self.entry != 0 || self.name.is_some()
    }

    /// Tests a resolved frame against this identity.
    ///
    /// `physical` tells whether `frame` is the outermost function reported
    /// for `opaque`, the only one the entry address can be compared to.
    pub fn matches(&self, opaque: OpaqueFrame, frame: &Frame, physical: bool) -> bool {
        if physical && self.entry != 0 && opaque.symbol_address() == self.entry {
            return true;
        }
        match self.name {
            Some(ref name) => marker_key(&frame.function) == *name,
            None => false,
        }
    }
}

/// The kind of launch boundary a marker frame represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// The outermost frame of a launched unit's own code.
    Entry,
    /// The innermost frame of a launch trace.
    Exit,
}

/// The identities of all launch markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    /// Wraps the body of a launched thread.
    pub entry: MarkerIdentity,
    /// Wraps every poll of a launched task.
    pub task_entry: MarkerIdentity,
    /// Captures the launch trace on the launching side.
    pub exit: MarkerIdentity,
}

impl Markers {
    /// Finds out how the markers look in this binary.
    ///
    /// Every marker is called once with a capture inside of it, and the
    /// marker frame is then looked up in the resolved result.
    pub fn detect(symbols: SymbolizeOptions) -> Markers {
        Markers {
            entry: identify(&capture_in_entry(), 0, "launch_entry", symbols),
            task_entry: identify(&capture_in_task_entry(), 0, "launch_entry_poll", symbols),
            exit: identify(
                &launch_exit(),
                launch_exit as *const () as usize,
                "launch_exit",
                symbols,
            ),
        }
    }

    /// Returns `true` if every marker was identified.
    pub fn is_complete(&self) -> bool {
        self.entry.is_known() && self.task_entry.is_known() && self.exit.is_known()
    }

    /// Classifies a resolved frame as a launch boundary, if it is one.
    pub fn classify(&self, opaque: OpaqueFrame, frame: &Frame, physical: bool) -> Option<Boundary> {
        if self.exit.matches(opaque, frame, physical) {
            Some(Boundary::Exit)
        } else if self.entry.matches(opaque, frame, physical)
            || self.task_entry.matches(opaque, frame, physical)
        {
            Some(Boundary::Entry)
        } else {
            None
        }
    }
}

/// Strips symbol hashes and generic arguments from a function name, so that
/// names compare equal whether or not the resolver keeps hashes.
fn marker_key(function: &str) -> String {
    let stripped = strip_symbol(function);
    match stripped.find("::<") {
        Some(index) => stripped[..index].to_owned(),
        None => stripped.into_owned(),
    }
}

fn is_marker_name(function: &str, suffix: &str) -> bool {
    marker_key(function)
        .strip_suffix(suffix)
        .is_some_and(|rest| rest.is_empty() || rest.ends_with("::"))
}

fn identify(
    frames: &[OpaqueFrame],
    entry: usize,
    suffix: &str,
    symbols: SymbolizeOptions,
) -> MarkerIdentity {
    let name = frames.iter().find_map(|&opaque| {
        symbolize_frame(opaque, symbols)
            .into_iter()
            .rev()
            .map(|frame| frame.function)
            .find(|function| is_marker_name(function, suffix))
    });
    MarkerIdentity::new(entry, name)
}

#[inline(never)]
fn capture_in_entry() -> Box<[OpaqueFrame]> {
    let mut frames = None;
    launch_entry(
        |_carrier| frames = Some(capture_frames(0)),
        Carrier::new(),
    );
    frames.unwrap_or_default()
}

struct NoopWaker;

impl Wake for NoopWaker {
    fn wake(self: Arc<Self>) {}
}

#[inline(never)]
fn capture_in_task_entry() -> Box<[OpaqueFrame]> {
    let mut frames = None;
    {
        let mut future = pin!(async {
            frames = Some(capture_frames(0));
        });
        let waker = Waker::from(Arc::new(NoopWaker));
        let mut cx = Context::from_waker(&waker);
        let _ = launch_entry_poll(future.as_mut(), &mut cx);
    }
    frames.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackchain_types::protocol::Addr;

    fn frame(function: &str) -> Frame {
        Frame {
            function: function.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_marker_key() {
        assert_eq!(marker_key("a::launch_entry"), "a::launch_entry");
        assert_eq!(marker_key("a::launch_entry::<b::{{closure}}>"), "a::launch_entry");
        assert_eq!(marker_key("a::launch_entry::h8348ddabf80e5a02"), "a::launch_entry");
        assert_eq!(
            marker_key("a[1f2e3d4c5b6a7988]::launch_entry::<b[0123456789abcdef]::F>"),
            "a::launch_entry"
        );
    }

    #[test]
    fn test_is_marker_name() {
        assert!(is_marker_name("a::launch::launch_entry", "launch_entry"));
        assert!(is_marker_name("launch_entry::<F>", "launch_entry"));
        assert!(!is_marker_name("a::relaunch_entry", "launch_entry"));
        assert!(!is_marker_name("a::launch_entry_poll", "launch_entry"));
        assert!(is_marker_name("a::launch_entry::h8348ddabf80e5a02", "launch_entry"));
    }

    #[test]
    fn test_match_by_name_ignores_generics() {
        let identity = MarkerIdentity::new(0, Some("app::launch::launch_entry::<X>".into()));
        assert_eq!(identity.name(), Some("app::launch::launch_entry"));

        let opaque = OpaqueFrame::new(0x1000, 0x900);
        assert!(identity.matches(opaque, &frame("app::launch::launch_entry::<Y>"), false));
        assert!(!identity.matches(opaque, &frame("app::launch::launch_entry_poll"), true));
        assert!(!identity.matches(opaque, &frame("unknown"), true));
    }

    #[test]
    fn test_match_by_entry_only_on_physical_frame() {
        let identity = MarkerIdentity::new(0x900, None);
        let opaque = OpaqueFrame::new(0x1000, 0x900);
        let inlined = Frame {
            function_entry: Addr(0x900),
            ..frame("app::helper")
        };
        assert!(identity.matches(opaque, &inlined, true));
        assert!(!identity.matches(opaque, &inlined, false));
        assert!(!MarkerIdentity::default().matches(opaque, &inlined, true));
    }

    #[test]
    fn test_classify() {
        let markers = Markers {
            entry: MarkerIdentity::new(0, Some("x::launch_entry".into())),
            task_entry: MarkerIdentity::new(0, Some("x::launch_entry_poll".into())),
            exit: MarkerIdentity::new(0x500, Some("x::launch_exit".into())),
        };
        let opaque = OpaqueFrame::new(0x510, 0x500);
        let other = OpaqueFrame::new(0x610, 0x600);

        assert_eq!(
            markers.classify(opaque, &frame("unknown"), true),
            Some(Boundary::Exit)
        );
        assert_eq!(
            markers.classify(other, &frame("x::launch_entry::<F>"), true),
            Some(Boundary::Entry)
        );
        assert_eq!(
            markers.classify(other, &frame("x::launch_entry_poll::<F>"), false),
            Some(Boundary::Entry)
        );
        assert_eq!(markers.classify(other, &frame("x::run"), true), None);
    }

    #[test]
    fn test_detect() {
        let markers = Markers::detect(SymbolizeOptions::default());
        assert!(markers.is_complete(), "{markers:?}");
        assert_eq!(markers.exit.entry(), launch_exit as *const () as usize);
        assert!(markers
            .entry
            .name()
            .is_some_and(|name| name.ends_with("launch::launch_entry")));
        assert!(markers
            .task_entry
            .name()
            .is_some_and(|name| name.ends_with("launch::launch_entry_poll")));
    }

    #[test]
    fn test_detect_with_hashes_kept() {
        let markers = Markers::detect(SymbolizeOptions {
            strip_hashes: false,
            include_inlined: true,
        });
        assert!(markers.is_complete(), "{markers:?}");
        assert!(markers
            .entry
            .name()
            .is_some_and(|name| name.ends_with("launch::launch_entry")));
        assert!(markers
            .task_entry
            .name()
            .is_some_and(|name| name.ends_with("launch::launch_entry_poll")));

        let hashed = Frame {
            function: format!("{}::h8348ddabf80e5a02", markers.entry.name().unwrap()),
            ..Default::default()
        };
        let opaque = OpaqueFrame::new(0x1000, 0x900);
        assert_eq!(
            markers.classify(opaque, &hashed, true),
            Some(Boundary::Entry)
        );
    }
}
