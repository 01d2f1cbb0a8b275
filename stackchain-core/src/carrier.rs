use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::Trace;

/// Key under which the launch trace is stored.  Being private to this module,
/// no other code can read or replace the slot.
struct LaunchTrace(Arc<Trace>);

/// Holds values that travel with a call chain.
///
/// A carrier is passed explicitly from a caller to its callees, and from a
/// launching thread or task into the unit it spawns.  It can be cloned
/// efficiently and is never modified in place: every `with_*` method returns
/// a derived carrier and leaves the original untouched.
///
/// Values are keyed by their type, so libraries can keep private data in a
/// carrier by using a private type.  The tracer stores the trace of the
/// launch site this way, which captures made from the carrier pick up as
/// their predecessor.
///
/// # Examples
///
/// ```
/// use stackchain_core::Carrier;
///
/// #[derive(Debug, PartialEq)]
/// struct RequestId(u64);
///
/// let root = Carrier::new();
/// let carrier = root.with_value(RequestId(7));
///
/// assert_eq!(carrier.value::<RequestId>(), Some(&RequestId(7)));
/// assert_eq!(root.value::<RequestId>(), None);
/// ```
#[derive(Clone, Default)]
pub struct Carrier {
    values: Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Carrier {
    /// Creates an empty carrier.
    pub fn new() -> Carrier {
        Carrier::default()
    }

    /// Returns a derived carrier that additionally holds `value`, replacing
    /// any earlier value of the same type.
    pub fn with_value<T>(&self, value: T) -> Carrier
    where
        T: Any + Send + Sync,
    {
        let mut carrier = self.clone();
        Arc::make_mut(&mut carrier.values).insert(TypeId::of::<T>(), Arc::new(value));
        carrier
    }

    /// Looks up the value of type `T`.
    pub fn value<T>(&self) -> Option<&T>
    where
        T: Any + Send + Sync,
    {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Returns a derived carrier whose captures continue from `trace`.
    ///
    /// This is how a trace received from elsewhere, for instance deserialized
    /// from a request, becomes the logical caller of local captures.
    pub fn with_trace(&self, trace: Trace) -> Carrier {
        self.with_launch_trace(Arc::new(trace))
    }

    pub(crate) fn with_launch_trace(&self, trace: Arc<Trace>) -> Carrier {
        self.with_value(LaunchTrace(trace))
    }

    /// The trace that captures made from this carrier continue from.
    pub fn trace(&self) -> Option<&Trace> {
        self.value::<LaunchTrace>().map(|slot| &*slot.0)
    }

    pub(crate) fn predecessor(&self) -> Option<Arc<Trace>> {
        self.value::<LaunchTrace>().map(|slot| slot.0.clone())
    }

    /// The number of values in the carrier, including the trace.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the carrier holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Carrier")
            .field("values", &self.values.len())
            .field("trace", &self.trace().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackchain_types::protocol::Frame;

    #[derive(Debug, PartialEq)]
    struct Tenant(&'static str);

    fn resolved_trace(function: &str) -> Trace {
        Trace::from_frames(vec![Frame {
            function: function.into(),
            ..Default::default()
        }])
    }

    #[test]
    fn test_empty_carrier() {
        let carrier = Carrier::new();
        assert!(carrier.is_empty());
        assert!(carrier.trace().is_none());
        assert!(carrier.predecessor().is_none());
        assert_eq!(carrier.value::<Tenant>(), None);
    }

    #[test]
    fn test_derived_carrier_keeps_original() {
        let root = Carrier::new().with_value(Tenant("acme"));
        let derived = root.with_trace(resolved_trace("app::main"));

        assert!(root.trace().is_none());
        assert_eq!(root.len(), 1);
        assert_eq!(derived.len(), 2);
        assert_eq!(derived.value::<Tenant>(), Some(&Tenant("acme")));
        assert_eq!(derived.trace().unwrap().frames()[0].function, "app::main");
    }

    #[test]
    fn test_trace_slot_is_replaced() {
        let first = Carrier::new().with_trace(resolved_trace("first"));
        let second = first.with_trace(resolved_trace("second"));

        assert_eq!(second.len(), 1);
        assert_eq!(first.trace().unwrap().frames()[0].function, "first");
        assert_eq!(second.trace().unwrap().frames()[0].function, "second");
    }

    #[test]
    fn test_value_replaced_by_type() {
        let carrier = Carrier::new()
            .with_value(Tenant("a"))
            .with_value(Tenant("b"))
            .with_value(5u32);
        assert_eq!(carrier.len(), 2);
        assert_eq!(carrier.value::<Tenant>(), Some(&Tenant("b")));
        assert_eq!(carrier.value::<u32>(), Some(&5));
    }
}
