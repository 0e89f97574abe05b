//! Feature-gated instrumentation.
//!
//! Searches, calibration and directory loads open info spans and report
//! counts as events. With the `tracing` feature disabled every macro expands
//! to code the optimizer removes, so call sites need no `cfg` attributes.

/// Opens an info span, e.g. `let _span = trace_span!("db_search", templates = n).entered();`.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::DisabledSpan
    };
}

/// Records an info event with `key = value` fields.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr $(, $key:ident = $value:expr)+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
    ($name:expr $(,)?) => {
        tracing::info!(name: $name, "{}", $name)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        let _ = ($($value,)*);
    };
}

/// Records a warning; field values are formatted with `Display`.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($name:expr $(, $key:ident = $value:expr)+ $(,)?) => {
        tracing::warn!(name: $name, $($key = %$value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($name:expr $(, $key:ident = $value:expr)+ $(,)?) => {
        let _ = ($(&$value,)+);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_span;
pub(crate) use trace_warn;

/// Stand-in for `tracing::Span` when instrumentation is compiled out.
#[cfg(not(feature = "tracing"))]
pub struct DisabledSpan;

#[cfg(not(feature = "tracing"))]
impl DisabledSpan {
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
