//! # Panic capture.
//!
//! [`RunnablePanic`] is produced by the engine when a runnable panics while panic
//! containment is enabled. Its text is `runnable panic: <value>`.

use std::any::Any;
use std::error::Error as StdError;

use thiserror::Error;

/// A panic intercepted at the runnable invocation boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("runnable panic: {value}")]
pub struct RunnablePanic {
    /// Rendered panic payload.
    pub value: String,
}

impl RunnablePanic {
    /// Wraps an already rendered panic value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Builds from an unwind payload.
    ///
    /// Strings, numbers, `bool`, `char` and boxed errors keep their text; any
    /// other payload renders as `unknown panic`.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let value = render(payload.as_ref()).unwrap_or_else(|| "unknown panic".to_string());
        Self { value }
    }
}

/// Tries each printable payload type in turn.
macro_rules! render_as {
    ($payload:expr, $($ty:ty),+ $(,)?) => {
        $(
            if let Some(v) = $payload.downcast_ref::<$ty>() {
                return Some(v.to_string());
            }
        )+
    };
}

fn render(payload: &(dyn Any + Send)) -> Option<String> {
    render_as!(
        payload,
        &'static str,
        String,
        Box<dyn StdError + Send + Sync>,
        i8, i16, i32, i64, i128, isize,
        u8, u16, u32, u64, u128, usize,
        f32, f64, bool, char,
    );
    None
}
