//! Thin shims so the rest of the crate can log without committing to a backend.
//!
//! Mirrors the `log`-backed macros used throughout the workspace; kept in its own
//! module (imported first) so later modules can just write `trace!(...)`.

#[allow(unused)]
macro_rules! trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*)
    };
}

#[allow(unused)]
macro_rules! unwrap {
    ($e:expr, $msg:expr) => {
        match $e {
            Ok(v) => v,
            Err(_) => panic!($msg),
        }
    };
}

#[allow(unused_imports)]
pub(crate) use trace;
#[allow(unused_imports)]
pub(crate) use unwrap;
