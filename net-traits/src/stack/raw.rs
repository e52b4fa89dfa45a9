//! Factory traits for creating raw sockets on embedded devices

use crate::raw::{RawReceive, RawSend};

/// This trait is implemented by raw socket stacks — a single interface-bound factory for
/// the one link-layer socket a DHCP client keeps open at a time. Unlike a general-purpose
/// `edge-nal`-style stack, a DHCP client never needs concurrent send/receive halves on the
/// same socket (the event loop already serializes sends and receives through one `&mut`
/// reference), so there is no split-socket trait here.
pub trait RawStack {
    /// Error type returned on socket creation failure.
    type Error: embedded_io_async::Error;

    /// The socket type returned by the stack.
    type Socket<'a>: RawReceive<Error = Self::Error> + RawSend<Error = Self::Error>
    where
        Self: 'a;

    /// Create a raw socket.
    ///
    /// On most operating systems, creating a raw socket requires admin privileges.
    async fn bind(&self) -> Result<Self::Socket<'_>, Self::Error>;
}

impl<T> RawStack for &T
where
    T: RawStack,
{
    type Error = T::Error;

    type Socket<'a> = T::Socket<'a> where Self: 'a;

    async fn bind(&self) -> Result<Self::Socket<'_>, Self::Error> {
        (*self).bind().await
    }
}

impl<T> RawStack for &mut T
where
    T: RawStack,
{
    type Error = T::Error;

    type Socket<'a> = T::Socket<'a> where Self: 'a;

    async fn bind(&self) -> Result<Self::Socket<'_>, Self::Error> {
        (**self).bind().await
    }
}
