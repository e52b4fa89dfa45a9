//! Send/receive traits over whole Ethernet frames — the level a DHCP client has to work
//! at before it owns a lease, since DISCOVER/OFFER/REQUEST/ACK and the ARP probe/announce
//! cycle both ride on a socket with no routable IP address bound yet.

use embedded_io_async::ErrorType;

/// A MAC address
pub type MacAddr = [u8; 6];

/// This trait is implemented by raw sockets and models their frame receiving functionality.
pub trait RawReceive: ErrorType {
    /// Receive a frame into the provided buffer.
    ///
    /// If the received frame exceeds the buffer's length, it is received regardless, and the
    /// remaining bytes are discarded. The full frame size is still indicated in the result,
    /// allowing the recipient to detect that truncation.
    ///
    /// The remote Mac address is given in the result along with the number
    /// of bytes.
    async fn receive(&mut self, buffer: &mut [u8]) -> Result<(usize, MacAddr), Self::Error>;
}

/// This trait is implemented by raw sockets and models their frame sending functionality.
pub trait RawSend: ErrorType {
    /// Send the provided frame to a peer.
    ///
    /// A MAC address is provided to specify the destination.
    /// If the destination mac address contains all `0xff`, the packet is broadcasted — the
    /// only way a DHCP client can reach a server before it has an address of its own.
    async fn send(&mut self, addr: MacAddr, data: &[u8]) -> Result<(), Self::Error>;
}

impl<T> RawReceive for &mut T
where
    T: RawReceive,
{
    async fn receive(&mut self, buffer: &mut [u8]) -> Result<(usize, MacAddr), Self::Error> {
        (**self).receive(buffer).await
    }
}

impl<T> RawSend for &mut T
where
    T: RawSend,
{
    async fn send(&mut self, addr: MacAddr, data: &[u8]) -> Result<(), Self::Error> {
        (**self).send(addr, data).await
    }
}
