//! Shared traits for protocol state containers.

/// Implemented by every piece of state that holds per-client objects.
pub trait ProtocolState {
    /// How the container identifies clients.
    type Client;

    /// Release everything owned by, or addressed to, a disconnected client.
    fn client_disconnected(&mut self, client: Self::Client);
}
