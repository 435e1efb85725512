//! Byte-transfer seams.
//!
//! The data device never moves bytes itself. Once a destination asks to
//! receive a MIME type, the file descriptor it handed over is passed to
//! whoever owns the content: the transport (for client sources) or a
//! [`ContentProvider`] (for compositor-owned content).

use std::fmt;
use std::io;
use std::os::unix::io::OwnedFd;

use thiserror::Error;
use wayland_server::protocol::wl_data_device_manager::DndAction;

use super::ids::SourceId;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no live protocol object for {0}")]
    SourceUnavailable(SourceId),

    #[error("content provider refused {0:?}")]
    Refused(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Hands a destination's file descriptor to the client owning a source.
pub trait DataTransport {
    fn send(&mut self, source: SourceId, mime_type: &str, fd: OwnedFd, action: DndAction) -> Result<(), TransportError>;
}

/// Compositor-side content for server-initiated drags and compositor
/// selections. Called synchronously when a destination receives.
pub trait ContentProvider {
    fn send(&mut self, mime_type: &str, fd: OwnedFd) -> Result<(), TransportError>;
}

impl<F> ContentProvider for F
where
    F: FnMut(&str, OwnedFd) -> Result<(), TransportError>,
{
    fn send(&mut self, mime_type: &str, fd: OwnedFd) -> Result<(), TransportError> {
        self(mime_type, fd)
    }
}

/// Owned, type-erased [`ContentProvider`].
pub struct BoxedProvider(pub Box<dyn ContentProvider>);

impl fmt::Debug for BoxedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentProvider")
    }
}
