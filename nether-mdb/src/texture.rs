//! Texture resolution handshake
//!
//! The decoder never owns textures. It asks a [`TextureRequester`] for each
//! texture name it finds and gets back a [`PendingTexture`]. Once the node
//! walk is done, the decoder waits on every pending request before it hands
//! out the model, so a returned model never points at a texture in flight.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::TextureError;

/// Opaque handle issued by the texture owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// The collaborator that turns texture names into handles
pub trait TextureSource {
    fn resolve(&self, name: &str) -> Result<TextureHandle, TextureError>;
}

/// Submits texture requests on behalf of a decode
pub trait TextureRequester {
    fn request(&self, name: &str) -> PendingTexture;
}

type Reply = Result<TextureHandle, TextureError>;

/// An outstanding texture request
pub struct PendingTexture {
    name: String,
    rx: Receiver<Reply>,
}

impl PendingTexture {
    /// A request that has already been answered
    pub fn ready(name: &str, reply: Reply) -> Self {
        let (tx, rx) = mpsc::sync_channel(1);
        // Receiver is alive, the send cannot fail
        let _ = tx.send(reply);
        Self {
            name: name.to_string(),
            rx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the request is answered
    ///
    /// A dropped reply sender counts as an unavailable source.
    pub fn wait(self, timeout: Option<Duration>) -> Reply {
        match timeout {
            None => self
                .rx
                .recv()
                .unwrap_or_else(|_| Err(TextureError::Unavailable(self.name))),
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(reply) => reply,
                Err(RecvTimeoutError::Timeout) => Err(TextureError::TimedOut(self.name)),
                Err(RecvTimeoutError::Disconnected) => Err(TextureError::Unavailable(self.name)),
            },
        }
    }
}

/// Resolves textures synchronously on the decoding thread
pub struct InlineTextures<S> {
    source: S,
}

impl<S: TextureSource> InlineTextures<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: TextureSource> TextureRequester for InlineTextures<S> {
    fn request(&self, name: &str) -> PendingTexture {
        PendingTexture::ready(name, self.source.resolve(name))
    }
}

struct TextureRequest {
    name: String,
    reply: SyncSender<Reply>,
}

/// Resolves textures on a dedicated thread that owns the texture source
///
/// Mirrors a render thread that owns the GPU texture cache: decodes enqueue
/// names, the owner answers them in order.
pub struct TextureThread {
    /// Request sender (Option to allow explicit drop before join)
    tx: Option<SyncSender<TextureRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl TextureThread {
    /// Request queue depth before `request` blocks
    pub const QUEUE_DEPTH: usize = 64;

    pub fn spawn<S>(source: S) -> std::io::Result<Self>
    where
        S: TextureSource + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<TextureRequest>(Self::QUEUE_DEPTH);

        let handle = std::thread::Builder::new()
            .name("mdb-textures".to_string())
            .spawn(move || {
                for request in rx {
                    let reply = source.resolve(&request.name);
                    // The decode may have failed and dropped its receiver
                    let _ = request.reply.send(reply);
                }
                debug!("Texture thread exiting");
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl TextureRequester for TextureThread {
    fn request(&self, name: &str) -> PendingTexture {
        let Some(ref tx) = self.tx else {
            return PendingTexture::ready(name, Err(TextureError::Unavailable(name.to_string())));
        };

        let (reply, rx) = mpsc::sync_channel(1);
        let request = TextureRequest {
            name: name.to_string(),
            reply,
        };

        // Try without blocking first so a saturated queue shows up in the log
        let request = match tx.try_send(request) {
            Ok(()) => None,
            Err(TrySendError::Full(request)) => {
                debug!("Texture queue full, blocking on {}", name);
                Some(request)
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Texture thread disconnected");
                return PendingTexture::ready(name, Err(TextureError::Unavailable(name.to_string())));
            }
        };

        if let Some(request) = request {
            if tx.send(request).is_err() {
                warn!("Texture thread disconnected");
                return PendingTexture::ready(name, Err(TextureError::Unavailable(name.to_string())));
            }
        }

        PendingTexture {
            name: name.to_string(),
            rx,
        }
    }
}

impl Drop for TextureThread {
    fn drop(&mut self) {
        // Drop the sender first so the worker's receive loop ends, then join
        drop(self.tx.take());

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
