use hud_protocol::{ViewMsg, ipc::ViewTx};
use tracing::trace;

use crate::{Error, Result};

/// Sends view messages to the rendering adapter.
#[derive(Clone)]
pub struct ViewDispatcher {
    /// Channel to the adapter.
    tx: ViewTx,
}

impl ViewDispatcher {
    /// Create a dispatcher from a view channel.
    pub fn new(tx: ViewTx) -> Self {
        Self { tx }
    }

    /// Send one message.
    pub fn send(&self, msg: ViewMsg) -> Result<()> {
        trace!(?msg, "view_msg");
        self.tx.send(msg).map_err(|_| Error::ChannelClosed)
    }
}
