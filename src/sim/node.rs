//! A member of a simulated group: application, discard layer and transport

use crate::discard::{DiscardConfig, DiscardLayer};
use crate::sim::app::RecordingApp;
use crate::sim::error::SimResult;
use crate::sim::network::SimNetwork;
use crate::sim::transport::SimTransport;
use crate::stack::{Address, Message, ProtocolStack, View};
use std::sync::Arc;

/// One simulated group member
pub struct SimNode {
    pub address: Address,
    pub app: Arc<RecordingApp>,
    pub discard: Arc<DiscardLayer>,
    pub transport: Arc<SimTransport>,
    pub stack: ProtocolStack,
}

impl SimNode {
    /// Build `[APP, DISCARD, SIM_TRANSPORT]` attached to `network`.
    ///
    /// The local address is not announced; call [`start`](Self::start) for
    /// that, or let the discard layer query the transport on demand.
    pub fn new(
        name: impl Into<String>,
        network: &Arc<SimNetwork>,
        config: DiscardConfig,
    ) -> SimResult<Self> {
        let address = Address::named(name);
        let app = RecordingApp::new();
        let discard = Arc::new(DiscardLayer::new(config)?);
        let transport = SimTransport::new(address.clone(), network);

        let stack = ProtocolStack::builder()
            .push(app.clone())
            .push(discard.clone())
            .push(transport.clone())
            .build()?;

        Ok(Self {
            address,
            app,
            discard,
            transport,
            stack,
        })
    }

    /// Announce the local address down the stack
    pub fn start(&self) -> SimResult<()> {
        self.stack.set_local_address(self.address.clone())?;
        Ok(())
    }

    pub fn send(&self, msg: Message) -> SimResult<()> {
        self.app.send(msg)?;
        Ok(())
    }

    pub fn install_view(&self, view: View) -> SimResult<()> {
        self.app.install_view(view)?;
        Ok(())
    }
}

impl std::fmt::Debug for SimNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimNode")
            .field("address", &self.address)
            .field("stack", &self.stack)
            .finish()
    }
}

/// Start `count` nodes on a fresh network and install a common view
pub fn start_group(
    count: usize,
    config: DiscardConfig,
) -> SimResult<(Arc<SimNetwork>, Vec<SimNode>)> {
    let network = SimNetwork::new();
    let mut nodes = Vec::with_capacity(count);
    for i in 0..count {
        let node = SimNode::new(format!("node-{}", i), &network, config.clone())?;
        node.start()?;
        nodes.push(node);
    }

    let view = View::new(1, nodes.iter().map(|n| n.address.clone()).collect());
    for node in &nodes {
        node.install_view(view.clone())?;
    }

    Ok((network, nodes))
}
