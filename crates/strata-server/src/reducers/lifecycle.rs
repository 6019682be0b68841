//! Client connection lifecycle

use strata_core::protocol::ClientId;

use crate::helpers::deactivate_chunk;
use crate::state::WorldCore;
use crate::transport::Outbox;

/// Release everything a client held and forget it
pub fn client_disconnected<O: Outbox>(core: &mut WorldCore<O>, client: ClientId) {
    let released = core.windows.remove_client(client);
    for coord in &released {
        deactivate_chunk(core, *coord);
    }
    core.outbox.disconnect(client);
    log::info!(
        "[NET] {} disconnected, {} chunk(s) no longer held",
        client,
        released.len()
    );
}
