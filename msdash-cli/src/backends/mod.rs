mod fake;
mod http;

use std::sync::Arc;

use msdash_core::config::DashConfig;
use msdash_core::control::{ControlError, ControlPlane, ProbeClient};

pub use fake::FakeControlPlane;
pub use http::{HttpControlPlane, HttpProbeClient};

/// The two halves a dashboard needs: the control server and the probe transport
pub type Backends = (Arc<dyn ControlPlane>, Arc<dyn ProbeClient>);

pub fn connect(config: &DashConfig, demo: bool) -> Result<Backends, ControlError> {
    if demo {
        let fake = Arc::new(FakeControlPlane::new());
        return Ok((fake.clone(), fake));
    }
    let control = HttpControlPlane::new(&config.server_url, config.request_timeout())?;
    let probe = HttpProbeClient::new(&config.probe_host, config.request_timeout())?;
    Ok((Arc::new(control), Arc::new(probe)))
}
