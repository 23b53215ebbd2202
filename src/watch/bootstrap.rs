use tracing::info;

use crate::error::WatchError;
use crate::settings::ClientSettings;
use crate::watch::{ConnectParams, SharedWatchService, WatchConnector, WatchService};

pub const DIGEST_SCHEME: &str = "digest";

/// Open the watch-service connection described by `settings`.
///
/// Authenticates with the digest scheme when both `zkUsername` and
/// `zkPassword` are set, then makes sure the root namespace node exists.
/// Every failure is returned as is; nothing downstream works without the
/// connection.
pub fn bootstrap(
    connector: &dyn WatchConnector,
    settings: &ClientSettings,
) -> Result<SharedWatchService, WatchError> {
    let params = ConnectParams {
        host: settings.zk_host.clone(),
        session_timeout: settings.session_timeout(),
        connect_timeout: settings.connect_timeout(),
    };
    let service = connector.connect(&params)?;
    info!(host = %params.host, "connected to watch service");

    if let Some((username, password)) = settings.credentials() {
        let auth = format!("{username}:{password}");
        service.add_auth_info(DIGEST_SCHEME, auth.as_bytes())?;
        info!(username, "authenticated with watch service");
    }

    if !service.exists(&settings.root_path)? {
        service.create_persistent(&settings.root_path, true)?;
        info!(root = %settings.root_path, "created root namespace node");
    }
    Ok(service)
}
