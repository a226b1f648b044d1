use crate::{
    error::GatherError,
    service::{
        cancellable,
        PerfService,
    },
};
use tokio_util::sync::CancellationToken;
use url::Url;
use vsphere_stats_config::Password;
use vsphere_vim_client::{
    ClientOptions,
    VimClient,
    VimError,
    VimSession,
};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Password,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Password) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Authenticated connection to the management endpoint, used read-only for the rest of the run.
#[derive(Debug)]
pub struct Session {
    vim: VimSession,
}

impl Session {
    pub(crate) fn vim(&self) -> &VimSession {
        &self.vim
    }

    pub fn user_name(&self) -> &str {
        &self.vim.user().user_name
    }
}

/// Log in to `endpoint`. Rejected credentials surface as [`GatherError::Authentication`], anything
/// that keeps the endpoint from answering as [`GatherError::Connection`].
#[tracing::instrument(skip_all, fields(%endpoint, username = %credentials.username))]
pub async fn connect(
    endpoint: &Url,
    credentials: &Credentials,
    options: &ClientOptions,
    cancel: &CancellationToken,
) -> Result<Session, GatherError> {
    let client = VimClient::new(endpoint, options).map_err(|err| classify(endpoint, err))?;
    let vim = cancellable(cancel, client.login(&credentials.username, credentials.password.expose()))
        .await?
        .map_err(|err| classify(endpoint, err))?;
    Ok(Session { vim })
}

/// Log out, best-effort. Failures are logged and cancellation abandons the call; either way the
/// session expires on the server.
pub async fn disconnect<S>(service: &S, cancel: &CancellationToken)
where
    S: PerfService + ?Sized,
{
    match cancellable(cancel, service.logout()).await {
        Ok(Ok(())) => debug!("session closed"),
        Ok(Err(err)) => warn!("failed to log out: {err}"),
        Err(_) => debug!("skipped logout after cancellation"),
    }
}

fn classify(endpoint: &Url, cause: VimError) -> GatherError {
    let endpoint = endpoint.to_string();
    if cause.is_authentication() {
        GatherError::Authentication { endpoint, cause }
    } else {
        GatherError::Connection { endpoint, cause }
    }
}
