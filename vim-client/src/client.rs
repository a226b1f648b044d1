use crate::{
    error::{
        Result,
        VimError,
    },
    types::*,
};
use reqwest::{
    RequestBuilder,
    Response,
};
use serde::{
    de::DeserializeOwned,
    Serialize,
};
use serde_json::json;
use std::{
    fmt,
    time::Duration,
};
use url::Url;

/// Header carrying the session token on every authenticated request.
pub const SESSION_HEADER: &str = "vmware-api-session-id";

pub const DEFAULT_API_RELEASE: &str = "8.0.1.0";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Skip certificate validation of the endpoint.
    pub insecure: bool,
    /// API release segment of the request path, e.g. `8.0.1.0`.
    pub api_release: String,
    /// Upper bound for a single request.
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            insecure: false,
            api_release: DEFAULT_API_RELEASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Unauthenticated client for one endpoint. Call [`VimClient::login`] to obtain a [`VimSession`].
#[derive(Debug, Clone)]
pub struct VimClient {
    http: reqwest::Client,
    base: Url,
}

impl VimClient {
    /// Create a client for `endpoint`, e.g. `https://vcenter.example.com/sdk`.
    pub fn new(endpoint: &Url, options: &ClientOptions) -> Result<Self> {
        let mut base = endpoint.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.path_segments_mut()
            .map_err(|_| VimError::InvalidEndpoint(endpoint.clone()))?
            .pop_if_empty()
            .extend(["vim25", options.api_release.as_str()]);

        if options.insecure {
            warn!(%endpoint, "certificate validation is disabled");
        }

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(options.insecure)
            .timeout(options.timeout)
            .build()?;

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` guarantees the base can carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn object_url(&self, object: &ManagedObjectReference, member: &str) -> Url {
        self.url(&[object.kind.as_str(), object.value.as_str(), member])
    }

    /// Fetch the root document. Does not require a session.
    pub async fn service_content(&self) -> Result<ServiceContent> {
        let url = self.url(&["ServiceInstance", "ServiceInstance", "content"]);
        debug!(%url, "fetching service content");
        let content: Option<ServiceContent> = decode(self.http.get(url).send().await?).await?;
        content.ok_or(VimError::MissingManager("service content"))
    }

    /// Authenticate and turn this client into a session.
    pub async fn login(self, user_name: &str, password: &str) -> Result<VimSession> {
        let content = self.service_content().await?;
        let manager = content
            .session_manager
            .clone()
            .ok_or(VimError::MissingManager("session manager"))?;

        let url = self.object_url(&manager, "Login");
        debug!(%url, user_name, "logging in");
        let response = self
            .http
            .post(url)
            .json(&json!({ "userName": user_name, "password": password }))
            .send()
            .await?;
        let response = check(response).await?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(VimError::MissingSessionId)?;
        let user: UserSession = serde_json::from_slice(&response.bytes().await?)?;

        info!(user = %user.user_name, server = %content.about.full_name, "session established");

        Ok(VimSession {
            client: self,
            session_id,
            content,
            user,
        })
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Authenticated session. The session token is fixed at login.
pub struct VimSession {
    client: VimClient,
    session_id: String,
    content: ServiceContent,
    user: UserSession,
}

impl fmt::Debug for VimSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VimSession")
            .field("base", &self.client.base.as_str())
            .field("user", &self.user.user_name)
            .finish_non_exhaustive()
    }
}

impl VimSession {
    pub fn content(&self) -> &ServiceContent {
        &self.content
    }

    pub fn user(&self) -> &UserSession {
        &self.user
    }

    fn manager(&self, manager: &Option<ManagedObjectReference>, name: &'static str) -> Result<ManagedObjectReference> {
        manager.clone().ok_or(VimError::MissingManager(name))
    }

    fn post(&self, object: &ManagedObjectReference, method: &str) -> RequestBuilder {
        let url = self.client.object_url(object, method);
        trace!(%url, "invoking method");
        self.client.http.post(url).header(SESSION_HEADER, &self.session_id)
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        object: &ManagedObjectReference,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        decode(self.post(object, method).json(body).send().await?).await
    }

    async fn invoke_void(&self, object: &ManagedObjectReference, method: &str) -> Result<()> {
        check(self.post(object, method).send().await?).await.map(|_| ())
    }

    async fn property<T: DeserializeOwned>(&self, object: &ManagedObjectReference, name: &str) -> Result<T> {
        let url = self.client.object_url(object, name);
        trace!(%url, "reading property");
        let response = self
            .client
            .http
            .get(url)
            .header(SESSION_HEADER, &self.session_id)
            .send()
            .await?;
        decode(response).await
    }

    /// Create a view over all objects of `kinds` below `container`.
    pub async fn create_container_view(
        &self,
        container: &ManagedObjectReference,
        kinds: &[&str],
        recursive: bool,
    ) -> Result<ManagedObjectReference> {
        let manager = self.manager(&self.content.view_manager, "view manager")?;
        let body = json!({ "container": container, "type": kinds, "recursive": recursive });
        self.invoke(&manager, "CreateContainerView", &body).await
    }

    /// Read `paths` of every `kind` object in `view`, following continuation tokens until the listing is
    /// complete.
    pub async fn retrieve_properties(
        &self,
        view: &ManagedObjectReference,
        kind: &str,
        paths: &[&str],
    ) -> Result<Vec<ObjectContent>> {
        let collector = &self.content.property_collector;
        let body = json!({
            "specSet": [{
                "_typeName": "PropertyFilterSpec",
                "propSet": [{ "_typeName": "PropertySpec", "type": kind, "pathSet": paths }],
                "objectSet": [{
                    "_typeName": "ObjectSpec",
                    "obj": view,
                    "skip": true,
                    "selectSet": [{
                        "_typeName": "TraversalSpec",
                        "name": "traverseEntities",
                        "type": "ContainerView",
                        "path": "view",
                        "skip": false
                    }]
                }]
            }],
            "options": { "_typeName": "RetrieveOptions" }
        });

        let mut objects = Vec::new();
        let mut page: Option<RetrieveResult> = self.invoke(collector, "RetrievePropertiesEx", &body).await?;
        while let Some(result) = page {
            objects.extend(result.objects);
            page = match result.token {
                Some(token) => {
                    debug!(retrieved = objects.len(), "continuing property retrieval");
                    self.invoke(collector, "ContinueRetrievePropertiesEx", &json!({ "token": token }))
                        .await?
                }
                None => None,
            };
        }
        Ok(objects)
    }

    pub async fn destroy_view(&self, view: &ManagedObjectReference) -> Result<()> {
        self.invoke_void(view, "DestroyView").await
    }

    /// The full counter catalog of the performance manager.
    pub async fn perf_counters(&self) -> Result<Vec<PerfCounterInfo>> {
        let manager = self.manager(&self.content.perf_manager, "performance manager")?;
        let counters: Option<Vec<PerfCounterInfo>> = self.property(&manager, "perfCounter").await?;
        Ok(counters.unwrap_or_default())
    }

    pub async fn query_perf(&self, specs: &[PerfQuerySpec]) -> Result<Vec<PerfEntityMetricBase>> {
        let manager = self.manager(&self.content.perf_manager, "performance manager")?;
        let metrics: Option<Vec<PerfEntityMetricBase>> =
            self.invoke(&manager, "QueryPerf", &json!({ "querySpec": specs })).await?;
        Ok(metrics.unwrap_or_default())
    }

    pub async fn logout(&self) -> Result<()> {
        let manager = self.manager(&self.content.session_manager, "session manager")?;
        self.invoke_void(&manager, "Logout").await?;
        debug!(user = %self.user.user_name, "logged out");
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(VimError::from_response_body(status, body))
}

/// Decode a JSON body. Methods returning nothing answer with an empty body, which decodes as `null`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = check(response).await?.bytes().await?;
    let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    Ok(serde_json::from_slice(bytes)?)
}
