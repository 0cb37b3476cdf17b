//! Unauthenticated half of the API: sign-in, CSRF token, upload domain.
//!
//! Async HTTP client using `reqwest` with a cookie store; the session
//! cookies set by the identity endpoint authorize every later call.

use crate::error::Error;
use crate::types::{CsrfBody, DispatcherBody, Envelope};
use crate::CSRF_TOKEN_LEN;

const DEFAULT_AUTH_URL: &str = "https://auth.mail.ru/cgi-bin/auth";
const DEFAULT_CLOUD_URL: &str = "https://cloud.mail.ru/api/v2/";

/// Substring present in the identity endpoint's reply only after a
/// successful sign-in. The endpoint answers 200 for bad passwords too.
const AUTH_SUCCESS_MARKER: &str = "\"storages\"";

/// Base URLs of the identity and cloud endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    /// Versioned API root. Always ends with `/`.
    pub cloud_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_URL, DEFAULT_CLOUD_URL)
    }
}

impl Endpoints {
    pub fn new(auth_url: impl Into<String>, cloud_url: impl Into<String>) -> Self {
        let mut cloud_url = cloud_url.into();
        if !cloud_url.ends_with('/') {
            cloud_url.push('/');
        }
        Self {
            auth_url: auth_url.into(),
            cloud_url,
        }
    }

    /// Joins an endpoint path onto the cloud API root.
    pub fn cloud(&self, endpoint: &str) -> String {
        format!("{}{}", self.cloud_url, endpoint.trim_start_matches('/'))
    }
}

/// Cloud API client bound to one account.
pub struct Client {
    pub(crate) http: reqwest::Client,
    pub(crate) endpoints: Endpoints,
    pub(crate) login: String,
}

impl Client {
    /// Creates a client for `login` (the full email address).
    pub fn new(login: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(concat!("cloudpush/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoints: Endpoints::default(),
            login: login.to_string(),
        })
    }

    /// Points the client at different endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Signs in with the account password.
    ///
    /// Success is judged by [`AUTH_SUCCESS_MARKER`] in the reply body, not by
    /// the status code alone.
    pub async fn authenticate(&self, password: &str) -> Result<(), Error> {
        let domain = self
            .login
            .split_once('@')
            .map(|(_, d)| d)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| Error::Auth(format!("login has no domain: {}", self.login)))?;
        let page = format!("{}?from=promo", self.endpoints.cloud_url);

        let resp = self
            .http
            .post(&self.endpoints.auth_url)
            .query(&[("lang", "ru_RU"), ("from", "authpopup")])
            .form(&[
                ("Login", self.login.as_str()),
                ("Password", password),
                ("Domain", domain),
                ("page", page.as_str()),
                ("new_auth_form", "1"),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        if !body.contains(AUTH_SUCCESS_MARKER) {
            return Err(Error::Auth(
                "credentials rejected or terms of service not yet accepted in a browser".into(),
            ));
        }

        tracing::debug!(login = %self.login, "signed in");
        Ok(())
    }

    /// Fetches the CSRF token for the signed-in session.
    pub async fn fetch_token(&self) -> Result<String, Error> {
        let body = self.get_json::<CsrfBody>("tokens/csrf", &[]).await?;
        let token = body.token;
        if token.len() != CSRF_TOKEN_LEN {
            return Err(Error::Protocol(format!(
                "CSRF token has length {}, expected {CSRF_TOKEN_LEN}",
                token.len()
            )));
        }
        Ok(token)
    }

    /// Asks the dispatcher which URL receives file bytes for this session.
    pub async fn resolve_upload_domain(&self, token: &str) -> Result<String, Error> {
        let body = self
            .get_json::<DispatcherBody>("dispatcher", &[("token", token)])
            .await?;
        body.upload
            .into_iter()
            .next()
            .map(|entry| entry.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::Protocol("dispatcher returned no upload domain".into()))
    }

    /// Performs a GET against the cloud API and unwraps the `body` envelope.
    pub(crate) async fn get_json<T>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.endpoints.cloud(endpoint);
        let resp = self.http.get(&url).query(params).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.body)
    }
}
