//! Authenticated session: quota lookup, byte upload and metadata commits.

use std::path::Path;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;

use crate::client::Client;
use crate::decode::{UploadReceipt, decode_upload_response};
use crate::error::Error;
use crate::types::{CommitErrorBody, CommitOutcome, Envelope, SpaceBody};
use crate::{API_VERSION, CLOUD_DOMAIN_ORD, CONFLICT_POLICY, TIME_AMEND};

/// Characters escaped in the multipart file name (`quote_plus` minus `+`).
const FILE_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A signed-in client together with its CSRF token and upload domain.
///
/// Created once per run by [`Session::establish`] and dropped at the end.
pub struct Session {
    client: Client,
    token: String,
    upload_domain: String,
}

impl Session {
    /// Signs in, fetches the CSRF token and resolves the upload domain.
    pub async fn establish(client: Client, password: &str) -> Result<Self, Error> {
        client.authenticate(password).await?;
        let token = client.fetch_token().await?;
        let upload_domain = client.resolve_upload_domain(&token).await?;

        tracing::info!(login = %client.login, domain = %upload_domain, "session established");
        Ok(Self::from_parts(client, token, upload_domain))
    }

    /// Assembles a session from already obtained parts.
    pub fn from_parts(client: Client, token: String, upload_domain: String) -> Self {
        Self {
            client,
            token,
            upload_domain,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn upload_domain(&self) -> &str {
        &self.upload_domain
    }

    pub fn login(&self) -> &str {
        &self.client.login
    }

    /// Returns the free space left in the cloud, in bytes.
    pub async fn fetch_space(&self) -> Result<u64, Error> {
        let api = API_VERSION.to_string();
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let login = self.client.login.as_str();

        let body = self
            .client
            .get_json::<SpaceBody>(
                "user/space",
                &[
                    ("api", api.as_str()),
                    ("email", login),
                    ("x-email", login),
                    ("token", self.token.as_str()),
                    ("_", timestamp.as_str()),
                ],
            )
            .await?;
        Ok(body.free_bytes())
    }

    /// Uploads a file's bytes to the session's upload domain.
    ///
    /// The file is streamed from disk. Returns the content hash and size the
    /// service recorded; nothing is visible remotely until [`Self::add_file`].
    pub async fn upload_bytes(&self, path: &Path, content_type: &str) -> Result<UploadReceipt, Error> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let encoded = utf8_percent_encode(&file_name, FILE_NAME_SET).to_string();

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(ReaderStream::new(file)), len)
            .file_name(encoded)
            .mime_str(content_type)?;
        // The name is already encoded; stop reqwest from encoding it twice.
        let form = Form::new().percent_encode_noop().part("file", part);

        let fileapi = format!("fileapi{}{TIME_AMEND}", chrono::Utc::now().timestamp());
        let domain_ord = CLOUD_DOMAIN_ORD.to_string();
        let resp = self
            .client
            .http
            .post(&self.upload_domain)
            .query(&[
                ("cloud_domain", domain_ord.as_str()),
                ("x-email", self.client.login.as_str()),
                (fileapi.as_str(), ""),
            ])
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        let receipt = decode_upload_response(&body)?;
        tracing::debug!(path = %path.display(), hash = %receipt.hash, size = receipt.size, "bytes uploaded");
        Ok(receipt)
    }

    /// Registers uploaded content at `remote_path`.
    pub async fn add_file(&self, remote_path: &str, receipt: &UploadReceipt) -> Result<CommitOutcome, Error> {
        let size = receipt.size.to_string();
        self.commit(
            "file/add",
            remote_path,
            &[("hash", receipt.hash.as_str()), ("size", size.as_str())],
        )
        .await
    }

    /// Creates the remote folder `remote_path` if it does not exist yet.
    pub async fn ensure_folder(&self, remote_path: &str) -> Result<CommitOutcome, Error> {
        self.commit("folder/add", remote_path, &[]).await
    }

    /// Moves a remote file or folder to the recycle bin.
    pub async fn remove_object(&self, remote_path: &str) -> Result<CommitOutcome, Error> {
        self.commit("file/remove", remote_path, &[]).await
    }

    /// Posts the shared commit form plus endpoint-specific fields.
    async fn commit(
        &self,
        endpoint: &str,
        remote_path: &str,
        extra: &[(&str, &str)],
    ) -> Result<CommitOutcome, Error> {
        let api = API_VERSION.to_string();
        let login = self.client.login.as_str();

        let mut form: Vec<(&str, &str)> = vec![
            ("home", remote_path),
            ("conflict", CONFLICT_POLICY),
            ("token", self.token.as_str()),
            ("api", api.as_str()),
            ("email", login),
            ("x-email", login),
        ];
        form.extend_from_slice(extra);

        let url = self.client.endpoints.cloud(endpoint);
        let resp = self.client.http.post(&url).form(&form).send().await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        classify_commit(status.as_u16(), body).inspect(|outcome| {
            tracing::debug!(endpoint, home = remote_path, ?outcome, "commit accepted");
        })
    }
}

/// Error code the service uses when the object is already there.
const EXISTS_ERROR: &str = "exists";

/// Maps a commit reply to an outcome. A rejection whose `home` error code is
/// `exists` is success under the strict conflict policy; every other
/// rejection, including an unparseable one, is an error.
fn classify_commit(status: u16, body: String) -> Result<CommitOutcome, Error> {
    if (200..300).contains(&status) {
        return Ok(CommitOutcome::Created);
    }

    let code = serde_json::from_str::<Envelope<CommitErrorBody>>(&body)
        .ok()
        .and_then(|envelope| envelope.body.home_error().map(str::to_owned));
    match code.as_deref() {
        Some(EXISTS_ERROR) => Ok(CommitOutcome::AlreadyExists),
        _ => Err(Error::Api { status, body }),
    }
}
