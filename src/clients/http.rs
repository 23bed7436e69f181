use crate::clients::backend::{Backend, BackendError, FunctionReply};
use crate::constants::{APP_USER_AGENT, PROFILES_TABLE};
use crate::models::{Identity, NewProfile, Profile, ProfileChanges, Session, SignUpResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,

    pub anon_key: SecretString,

    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,

    #[serde(default)]
    refresh_token: Option<String>,

    user: Identity,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(token.access_token),
            refresh_token: token.refresh_token.map(SecretString::from),
            user: token.user,
        }
    }
}

/// Error payloads differ between the auth, rest and function endpoints; this
/// covers all of them.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,

    #[serde(default)]
    code: Option<Value>,

    #[serde(default)]
    error: Option<String>,

    #[serde(default)]
    error_description: Option<String>,

    #[serde(default)]
    msg: Option<String>,

    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        self.error_code.clone().or_else(|| match &self.code {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        })
    }

    fn message(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }
}

/// Maps a failed response to a [`BackendError`].
fn classify(status: StatusCode, body: &ErrorBody) -> BackendError {
    let code = body.code().unwrap_or_default();
    let error = body.error.clone().unwrap_or_default();
    let message = body.message();
    let lower = message.to_lowercase();

    if code == "email_not_confirmed" || lower.contains("email not confirmed") {
        return BackendError::EmailNotConfirmed;
    }

    if code == "invalid_credentials"
        || error == "invalid_grant"
        || lower.contains("invalid login credentials")
    {
        return BackendError::InvalidCredentials;
    }

    if code == "user_already_exists"
        || code == "email_exists"
        || lower.contains("already registered")
    {
        return BackendError::UserAlreadyExists;
    }

    if code == "42501" || lower.contains("row-level security") || lower.contains("permission denied")
    {
        return BackendError::PermissionDenied(message);
    }

    if code == "23505" || status == StatusCode::CONFLICT {
        return BackendError::Conflict(message);
    }

    match status {
        StatusCode::UNAUTHORIZED => BackendError::NotAuthenticated,
        StatusCode::FORBIDDEN => BackendError::PermissionDenied(message),
        _ => BackendError::Api {
            status: status.as_u16(),
            message: if message.is_empty() {
                status.to_string()
            } else {
                message
            },
        },
    }
}

async fn error_from(response: Response) -> BackendError {
    let status = response.status();
    let body: ErrorBody = match response.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|_| ErrorBody {
            message: Some(text),
            ..ErrorBody::default()
        }),
        Err(e) => return BackendError::from(e),
    };
    classify(status, &body)
}

async fn expect_success(response: Response) -> Result<Response, BackendError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from(response).await)
    }
}

/// HTTP client for the hosted identity service (`/auth/v1`), its REST data
/// API (`/rest/v1`) and server functions (`/functions/v1`).
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    anon_key: SecretString,
    session: RwLock<Option<Session>>,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let mut base_url = Url::parse(config.base_url.trim())
            .map_err(|e| BackendError::Decode(format!("invalid backend URL: {e}")))?;

        // join() would drop the last segment otherwise
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder().user_agent(APP_USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            anon_key: config.anon_key,
            session: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Decode(format!("invalid endpoint {path}: {e}")))
    }

    fn profiles_url(&self) -> Result<Url, BackendError> {
        self.endpoint(&format!("rest/v1/{PROFILES_TABLE}"))
    }

    /// Adds `apikey` and the bearer: the session token when signed in,
    /// otherwise the anon key.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = match self.session.read().await.as_ref() {
            Some(session) => session.bearer(),
            None => format!("Bearer {}", self.anon_key.expose_secret()),
        };

        request
            .header("apikey", self.anon_key.expose_secret())
            .header("Authorization", bearer)
    }

    async fn store_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let request = self
            .client
            .post(url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&json!({ "email": email, "password": password.expose_secret() }));

        let response = expect_success(request.send().await?).await?;
        let token: TokenResponse = response.json().await?;
        let session = Session::from(token);

        debug!(user_id = %session.user_id(), "Signed in");
        self.store_session(Some(session.clone())).await;

        Ok(session)
    }

    #[instrument(skip(self, password))]
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpResult, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;

        let request = self
            .client
            .post(url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&json!({ "email": email, "password": password.expose_secret() }));

        let response = expect_success(request.send().await?).await?;
        let body: Value = response.json().await?;

        // With confirmations on, an existing address gets an obfuscated user
        // that has no identities.
        let user_value = body.get("user").cloned().unwrap_or_else(|| body.clone());
        if user_value
            .get("identities")
            .and_then(Value::as_array)
            .is_some_and(Vec::is_empty)
        {
            return Err(BackendError::UserAlreadyExists);
        }

        let session = if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)
                .map_err(|e| BackendError::Decode(e.to_string()))?;
            Some(Session::from(token))
        } else {
            None
        };

        let user = match &session {
            Some(s) => s.user.clone(),
            None => serde_json::from_value(user_value)
                .map_err(|e| BackendError::Decode(e.to_string()))?,
        };

        if session.is_some() {
            self.store_session(session.clone()).await;
        }

        Ok(SignUpResult { user, session })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .client
            .post(url)
            .header("apikey", self.anon_key.expose_secret())
            .header("Authorization", session.bearer())
            .send()
            .await?;

        // An expired token is as good as signed out
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        expect_success(response).await.map(|_| ())
    }

    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(session) = self.session.read().await.clone() else {
            return Ok(None);
        };

        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .client
            .get(url)
            .header("apikey", self.anon_key.expose_secret())
            .header("Authorization", session.bearer())
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            warn!(user_id = %session.user_id(), "Stored session was rejected");
            self.store_session(None).await;
            return Ok(None);
        }

        let user: Identity = expect_success(response).await?.json().await?;
        Ok(Some(Session { user, ..session }))
    }

    #[instrument(skip(self, new_password))]
    async fn update_password(&self, new_password: &SecretString) -> Result<(), BackendError> {
        let Some(session) = self.session.read().await.clone() else {
            return Err(BackendError::NotAuthenticated);
        };

        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .client
            .put(url)
            .header("apikey", self.anon_key.expose_secret())
            .header("Authorization", session.bearer())
            .json(&json!({ "password": new_password.expose_secret() }))
            .send()
            .await?;

        expect_success(response).await.map(|_| ())
    }

    async fn resend_confirmation(&self, email: &str) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/resend")?;
        let response = self
            .client
            .post(url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await?;

        expect_success(response).await.map(|_| ())
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        let mut url = self.endpoint("auth/v1/recover")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);

        let response = self
            .client
            .post(url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&json!({ "email": email }))
            .send()
            .await?;

        expect_success(response).await.map(|_| ())
    }

    async fn fetch_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError> {
        let mut url = self.profiles_url()?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("id", &format!("eq.{id}"));

        let request = self.authorize(self.client.get(url)).await;
        let response = expect_success(request.send().await?).await?;
        let rows: Vec<Profile> = response.json().await?;

        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, row: &NewProfile) -> Result<(), BackendError> {
        let url = self.profiles_url()?;
        let request = self
            .authorize(self.client.post(url))
            .await
            .header("Prefer", "return=minimal")
            .json(row);

        expect_success(request.send().await?).await.map(|_| ())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<(), BackendError> {
        let mut url = self.profiles_url()?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        let request = self
            .authorize(self.client.patch(url))
            .await
            .header("Prefer", "return=minimal")
            .json(changes);

        expect_success(request.send().await?).await.map(|_| ())
    }

    async fn upsert_profile(&self, row: &NewProfile) -> Result<(), BackendError> {
        let mut url = self.profiles_url()?;
        url.query_pairs_mut().append_pair("on_conflict", "id");

        let request = self
            .authorize(self.client.post(url))
            .await
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row);

        expect_success(request.send().await?).await.map(|_| ())
    }

    async fn invoke_function(
        &self,
        name: &str,
        body: Value,
    ) -> Result<FunctionReply, BackendError> {
        let url = self.endpoint(&format!("functions/v1/{}", urlencoding::encode(name)))?;

        let request = self.authorize(self.client.post(url)).await.json(&body);
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        debug!(function = name, status, "Function replied");

        Ok(FunctionReply { status, body })
    }
}
