use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BackendError, Error};
use crate::session::{AuthBackend, RegisterRequest};
use crate::types::{Identity, SessionToken};

/// `Authorization` header scheme for authenticated requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// `Authorization: Token <key>`, the dashboard backend's token auth.
    #[default]
    Token,
    /// `Authorization: Bearer <token>`.
    Bearer,
}

impl AuthScheme {
    fn header_value(self, token: &SessionToken) -> String {
        let scheme = match self {
            Self::Token => "Token",
            Self::Bearer => "Bearer",
        };
        format!("{scheme} {}", token.expose())
    }
}

impl std::str::FromStr for AuthScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "bearer" => Ok(Self::Bearer),
            other => Err(Error::Config(format!("unknown auth scheme: {other}"))),
        }
    }
}

/// Dashboard auth API endpoints.
///
/// The base URL is the only required field; endpoint URLs are derived from
/// it and can be overridden individually.
///
/// ```rust,ignore
/// let config = BackendConfig::new("http://127.0.0.1:8000/api/auth/".parse()?)?
///     .with_auth_scheme(AuthScheme::Bearer);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct BackendConfig {
    pub(crate) login_url: Url,
    pub(crate) register_url: Url,
    pub(crate) profile_url: Url,
    pub(crate) logout_url: Url,
    pub(crate) auth_scheme: AuthScheme,
}

impl BackendConfig {
    /// Derive `login/`, `register/`, `profile/` and `logout/` from `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `base_url` cannot be a base (e.g. `mailto:`).
    pub fn new(mut base_url: Url) -> Result<Self, Error> {
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("{base_url} cannot be a base URL")));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let join = |endpoint: &str| {
            base_url
                .join(endpoint)
                .map_err(|e| Error::Config(format!("{endpoint}: {e}")))
        };
        Ok(Self {
            login_url: join("login/")?,
            register_url: join("register/")?,
            profile_url: join("profile/")?,
            logout_url: join("logout/")?,
            auth_scheme: AuthScheme::default(),
        })
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `DASHBOARD_API_URL`: base URL of the auth API (e.g. `https://host/api/auth/`)
    ///
    /// # Optional env vars
    /// - `DASHBOARD_AUTH_SCHEME`: `token` (default) or `bearer`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is missing or invalid, or the
    /// scheme is unknown.
    pub fn from_env() -> Result<Self, Error> {
        let base = std::env::var("DASHBOARD_API_URL")
            .map_err(|_| Error::Config("DASHBOARD_API_URL is required".into()))?;
        let base: Url = base
            .parse()
            .map_err(|e| Error::Config(format!("DASHBOARD_API_URL: {e}")))?;

        let mut config = Self::new(base)?;
        if let Ok(scheme) = std::env::var("DASHBOARD_AUTH_SCHEME") {
            config = config.with_auth_scheme(scheme.parse()?);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_login_url(mut self, url: Url) -> Self {
        self.login_url = url;
        self
    }

    #[must_use]
    pub fn with_register_url(mut self, url: Url) -> Self {
        self.register_url = url;
        self
    }

    #[must_use]
    pub fn with_profile_url(mut self, url: Url) -> Self {
        self.profile_url = url;
        self
    }

    #[must_use]
    pub fn with_logout_url(mut self, url: Url) -> Self {
        self.logout_url = url;
        self
    }

    #[must_use]
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    #[must_use]
    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    #[must_use]
    pub fn register_url(&self) -> &Url {
        &self.register_url
    }

    #[must_use]
    pub fn profile_url(&self) -> &Url {
        &self.profile_url
    }

    #[must_use]
    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    #[must_use]
    pub fn auth_scheme(&self) -> AuthScheme {
        self.auth_scheme
    }
}

/// reqwest implementation of [`AuthBackend`].
pub struct HttpBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// Login reply. The backend nests the token under `data`; a top-level
/// `token` is accepted too.
#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    data: Option<TokenData>,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize)]
struct TokenData {
    token: String,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for timeouts, proxies or connection reuse).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, BackendError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            operation,
            status,
            detail,
        })
    }
}

impl AuthBackend for HttpBackend {
    async fn login(&self, username: &str, password: &str) -> Result<SessionToken, BackendError> {
        let response = self
            .http
            .post(self.config.login_url.clone())
            .json(&LoginBody { username, password })
            .send()
            .await?;

        let response = Self::ensure_success(response, "login").await?;
        let body = response.json::<LoginResponse>().await?;
        body.data
            .map(|d| d.token)
            .or(body.token)
            .filter(|t| !t.is_empty())
            .map(SessionToken::new)
            .ok_or_else(|| BackendError::Decode {
                operation: "login",
                detail: "missing token".into(),
            })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.config.register_url.clone())
            .json(request)
            .send()
            .await?;

        Self::ensure_success(response, "register").await?;
        Ok(())
    }

    async fn profile(&self, token: &SessionToken) -> Result<Identity, BackendError> {
        let response = self
            .http
            .get(self.config.profile_url.clone())
            .header(AUTHORIZATION, self.config.auth_scheme.header_value(token))
            .send()
            .await?;

        let response = Self::ensure_success(response, "profile request").await?;
        response.json::<Identity>().await.map_err(Into::into)
    }

    async fn logout(&self, token: &SessionToken) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.config.logout_url.clone())
            .header(AUTHORIZATION, self.config.auth_scheme.header_value(token))
            .send()
            .await?;

        Self::ensure_success(response, "logout").await?;
        Ok(())
    }
}
