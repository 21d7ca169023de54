//! OpenID Connect (OIDC) integration
//!
//! Authorization code flow with PKCE, as used by the popup sign-in. Google is
//! the default provider, but any issuer that publishes a discovery document
//! works.

use serde::{Deserialize, Serialize};

use crate::{AuthError, AuthResult, AuthenticatedUser};

/// Google's OIDC issuer.
pub const GOOGLE_ISSUER_URL: &str = "https://accounts.google.com";

/// Prompt value that forces the account chooser on every sign-in.
pub const SELECT_ACCOUNT_PROMPT: &str = "select_account";

/// OpenID Connect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// The OIDC provider's issuer URL (e.g., "https://accounts.google.com")
    pub issuer_url: String,

    /// OAuth2 client ID
    pub client_id: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// Redirect URL the popup lands on after authentication
    pub redirect_url: String,

    /// Scopes to request (defaults to ["openid", "email", "profile"])
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// `prompt` parameter sent to the authorization endpoint
    #[serde(default = "default_prompt")]
    pub prompt: Option<String>,
}

fn default_scopes() -> Vec<String> {
    vec![
        "openid".to_string(),
        "email".to_string(),
        "profile".to_string(),
    ]
}

fn default_prompt() -> Option<String> {
    Some(SELECT_ACCOUNT_PROMPT.to_string())
}

impl OidcConfig {
    /// Create a new OIDC configuration
    pub fn new(
        issuer_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            scopes: default_scopes(),
            prompt: default_prompt(),
        }
    }

    /// Create a configuration for Google sign-in
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self::new(GOOGLE_ISSUER_URL, client_id, client_secret, redirect_url)
    }

    /// Set custom scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set or clear the prompt parameter
    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Load from environment variables
    ///
    /// The issuer defaults to Google when `AGENDA_OIDC_ISSUER_URL` is unset.
    pub fn from_env() -> AuthResult<Self> {
        let issuer_url = std::env::var("AGENDA_OIDC_ISSUER_URL")
            .unwrap_or_else(|_| GOOGLE_ISSUER_URL.to_string());

        let client_id = std::env::var("AGENDA_OIDC_CLIENT_ID")
            .map_err(|_| AuthError::Configuration("AGENDA_OIDC_CLIENT_ID not set".to_string()))?;

        let client_secret = std::env::var("AGENDA_OIDC_CLIENT_SECRET").map_err(|_| {
            AuthError::Configuration("AGENDA_OIDC_CLIENT_SECRET not set".to_string())
        })?;

        let redirect_url = std::env::var("AGENDA_OIDC_REDIRECT_URL").map_err(|_| {
            AuthError::Configuration("AGENDA_OIDC_REDIRECT_URL not set".to_string())
        })?;

        Ok(Self::new(issuer_url, client_id, client_secret, redirect_url))
    }
}

/// OIDC provider metadata (subset of fields we need)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcProviderMetadata {
    /// The issuer identifier
    pub issuer: String,

    /// URL of the authorization endpoint
    pub authorization_endpoint: String,

    /// URL of the token endpoint
    pub token_endpoint: String,

    /// URL of the userinfo endpoint
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,

    /// URL of the JWKS endpoint
    pub jwks_uri: String,
}

/// Token response from the OIDC provider
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The access token
    pub access_token: String,

    /// Token type (usually "Bearer")
    pub token_type: String,

    /// When the token expires (in seconds)
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// The ID token (JWT containing user claims)
    #[serde(default)]
    pub id_token: Option<String>,
}

/// User info from the OIDC provider
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    /// Subject identifier (unique user ID)
    pub sub: String,

    /// User's email address
    #[serde(default)]
    pub email: Option<String>,

    /// User's name
    #[serde(default)]
    pub name: Option<String>,

    /// User's given name (first name)
    #[serde(default)]
    pub given_name: Option<String>,

    /// User's family name (last name)
    #[serde(default)]
    pub family_name: Option<String>,

    /// URL to user's profile picture
    #[serde(default)]
    pub picture: Option<String>,
}

impl UserInfo {
    /// Convert to an authenticated user
    pub fn to_authenticated_user(&self) -> AuthenticatedUser {
        let name = self.name.clone().or_else(|| {
            self.given_name.as_ref().map(|given| match &self.family_name {
                Some(family) => format!("{} {}", given, family),
                None => given.clone(),
            })
        });

        AuthenticatedUser {
            id: self.sub.clone(),
            email: self.email.clone(),
            name,
            picture: self.picture.clone(),
        }
    }
}

/// A pending sign-in: CSRF state and PKCE verifier
///
/// Identity comes from the userinfo endpoint rather than the ID token, so no
/// nonce is requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationState {
    /// CSRF token echoed back by the provider
    pub state: String,

    /// PKCE code verifier
    pub code_verifier: String,

    /// Unix timestamp when this state was created
    pub created_at: i64,
}

impl AuthorizationState {
    /// Create new authorization state
    pub fn new() -> Self {
        Self {
            state: generate_random_string(32),
            code_verifier: generate_random_string(64),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Check if this state is older than `max_age_secs`
    pub fn is_expired(&self, max_age_secs: i64) -> bool {
        let now = chrono::Utc::now().timestamp();
        now - self.created_at > max_age_secs
    }

    /// PKCE code challenge (S256)
    pub fn code_challenge(&self) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(self.code_verifier.as_bytes());
        base64_url_encode(&hash)
    }
}

impl Default for AuthorizationState {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_random_string(len: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    URL_SAFE_NO_PAD.encode(data)
}

/// Builds the URLs and parameters of the authorization code flow.
///
/// Performs no I/O; see [`OidcClient`] for the HTTP side.
#[derive(Debug, Clone)]
pub struct OidcAuth {
    config: OidcConfig,
    metadata: OidcProviderMetadata,
}

impl OidcAuth {
    /// Create from a configuration and already discovered metadata
    pub fn new(config: OidcConfig, metadata: OidcProviderMetadata) -> Self {
        Self { config, metadata }
    }

    /// Get the discovery URL for an issuer
    pub fn discovery_url(issuer_url: &str) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            issuer_url.trim_end_matches('/')
        )
    }

    /// Get the current configuration
    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// Get the provider metadata
    pub fn metadata(&self) -> &OidcProviderMetadata {
        &self.metadata
    }

    /// Build the URL the sign-in popup opens, using the configured prompt
    pub fn authorization_url(&self, state: &AuthorizationState) -> AuthResult<String> {
        self.authorization_url_with_prompt(state, self.config.prompt.as_deref())
    }

    /// Build the popup URL with an explicit `prompt` value
    pub fn authorization_url_with_prompt(
        &self,
        state: &AuthorizationState,
        prompt: Option<&str>,
    ) -> AuthResult<String> {
        let mut url = url::Url::parse(&self.metadata.authorization_endpoint)
            .map_err(|e| AuthError::Oidc(format!("Invalid authorization endpoint: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_url);
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", &state.state);
            query.append_pair("code_challenge", &state.code_challenge());
            query.append_pair("code_challenge_method", "S256");
            if let Some(prompt) = prompt {
                query.append_pair("prompt", prompt);
            }
        }

        Ok(url.to_string())
    }

    /// Build token request parameters for an authorization code
    pub fn token_request_params(
        &self,
        code: &str,
        state: &AuthorizationState,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", self.config.redirect_url.clone()),
            ("client_id", self.config.client_id.clone()),
            ("client_secret", self.config.client_secret.clone()),
            ("code_verifier", state.code_verifier.clone()),
        ]
    }

    /// Get the userinfo endpoint URL
    pub fn userinfo_endpoint(&self) -> AuthResult<&str> {
        self.metadata
            .userinfo_endpoint
            .as_deref()
            .ok_or_else(|| AuthError::Oidc("Userinfo endpoint not available".to_string()))
    }
}

/// OIDC client that talks to the provider over HTTP
#[derive(Debug, Clone)]
pub struct OidcClient {
    auth: OidcAuth,
    http: reqwest::Client,
}

impl OidcClient {
    /// Fetch the provider's discovery document and build a client
    pub async fn discover(config: OidcConfig) -> AuthResult<Self> {
        let http = reqwest::Client::new();
        let url = OidcAuth::discovery_url(&config.issuer_url);

        let response = http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AuthError::Oidc(format!(
                "Discovery at {} returned {}",
                url,
                response.status()
            )));
        }
        let metadata: OidcProviderMetadata = response.json().await?;

        tracing::info!(issuer = %metadata.issuer, "Loaded OIDC provider metadata");

        Ok(Self::with_metadata(config, metadata))
    }

    /// Build a client from known metadata
    pub fn with_metadata(config: OidcConfig, metadata: OidcProviderMetadata) -> Self {
        Self {
            auth: OidcAuth::new(config, metadata),
            http: reqwest::Client::new(),
        }
    }

    /// URL/parameter builder for this client
    pub fn auth(&self) -> &OidcAuth {
        &self.auth
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &AuthorizationState,
    ) -> AuthResult<TokenResponse> {
        let params = self.auth.token_request_params(code, state);
        let response = self
            .http
            .post(&self.auth.metadata().token_endpoint)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::SignInRejected(format!("{}: {}", status, body)));
        }

        Ok(response.json().await?)
    }

    /// Fetch the signed-in user's profile
    pub async fn fetch_user_info(&self, access_token: &str) -> AuthResult<UserInfo> {
        let response = self
            .http
            .get(self.auth.userinfo_endpoint()?)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Oidc(format!(
                "Userinfo endpoint returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Finish a sign-in: exchange the code and resolve the user
    pub async fn complete_sign_in(
        &self,
        code: &str,
        state: &AuthorizationState,
    ) -> AuthResult<AuthenticatedUser> {
        let tokens = self.exchange_code(code, state).await?;
        let info = self.fetch_user_info(&tokens.access_token).await?;
        let user = info.to_authenticated_user();

        tracing::info!(user_id = %user.id, "OIDC sign-in completed");

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn metadata_for(base: &str) -> OidcProviderMetadata {
        OidcProviderMetadata {
            issuer: base.to_string(),
            authorization_endpoint: format!("{}/authorize", base),
            token_endpoint: format!("{}/token", base),
            userinfo_endpoint: Some(format!("{}/userinfo", base)),
            jwks_uri: format!("{}/jwks", base),
        }
    }

    fn config_for(base: &str) -> OidcConfig {
        OidcConfig::new(base, "client-123", "secret-456", "https://app.example.com/callback")
    }

    #[test]
    fn test_google_config_defaults() {
        let config = OidcConfig::google("client-123", "secret-456", "https://app.example.com/cb");

        assert_eq!(config.issuer_url, GOOGLE_ISSUER_URL);
        assert_eq!(config.scopes, vec!["openid", "email", "profile"]);
        assert_eq!(config.prompt.as_deref(), Some(SELECT_ACCOUNT_PROMPT));
    }

    #[test]
    fn test_authorization_url_prompts_account_selection() {
        let auth = OidcAuth::new(
            config_for("https://idp.example.com"),
            metadata_for("https://idp.example.com"),
        );
        let state = AuthorizationState::new();

        let url = url::Url::parse(&auth.authorization_url(&state).unwrap()).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs["prompt"], "select_account");
        assert_eq!(pairs["state"], state.state);
        assert_eq!(pairs["code_challenge"], state.code_challenge());
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["scope"], "openid email profile");
        assert!(!pairs.contains_key("nonce"));
    }

    #[test]
    fn test_authorization_url_without_prompt() {
        let auth = OidcAuth::new(
            config_for("https://idp.example.com").with_prompt(None),
            metadata_for("https://idp.example.com"),
        );

        let url = auth.authorization_url(&AuthorizationState::new()).unwrap();
        assert!(!url.contains("prompt="));
    }

    #[test]
    fn test_authorization_state_expiry() {
        let mut state = AuthorizationState::new();
        assert!(!state.is_expired(600));

        state.created_at = chrono::Utc::now().timestamp() - 1000;
        assert!(state.is_expired(600));
    }

    #[test]
    fn test_pkce_code_challenge() {
        let state = AuthorizationState::new();
        // base64url SHA-256 without padding
        assert_eq!(state.code_challenge().len(), 43);
        assert_ne!(state.code_challenge(), state.code_verifier);
    }

    #[test]
    fn test_user_info_fallback_name() {
        let info = UserInfo {
            sub: "google-456".to_string(),
            email: Some("joao@example.com".to_string()),
            name: None,
            given_name: Some("João".to_string()),
            family_name: Some("Silva".to_string()),
            picture: Some("https://example.com/p.png".to_string()),
        };

        let user = info.to_authenticated_user();
        assert_eq!(user.id, "google-456");
        assert_eq!(user.name.as_deref(), Some("João Silva"));
        assert_eq!(user.picture.as_deref(), Some("https://example.com/p.png"));
    }

    #[tokio::test]
    async fn test_discover_and_complete_sign_in() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(metadata_for(&base)))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "google-789",
                "email": "ana@example.com",
                "name": "Ana"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OidcClient::discover(config_for(&base)).await.unwrap();
        let state = AuthorizationState::new();
        let user = client.complete_sign_in("auth-code", &state).await.unwrap();

        assert_eq!(user.id, "google-789");
        assert_eq!(user.email.as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn test_rejected_code_exchange() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let client = OidcClient::with_metadata(config_for(&base), metadata_for(&base));
        let err = client
            .exchange_code("stale", &AuthorizationState::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::SignInRejected(msg) if msg.contains("invalid_grant")));
    }
}
