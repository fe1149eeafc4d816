use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied predicate consulted before a retry-eligible response is
/// actually retried. All interceptors must agree for the retry to happen.
pub type PreRetryInterceptor = Arc<dyn Fn() -> bool + Send + Sync>;

/// Per-call request descriptor: extra headers, credentials and pre-retry
/// interceptors.
///
/// Cloneable on purpose: the concurrent download path clones it per chunk
/// because each chunk writes its own `Range` header.
#[derive(Clone, Default)]
pub struct RequestDetails {
    pub headers: HashMap<String, String>,
    pub credentials: Credentials,
    pub pre_retry_interceptors: Vec<PreRetryInterceptor>,
}

impl RequestDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_credentials(self, credentials: Credentials) -> Self {
        Self {
            credentials,
            ..self
        }
    }

    pub fn with_pre_retry_interceptor(
        mut self,
        interceptor: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        self.pre_retry_interceptors.push(Arc::new(interceptor));
        self
    }
}

impl fmt::Debug for RequestDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDetails")
            .field("headers", &self.headers)
            .field("credentials", &self.credentials)
            .field(
                "pre_retry_interceptors",
                &self.pre_retry_interceptors.len(),
            )
            .finish()
    }
}

/// Credentials for one of the supported authentication schemes.
///
/// Which scheme is applied is decided by [`crate::auth`]; at most one is
/// ever attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
}

impl Credentials {
    pub fn with_user(self, user: &str) -> Self {
        Self {
            user: Some(user.into()),
            ..self
        }
    }

    pub fn with_password(self, password: &str) -> Self {
        Self {
            password: Some(password.into()),
            ..self
        }
    }

    pub fn with_api_key(self, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..self
        }
    }

    pub fn with_access_token(self, access_token: &str) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..self
        }
    }
}
