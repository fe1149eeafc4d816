use crate::request::Credentials;
use log::warn;
use std::sync::Once;

const API_KEY_PREFIX: &str = "AKCp8";
const API_KEY_MINIMAL_LENGTH: usize = 73;

const API_KEY_HEADER: &str = "X-JFrog-Art-Api";

/// Whether the given secret syntactically looks like an API key.
pub fn is_api_key(key: &str) -> bool {
    key.starts_with(API_KEY_PREFIX) && key.len() >= API_KEY_MINIMAL_LENGTH
}

static API_KEY_TOKEN_WARNING: Once = Once::new();

/// Applies exactly one authentication scheme to the request, by priority:
/// API key with a user as basic auth, API key alone as the dedicated header,
/// access token as basic auth when it is really an API key, access token as
/// bearer auth, and finally user/password basic auth. Empty strings count
/// as absent.
pub(crate) fn apply_authentication(
    builder: reqwest::RequestBuilder,
    credentials: &Credentials,
) -> reqwest::RequestBuilder {
    let user = credentials.user.as_deref().unwrap_or("");
    let present = |secret: &&str| !secret.is_empty();
    if let Some(api_key) = credentials.api_key.as_deref().filter(present) {
        return if user.is_empty() {
            builder.header(API_KEY_HEADER, api_key)
        } else {
            builder.basic_auth(user, Some(api_key))
        };
    }
    if let Some(access_token) = credentials.access_token.as_deref().filter(present) {
        return if is_api_key(access_token) {
            API_KEY_TOKEN_WARNING.call_once(|| {
                warn!(
                    "The provided access token is an API key and will be used as a password in \
                     username/password authentication. To avoid this message in the future, \
                     please pass it as a password."
                );
            });
            builder.basic_auth(user, Some(access_token))
        } else {
            builder.bearer_auth(access_token)
        };
    }
    if let Some(password) = credentials.password.as_deref().filter(present) {
        return builder.basic_auth(user, Some(password));
    }
    builder
}
