//! Bearer-token request interception.

use nhost_auth::AccessTokenProvider;
use std::sync::Arc;

/// Attaches the current access token to outgoing requests.
///
/// The provider is consulted per request, so a token rotated by a refresh is
/// picked up automatically. When no token is held the request is forwarded
/// unauthenticated; this never blocks on a refresh in progress.
#[derive(Clone)]
pub struct AuthInterceptor {
    provider: Arc<dyn AccessTokenProvider>,
}

impl AuthInterceptor {
    pub fn new(provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self { provider }
    }

    /// Decorate a request with `Authorization: Bearer <token>` if available.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.provider.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedToken(Option<&'static str>);

    impl AccessTokenProvider for FixedToken {
        fn access_token(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn attaches_bearer_header_when_token_is_held() {
        let interceptor = AuthInterceptor::new(Arc::new(FixedToken(Some("token-123"))));
        let http = reqwest::Client::new();

        let request = interceptor
            .apply(http.post("https://example.com/v1/graphql"))
            .build()
            .unwrap();

        let header = request.headers().get(reqwest::header::AUTHORIZATION);
        assert_eq!(header.unwrap().to_str().unwrap(), "Bearer token-123");
    }

    #[test]
    fn forwards_unauthenticated_when_signed_out() {
        let interceptor = AuthInterceptor::new(Arc::new(FixedToken(None)));
        let http = reqwest::Client::new();

        let request = interceptor
            .apply(http.post("https://example.com/v1/graphql"))
            .build()
            .unwrap();

        assert!(request
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .is_none());
    }
}
