//! Session cache for the portal web login.
//!
//! The portal has no token endpoint: a session is obtained by scraping the login
//! page for its CSRF token, posting the login form and keeping the `wssJwt`
//! cookie. The cookie doubles as bearer token for the JSON API.

use crate::api::{self, Error};
use crate::model::{AuthHeader, Credentials, Session, SystemDescription};
use chrono::{DateTime, Utc};
use reqwest::cookie::Jar;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Sessions are refreshed this many hours before the cookie's max-age runs out.
pub const EXPIRY_MARGIN_HOURS: i64 = 1;

pub struct SessionCache {
    api_url: String,
    credentials: Credentials,
    timeout: Duration,
    jar: Arc<Jar>,
    session: Option<Session>,
    system: OnceLock<SystemDescription>,
}

impl SessionCache {
    pub fn new(api_url: &str, credentials: Credentials, timeout: Duration) -> Self {
        SessionCache {
            api_url: api_url.trim_end_matches('/').to_owned(),
            credentials,
            timeout,
            jar: Arc::new(Jar::default()),
            session: None,
            system: OnceLock::new(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn system_id(&self) -> &str {
        &self.credentials.system_id
    }

    /// Client scoped to one logical operation, sharing the session cookies.
    pub fn client(&self) -> Result<reqwest::Client, Error> {
        api::client(self.jar.clone(), self.timeout)
    }

    /// Expiry of the cached session, if there is one.
    pub fn session_expiry(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref().map(|session| session.expires_at)
    }

    /// Return the bearer header, logging in first unless the cached session is
    /// still valid.
    pub async fn get_auth_header(&mut self) -> Result<AuthHeader, Error> {
        let now = Utc::now();
        if let Some(session) = self.session.as_ref().filter(|s| s.is_valid_at(now)) {
            return Ok(AuthHeader {
                token: session.token.to_owned(),
            });
        }

        self.session = None;
        let session = self.login(now).await?;
        let header = AuthHeader {
            token: session.token.to_owned(),
        };
        self.session = Some(session);
        Ok(header)
    }

    /// Cached system description; `None` until the first login went through.
    pub fn get_system_description(&self) -> Option<&SystemDescription> {
        self.system.get()
    }

    pub async fn get_system_description_async(&mut self) -> Result<&SystemDescription, Error> {
        if self.system.get().is_none() {
            self.get_auth_header().await?;
        }
        self.system.get().ok_or(Error::NotReadyError)
    }

    /// Force the next `get_auth_header` to log in again.
    pub fn invalidate(&mut self) {
        if self.session.take().is_some() {
            log::info!("Portal session invalidated");
        }
    }

    async fn login(&self, now: DateTime<Utc>) -> Result<Session, Error> {
        log::info!("Logging in to {} as {}", self.api_url, self.credentials.username);
        let client = self.client()?;

        let cookie = api::login(&client, &self.api_url, &self.credentials).await?;

        let max_age = cookie
            .max_age
            .and_then(|max_age| chrono::Duration::from_std(max_age).ok())
            .unwrap_or_else(|| {
                log::warn!("Session cookie carries no max-age");
                chrono::Duration::zero()
            });
        let session = Session {
            token: cookie.value,
            expires_at: now + max_age - chrono::Duration::hours(EXPIRY_MARGIN_HOURS),
        };

        if self.system.get().is_none() {
            let system =
                api::system_config(&client, &self.api_url, &self.credentials.system_id).await?;
            log::info!(
                "Fetched system description with {} objects",
                system.system.objects.len()
            );
            let _ = self.system.set(system);
        }

        log::debug!("Session valid until {}", session.expires_at);
        Ok(session)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::testing::read_resource;
    use httpmock::prelude::*;
    use httpmock::Mock;

    pub(crate) const CSRF: &str = "c2NyYXBlZC1jc3JmLXRva2Vu";

    pub(crate) fn credentials() -> Credentials {
        Credentials {
            username: String::from("user@example.com"),
            password: String::from("secret"),
            system_id: String::from("42"),
        }
    }

    fn mock_system_config(server: &MockServer) -> Mock<'_> {
        server.mock(|when, then| {
            when.method(GET)
                .path("/system/summary/config")
                .query_param("system_id", "42")
                .query_param("resourceId", "config");
            then.status(200)
                .header("content-type", "application/json")
                .body(read_resource("config.json"));
        })
    }

    /// Mocks for login page, login form (redirecting to `/main`) and system config.
    pub(crate) fn mock_portal<'a>(
        server: &'a MockServer,
        token: &str,
        max_age: u64,
    ) -> (Mock<'a>, Mock<'a>, Mock<'a>) {
        let page = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .header("content-type", "text/html")
                .body(read_resource("login.html"));
        });
        let form = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_includes(format!("_csrf={}", CSRF))
                .body_includes("remember_me%5D=0");
            then.status(302)
                .header("location", "/main")
                .header(
                    "set-cookie",
                    format!("wssJwt={}; Max-Age={}; Path=/; HttpOnly", token, max_age),
                );
        });
        server.mock(|when, then| {
            when.method(GET).path("/main");
            then.status(200).body("<html>dashboard</html>");
        });
        let config = mock_system_config(server);
        (page, form, config)
    }

    fn cache(server: &MockServer) -> SessionCache {
        SessionCache::new(&server.base_url(), credentials(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn login_expiry_subtracts_margin() {
        let server = MockServer::start();
        let (_page, form, config) = mock_portal(&server, "jwt-1", 3600);
        let mut cache = cache(&server);

        let before = Utc::now();
        let header = cache.get_auth_header().await.unwrap();
        let after = Utc::now();

        assert_eq!("Bearer jwt-1", header.authorization());
        let expires_at = cache.session_expiry().unwrap();
        assert!(before <= expires_at && expires_at <= after);
        form.assert_calls(1);
        config.assert_calls(1);
    }

    #[tokio::test]
    async fn valid_session_is_reused() {
        let server = MockServer::start();
        let (page, form, _config) = mock_portal(&server, "jwt-1", 7200);
        let mut cache = cache(&server);

        let first = cache.get_auth_header().await.unwrap();
        let second = cache.get_auth_header().await.unwrap();

        assert_eq!(first, second);
        page.assert_calls(1);
        form.assert_calls(1);
    }

    #[tokio::test]
    async fn expired_session_logs_in_again() {
        let server = MockServer::start();
        let (_page, form, config) = mock_portal(&server, "jwt-1", 3600);
        let mut cache = cache(&server);

        cache.get_auth_header().await.unwrap();
        cache.get_auth_header().await.unwrap();

        form.assert_calls(2);
        // fetched once for the process lifetime
        config.assert_calls(1);
    }

    #[tokio::test]
    async fn invalidate_forces_login() {
        let server = MockServer::start();
        let (page, form, _config) = mock_portal(&server, "jwt-1", 7200);
        let mut cache = cache(&server);

        cache.get_auth_header().await.unwrap();
        cache.invalidate();
        assert_eq!(None, cache.session_expiry());
        cache.get_auth_header().await.unwrap();

        page.assert_calls(2);
        form.assert_calls(2);
    }

    #[tokio::test]
    async fn missing_csrf_marker() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("<html><body>maintenance</body></html>");
        });
        let form = server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200);
        });
        let mut cache = cache(&server);

        let result = cache.get_auth_header().await;

        assert!(matches!(result, Err(Error::ProtocolError(_))));
        form.assert_calls(0);
    }

    #[tokio::test]
    async fn rejected_credentials() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body(read_resource("login.html"));
        });
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(200).body("<html>Incorrect username or password</html>");
        });
        let mut cache = cache(&server);

        let result = cache.get_auth_header().await;

        assert!(matches!(result, Err(Error::AuthError(_))));
        assert_eq!(None, cache.session_expiry());
        assert!(cache.get_system_description().is_none());
    }

    #[tokio::test]
    async fn system_description_after_login() {
        let server = MockServer::start();
        let (_page, form, _config) = mock_portal(&server, "jwt-1", 7200);
        let mut cache = cache(&server);

        assert!(cache.get_system_description().is_none());
        let panels = cache.get_system_description_async().await.unwrap().panels();
        assert_eq!(2, panels.len());
        assert!(cache.get_system_description().is_some());

        cache.get_system_description_async().await.unwrap();
        form.assert_calls(1);
    }

    #[tokio::test]
    async fn session_cookie_on_redirect_target() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body(read_resource("login.html"));
        });
        let form = server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(302).header("location", "/main");
        });
        let target = server.mock(|when, then| {
            when.method(GET).path("/main");
            then.status(200)
                .header("set-cookie", "wssJwt=jwt-r; Max-Age=7200; Path=/")
                .body("<html>dashboard</html>");
        });
        mock_system_config(&server);
        let mut cache = cache(&server);

        let header = cache.get_auth_header().await.unwrap();

        assert_eq!("Bearer jwt-r", header.authorization());
        assert!(cache.session_expiry().unwrap() > Utc::now());
        form.assert_calls(1);
        target.assert_calls(1);
    }

    #[tokio::test]
    async fn redirected_login_page() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(302).header("location", "/login");
        });
        let page = server.mock(|when, then| {
            when.method(GET).path("/login");
            then.status(200).body(read_resource("login.html"));
        });
        let form = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_includes(format!("_csrf={}", CSRF));
            then.status(200)
                .header("set-cookie", "wssJwt=jwt-2; Max-Age=7200; Path=/");
        });
        mock_system_config(&server);
        let mut cache = cache(&server);

        let header = cache.get_auth_header().await.unwrap();

        assert_eq!("Bearer jwt-2", header.authorization());
        page.assert_calls(1);
        form.assert_calls(1);
    }

    #[tokio::test]
    async fn endless_redirects() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(302).header("location", "/");
        });
        let mut cache = cache(&server);

        let result = cache.get_auth_header().await;

        assert!(matches!(result, Err(Error::ProtocolError(_))));
    }
}
