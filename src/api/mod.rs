pub mod endpoint;
pub mod error;
pub mod response;

use crate::model;
use chrono::NaiveDate;
pub use error::Error;
use reqwest::cookie::Jar;
use reqwest::{Client, RequestBuilder, Response};
use response::aggregate::EchartAggregate;
use response::last_value::LastValue;
use response::system_config::SystemDescription;
use serde::de::DeserializeOwned;
use serde_json::Value;

use std::sync::Arc;
use std::time::Duration;

const CSRF_MARKER: &str = "TIGO_CSRF_TOKEN";
const SESSION_COOKIE: &str = "wssJwt";
const MAX_REDIRECTS: usize = 10;

/// Build a client over the shared cookie `jar`. Redirects are not followed
/// automatically: login follows them itself to see every `Set-Cookie` on the way.
pub fn client(jar: Arc<Jar>, timeout: Duration) -> Result<Client, Error> {
    reqwest::ClientBuilder::new()
        .cookie_provider(jar)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
        .or(Err(Error::InternalError))
}

/// Text between the first pair of double quotes following `marker` on `line`.
fn quoted_value<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = &line[line.find(marker)? + marker.len()..];
    let mut parts = rest.splitn(3, '"');
    parts.next()?;
    let value = parts.next()?;
    parts.next().map(|_| value)
}

/// Scan the login page for the CSRF token assignment.
pub fn extract_csrf_token(html: &str) -> Result<String, Error> {
    html.lines()
        .find_map(|line| quoted_value(line, CSRF_MARKER))
        .map(String::from)
        .ok_or_else(|| {
            Error::ProtocolError(format!("No {} found in login page", CSRF_MARKER))
        })
}

fn session_cookie(response: &Response) -> Option<model::SessionCookie> {
    response
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| model::SessionCookie {
            value: String::from(cookie.value()),
            max_age: cookie.max_age(),
        })
}

/// Follow redirects by hand, keeping the last session cookie set anywhere on the way.
async fn follow_redirects(
    client: &Client,
    mut response: Response,
) -> Result<(Response, Option<model::SessionCookie>), Error> {
    let mut cookie = None;

    for _ in 0..MAX_REDIRECTS {
        if let Some(found) = session_cookie(&response) {
            cookie = Some(found);
        }
        if !response.status().is_redirection() {
            return Ok((response, cookie));
        }

        let location = response
            .headers()
            .get(http::header::LOCATION)
            .and_then(|location| location.to_str().ok())
            .map(String::from);
        let location = match location {
            Some(location) => location,
            None => return Ok((response, cookie)),
        };
        let next = response.url().join(&location).map_err(|e| {
            Error::ProtocolError(format!("Invalid redirect to {}: {}", location, e))
        })?;

        log::debug!("Following redirect ({}) to {}", response.status(), next);
        response = client.get(next).send().await.map_err(map_api_err)?;
    }

    Err(Error::ProtocolError(format!(
        "More than {} redirects during login",
        MAX_REDIRECTS
    )))
}

/// Map Non-200 API response to Error
fn map_api_err(error: reqwest::Error) -> Error {
    match error.status() {
        Some(http::StatusCode::UNAUTHORIZED) | Some(http::StatusCode::FORBIDDEN) => {
            Error::AuthError(error.to_string())
        }
        _ => Error::ApiError(error.to_string()),
    }
}

async fn read_text(response: Response) -> Result<String, Error> {
    response
        .text()
        .await
        .map_err(|e| Error::ApiError(format!("Error reading API response: {}", e)))
}

fn parse<T: DeserializeOwned>(text: String) -> Result<T, Error> {
    log::trace!("response_text: {}", text);
    serde_json::from_str::<T>(&text).map_err(|e| Error::InvalidResponse(text, e.to_string()))
}

async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, Error> {
    let response = request
        .send()
        .await
        .map_err(map_api_err)?
        .error_for_status()
        .map_err(map_api_err)?;

    parse(read_text(response).await?)
}

/// Scrape-style web login: fetch the CSRF token, post the login form and pick the
/// session cookie from any response of the redirect chain.
pub async fn login(
    client: &Client,
    api_url: &str,
    credentials: &model::Credentials,
) -> Result<model::SessionCookie, Error> {
    let url = format!("{}{}", api_url, endpoint::LOGIN);

    let page = client.get(url.clone()).send().await.map_err(map_api_err)?;
    let (page, _) = follow_redirects(client, page).await?;
    let csrf = extract_csrf_token(&read_text(page).await?)?;

    let form = [
        ("_csrf", csrf),
        ("LoginFormModel[login]", credentials.username.to_owned()),
        ("LoginFormModel[password]", credentials.password.to_owned()),
        ("LoginFormModel[remember_me]", String::from("0")),
    ];

    let response = client
        .post(url)
        .form(&form)
        .send()
        .await
        .map_err(map_api_err)?;
    let (response, cookie) = follow_redirects(client, response).await?;

    let status = response.status();
    if !status.is_success() {
        log::error!("Login request failed (server responded {})", status);
    }

    cookie.ok_or_else(|| {
        Error::AuthError(format!(
            "No {} received (server responded {})",
            SESSION_COOKIE, status
        ))
    })
}

/// System description; authenticated through the session cookie in the jar.
pub async fn system_config(
    client: &Client,
    api_url: &str,
    system_id: &str,
) -> Result<SystemDescription, Error> {
    let url = format!("{}{}", api_url, endpoint::system_config(system_id));
    get_json(client.get(url)).await
}

/// Day's aggregate energy, kept raw so it can be stored verbatim. Transport
/// failures and non-success statuses are reported as `AuthOrNetworkError`.
pub async fn aggregate_energy(
    client: &Client,
    api_url: &str,
    auth: &model::AuthHeader,
    system_id: &str,
    date: NaiveDate,
) -> Result<Value, Error> {
    let url = format!("{}{}", api_url, endpoint::aggregate_energy(system_id, date));

    let response = auth
        .apply(client.get(url))
        .send()
        .await
        .map_err(|e| Error::AuthOrNetworkError(e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::AuthOrNetworkError(format!(
            "Aggregate energy request failed (server responded {})",
            response.status()
        )));
    }

    parse(read_text(response).await?)
}

pub async fn last_value(
    client: &Client,
    api_url: &str,
    auth: &model::AuthHeader,
    system_id: &str,
    date: NaiveDate,
    metric: &str,
    fingerprint: &str,
) -> Result<LastValue, Error> {
    let url = format!(
        "{}{}",
        api_url,
        endpoint::last_value(system_id, date, metric, fingerprint)
    );
    get_json(auth.apply(client.get(url))).await
}

pub async fn aggregate_summary(
    client: &Client,
    api_url: &str,
    auth: &model::AuthHeader,
    system_id: &str,
    date: NaiveDate,
    agg: &str,
) -> Result<EchartAggregate, Error> {
    let url = format!("{}{}", api_url, endpoint::aggregate(system_id, date, agg));
    get_json(auth.apply(client.get(url))).await
}
