use log::debug;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use urlencoding::encode;

use crate::error::PortalError;
use crate::models::{LoginCredentials, PortalSession};

// Marks a cookie the portal is clearing rather than setting.
const CLEARED_COOKIE_VALUE: &str = "deleted";

pub fn login_url(portal_url: &str) -> String {
    format!("{portal_url}/yrdsb/index.php")
}

pub fn invalid_credentials_url(portal_url: &str) -> String {
    format!("{portal_url}/live/index.php?error_message=3")
}

// Exchanges login credentials for a portal session. The client must not follow redirects.
pub async fn authenticate(
    client: &Client,
    portal_url: &str,
    credentials: &LoginCredentials,
) -> Result<PortalSession, PortalError> {
    let body = format!(
        "username={}&password={}",
        encode(&credentials.username),
        encode(&credentials.password)
    );

    let response = client
        .post(login_url(portal_url))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?;

    session_from_response(&response, portal_url)
}

fn session_from_response(response: &Response, portal_url: &str) -> Result<PortalSession, PortalError> {
    let redirect = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok());
    if redirect == Some(invalid_credentials_url(portal_url).as_str()) {
        return Err(PortalError::InvalidCredentials);
    }

    let student_id = cookie_value(response, "student_id");
    let session_token = cookie_value(response, "session_token");

    match (student_id, session_token) {
        (Some(student_id), Some(session_token)) => {
            debug!("Authenticated portal session for student {}", student_id);
            Ok(PortalSession {
                student_id,
                session_token,
            })
        }
        _ => Err(PortalError::AuthExtractionFailed),
    }
}

/// Finds the first usable value of a cookie set by the response.
///
/// Empty values and the portal's `deleted` marker are skipped.
pub fn cookie_value(response: &Response, name: &str) -> Option<String> {
    response
        .cookies()
        .filter(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .find(|value| !value.is_empty() && value != CLEARED_COOKIE_VALUE)
}
