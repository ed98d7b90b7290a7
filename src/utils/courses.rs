use futures::future::try_join_all;
use log::debug;
use reqwest::header::COOKIE;
use reqwest::{redirect, Client};
use url::Url;

use crate::error::PortalError;
use crate::models::{Course, CourseDetails, CourseOverview, LoginCredentials, PortalSession};
use crate::utils::extract::{parse_course_details, parse_course_list};
use crate::utils::session::authenticate;

/// Client for one portal origin. Holds no session state; every fetch logs in afresh.
#[derive(Debug, Clone)]
pub struct PortalClient {
    client: Client,
    portal_url: String,
}

impl PortalClient {
    pub fn new(portal_url: &str) -> Result<Self, PortalError> {
        // The login response is inspected for its redirect, so redirects are never followed.
        let client = Client::builder().redirect(redirect::Policy::none()).build()?;
        let portal_url = portal_url.trim_end_matches('/').to_string();
        Url::parse(&portal_url)?;

        Ok(PortalClient { client, portal_url })
    }

    pub fn portal_url(&self) -> &str {
        &self.portal_url
    }

    /// Logs in and fetches every course with its assignments and weightings.
    ///
    /// Detail pages are fetched concurrently. Any failure aborts the whole
    /// fetch; no partial course list is returned.
    pub async fn fetch_courses(&self, credentials: &LoginCredentials) -> Result<Vec<Course>, PortalError> {
        let session = authenticate(&self.client, &self.portal_url, credentials).await?;
        let overviews = self.fetch_course_overviews(&session).await?;
        debug!("Found {} courses for student {}", overviews.len(), session.student_id);

        try_join_all(
            overviews
                .into_iter()
                .map(|overview| self.fetch_course(overview, &session)),
        )
        .await
    }

    async fn fetch_course(&self, overview: CourseOverview, session: &PortalSession) -> Result<Course, PortalError> {
        let details = match overview.subject_id.as_deref() {
            Some(subject_id) => Some(self.fetch_course_details(subject_id, session).await?),
            None => None,
        };

        Ok(Course::new(overview, details))
    }

    async fn fetch_course_overviews(&self, session: &PortalSession) -> Result<Vec<CourseOverview>, PortalError> {
        let url = self.page_url("live/students/listReports.php", &[("student_id", session.student_id.as_str())])?;
        let html = self.get_page(url, session).await?;

        Ok(parse_course_list(&html)?)
    }

    async fn fetch_course_details(&self, subject_id: &str, session: &PortalSession) -> Result<CourseDetails, PortalError> {
        debug!("Fetching course details for subject {}", subject_id);
        let url = self.page_url(
            "live/students/viewReport.php",
            &[("subject_id", subject_id), ("student_id", session.student_id.as_str())],
        )?;
        let html = self.get_page(url, session).await?;

        Ok(parse_course_details(&html)?)
    }

    pub fn page_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, PortalError> {
        Ok(Url::parse_with_params(&format!("{}/{}", self.portal_url, path), params)?)
    }

    async fn get_page(&self, url: Url, session: &PortalSession) -> Result<String, PortalError> {
        let response = self
            .client
            .get(url)
            .header(COOKIE, format!("session_token={}", session.session_token))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_portal_url() {
        assert!(matches!(
            PortalClient::new("not a url"),
            Err(PortalError::InvalidUrl(_))
        ));
    }

    #[test]
    fn page_url_carries_query_parameters() {
        let client = PortalClient::new("https://ta.yrdsb.ca/").unwrap();
        let url = client
            .page_url("live/students/viewReport.php", &[("subject_id", "123"), ("student_id", "4 2")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ta.yrdsb.ca/live/students/viewReport.php?subject_id=123&student_id=4+2"
        );
    }
}
