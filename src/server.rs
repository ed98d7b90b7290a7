use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use log::{error, info, warn};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::PortalError;
use crate::models::{Course, LoginCredentials};
use crate::utils::courses::PortalClient;
use crate::utils::strands::resolve_ambiguous_strands;

pub struct AppState {
    pub portal: PortalClient,
    pub max_ambiguous_marks: usize,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, PortalError> {
        Ok(AppState {
            portal: PortalClient::new(&config.portal_url)?,
            max_ambiguous_marks: config.max_ambiguous_marks,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CoursesRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CoursesRequest {
    fn credentials(self) -> Option<LoginCredentials> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(LoginCredentials { username, password })
            }
            _ => None,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/getCourses", post(get_courses))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on port {}", port);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn get_courses(
    State(state): State<Arc<AppState>>,
    request: Result<Json<CoursesRequest>, JsonRejection>,
) -> Result<Json<Vec<Course>>, StatusCode> {
    let Json(request) = request.map_err(|_| StatusCode::BAD_REQUEST)?;
    let credentials = request.credentials().ok_or(StatusCode::BAD_REQUEST)?;

    let mut courses = match state.portal.fetch_courses(&credentials).await {
        Ok(courses) => courses,
        Err(PortalError::InvalidCredentials) => return Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            error!("Error fetching courses: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    // Unresolved marks stay tagged other/final; only unexpected failures are worth a log line.
    for course in courses.iter_mut() {
        if let Err(e) = resolve_ambiguous_strands(course, state.max_ambiguous_marks) {
            if !e.is_benign() {
                warn!("Could not resolve strands for {}: {}", course.overview.course_code, e);
            }
        }
    }

    Ok(Json(courses))
}
