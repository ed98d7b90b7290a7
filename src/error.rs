use thiserror::Error;

/// Which extraction rule rejected a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    CourseOverview,
    Assignment,
    CategoryWeighting,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Rule::CourseOverview => "course overview",
            Rule::Assignment => "assignment",
            Rule::CategoryWeighting => "category weighting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("{rule} fragment did not match: missing {field}")]
    PatternMismatch { rule: Rule, field: &'static str },
    #[error("{rule} fragment has unparseable number {value:?} for {field}")]
    BadNumber {
        rule: Rule,
        field: &'static str,
        value: String,
    },
    #[error("assignment mark has unknown category color {0:?}")]
    UnknownColor(String),
    #[error("weighting row has unknown category name {0:?}")]
    UnknownCategory(String),
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("session cookies not found in login response")]
    AuthExtractionFailed,
    #[error("failed to extract portal data: {0}")]
    ExtractionFailed(#[from] ExtractError),
    #[error("portal request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid portal URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrandError {
    #[error("no other/final split matches the published averages")]
    NoSolutionFound,
    #[error("more than one other/final split matches the published averages")]
    AmbiguousSolution,
    #[error("{count} ambiguous marks exceeds the limit of {limit}")]
    TooManyAmbiguousMarks { count: usize, limit: usize },
}

impl StrandError {
    /// Expected data-shape outcomes that callers should not log.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            StrandError::NoSolutionFound | StrandError::AmbiguousSolution
        )
    }
}
