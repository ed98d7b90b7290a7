use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

// Portal session derived from a successful login. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSession {
    pub student_id: String,
    pub session_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Knowledge,
    Thinking,
    Communication,
    Application,
    Other,
    Final,
    /// Provisional tag for marks the portal files under "other/final" without saying which.
    OtherOrFinal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraMark {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOverview {
    pub course_code: String,
    pub course_name: Option<String>,
    pub block: String,
    pub room: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub subject_id: Option<String>,
    pub current_mark: Option<f64>,
    pub extra_marks: Vec<ExtraMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMark {
    pub category: Category,
    pub marks_received: Option<f64>,
    pub marks_total: f64,
    pub percent_mark: Option<f64>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub marks: Vec<CategoryMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWeighting {
    pub category: Category,
    pub weight: Option<f64>,
    pub course_weight: f64,
    pub student_achievement: f64,
}

/// A course overview together with its detail page, when it has one.
///
/// `assignments` and `weightings` are either both `Some` or both `None`;
/// [`CourseDetails`] keeps them paired until the course is assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(flatten)]
    pub overview: CourseOverview,
    pub assignments: Option<Vec<Assignment>>,
    pub weightings: Option<Vec<CategoryWeighting>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseDetails {
    pub assignments: Vec<Assignment>,
    pub weightings: Vec<CategoryWeighting>,
}

impl Course {
    pub fn new(overview: CourseOverview, details: Option<CourseDetails>) -> Self {
        match details {
            Some(details) => Course {
                overview,
                assignments: Some(details.assignments),
                weightings: Some(details.weightings),
            },
            None => Course {
                overview,
                assignments: None,
                weightings: None,
            },
        }
    }

    /// Published student achievement for a category, if the portal listed one.
    pub fn student_achievement(&self, category: Category) -> Option<f64> {
        self.weightings
            .as_ref()?
            .iter()
            .find(|w| w.category == category)
            .map(|w| w.student_achievement)
    }
}
