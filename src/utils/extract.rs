//! Extraction rules for the portal's report pages.
//!
//! Each rule takes the serialized markup of a single table row and turns it
//! into one typed record. The rules are pinned to the markup the portal
//! currently emits: any fragment that does not match is an error rather than
//! a partial record.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{ExtractError, Rule};
use crate::models::{
    Assignment, Category, CategoryMark, CategoryWeighting, CourseDetails, CourseOverview, ExtraMark,
};

const CATEGORIES_BY_COLOR: &[(&str, Category)] = &[
    ("ffffaa", Category::Knowledge),
    ("c0fea4", Category::Thinking),
    ("afafff", Category::Communication),
    ("ffd490", Category::Application),
    ("dedede", Category::OtherOrFinal),
];

const CATEGORIES_BY_NAME: &[(&str, Category)] = &[
    ("Knowledge/Understanding", Category::Knowledge),
    ("Thinking", Category::Thinking),
    ("Communication", Category::Communication),
    ("Application", Category::Application),
    ("Other", Category::Other),
    ("Final/Culminating", Category::Final),
];

const COURSE_ROW_SELECTOR: &str = ".green_border_message > div > table > tbody > tr[bgcolor]";
const WEIGHTING_ROW_SELECTOR: &str =
    ".green_border_message > div > table > tbody > tr > td > table > tbody > tr[bgcolor]";
const ASSIGNMENT_ROW_SELECTOR: &str = ".green_border_message > div > div > table[border] > tbody > tr";

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("extraction pattern must compile"))
}

fn course_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Course names contain spaces, so this one runs on unstripped markup.
    regex(&RE, r"\s*([^>]*?)\s*:\s*(.*?)\s*<br>")
}

fn course_details_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        concat!(
            r"Block:(.*?)-rm\.(.*?)<.*?",
            r">([^>]*?)~(.*?)<",
            r"(?:.*?subject_id=(.*?)&.*?currentmark=([\d.]*?)%)?",
        ),
    )
}

fn extra_mark_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"<span.*?>\s*(.*?):.*?([\d.]+)%")
}

fn assignment_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"<td.*?>(.+?)</td")
}

fn cell_color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r##"bgcolor="#?([^"]*?)""##)
}

fn mark_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"([\d.]*?) / ([\d.]*?) =.*?(?:weight=([\d.]+)|no weight)")
}

fn weighting_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(
        &RE,
        concat!(
            r"<td.*?>(.*?)</td.*?",
            r"(?:<td.*?>(.*?)%</td.*?)?",
            r"<td.*?>(.*?)%</td.*?",
            r"<td.*?>(.*?)%</td",
        ),
    )
}

fn decode(html: &str) -> String {
    html_escape::decode_html_entities(html).into_owned()
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn number(rule: Rule, field: &'static str, value: &str) -> Result<f64, ExtractError> {
    value.parse().map_err(|_| ExtractError::BadNumber {
        rule,
        field,
        value: value.to_string(),
    })
}

fn optional_number(rule: Rule, field: &'static str, value: Option<&str>) -> Result<Option<f64>, ExtractError> {
    match value {
        Some(v) if !v.is_empty() => number(rule, field, v).map(Some),
        _ => Ok(None),
    }
}

/// Parses one course row of the course list page.
pub fn parse_course_overview(html: &str) -> Result<CourseOverview, ExtractError> {
    let rule = Rule::CourseOverview;
    let decoded = decode(html);

    let header = course_header_re()
        .captures(&decoded)
        .ok_or(ExtractError::PatternMismatch { rule, field: "course code" })?;

    let stripped = strip_whitespace(&decoded);
    let details = course_details_re()
        .captures(&stripped)
        .ok_or(ExtractError::PatternMismatch { rule, field: "block" })?;

    let extra_marks = extra_mark_re()
        .captures_iter(&decoded)
        .map(|caps| -> Result<ExtraMark, ExtractError> {
            Ok(ExtraMark {
                name: caps[1].to_string(),
                value: number(rule, "extra mark", &caps[2])?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CourseOverview {
        course_code: header[1].to_string(),
        course_name: non_empty(&header[2]),
        block: details[1].to_string(),
        room: non_empty(&details[2]),
        start_date: details[3].to_string(),
        end_date: details[4].to_string(),
        subject_id: details.get(5).and_then(|m| non_empty(m.as_str())),
        current_mark: optional_number(rule, "current mark", details.get(6).map(|m| m.as_str()))?,
        extra_marks,
    })
}

/// Parses one assignment row of a course detail page.
///
/// Every category cell carries its category as a background color and wraps
/// the mark in a nested table. A cell with no nested table before it closes is
/// a category the assignment does not assess.
pub fn parse_assignment(html: &str) -> Result<Assignment, ExtractError> {
    let rule = Rule::Assignment;
    let decoded = decode(html);

    let name = assignment_name_re()
        .captures(&decoded)
        .ok_or(ExtractError::PatternMismatch { rule, field: "assignment name" })?[1]
        .to_string();

    let text: String = decoded.chars().filter(|c| !matches!(c, '\r' | '\n' | '\t')).collect();
    let mut marks = Vec::new();
    let mut pos = 0;

    while let Some(cell) = cell_color_re().captures_at(&text, pos) {
        let cell_start = cell.get(0).map_or(pos, |m| m.end());
        let rest = &text[cell_start..];
        let cell_end = rest.find("/td").unwrap_or(rest.len());

        let Some(inner) = rest[..cell_end].find("bgcolor") else {
            pos = cell_start;
            continue;
        };

        let Some(mark) = mark_re().captures_at(&text, cell_start + inner + "bgcolor".len()) else {
            return Err(ExtractError::PatternMismatch { rule, field: "mark" });
        };

        let color = &cell[1];
        let category = CATEGORIES_BY_COLOR
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(color))
            .map(|(_, category)| *category)
            .ok_or_else(|| ExtractError::UnknownColor(color.to_string()))?;

        let marks_received = optional_number(rule, "marks received", Some(&mark[1]))?;
        let marks_total = number(rule, "marks total", &mark[2])?;
        let percent_mark = match marks_received {
            Some(received) if marks_total != 0.0 => Some(received / marks_total * 100.0),
            _ => None,
        };
        let weight = optional_number(rule, "weight", mark.get(3).map(|m| m.as_str()))?;

        marks.push(CategoryMark {
            category,
            marks_received,
            marks_total,
            percent_mark,
            weight,
        });

        pos = mark.get(0).map_or(cell_start, |m| m.end());
    }

    Ok(Assignment { name, marks })
}

/// Parses one row of the category weighting table.
pub fn parse_category_weighting(html: &str) -> Result<CategoryWeighting, ExtractError> {
    let rule = Rule::CategoryWeighting;
    let stripped = strip_whitespace(&decode(html));

    let caps = weighting_re()
        .captures(&stripped)
        .ok_or(ExtractError::PatternMismatch { rule, field: "weighting cells" })?;

    let name = &caps[1];
    let category = CATEGORIES_BY_NAME
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, category)| *category)
        .ok_or_else(|| ExtractError::UnknownCategory(name.to_string()))?;

    Ok(CategoryWeighting {
        category,
        weight: optional_number(rule, "weight", caps.get(2).map(|m| m.as_str()))?,
        course_weight: number(rule, "course weight", &caps[3])?,
        student_achievement: number(rule, "student achievement", &caps[4])?,
    })
}

fn select_rows(document: &Html, selector: &str) -> Vec<String> {
    let selector = Selector::parse(selector).expect("row selector must parse");
    document.select(&selector).map(|row| row.html()).collect()
}

/// Parses every course row of the course list page.
pub fn parse_course_list(html: &str) -> Result<Vec<CourseOverview>, ExtractError> {
    let rows = select_rows(&Html::parse_document(html), COURSE_ROW_SELECTOR);
    rows.iter().map(|row| parse_course_overview(row)).collect()
}

/// Parses the assignment table and the weighting table out of one detail page.
pub fn parse_course_details(html: &str) -> Result<CourseDetails, ExtractError> {
    let (assignment_rows, weighting_rows) = {
        let document = Html::parse_document(html);
        // Odd rows are assignments; the header and feedback rows sit between them.
        let assignments: Vec<String> = select_rows(&document, ASSIGNMENT_ROW_SELECTOR)
            .into_iter()
            .skip(1)
            .step_by(2)
            .collect();
        (assignments, select_rows(&document, WEIGHTING_ROW_SELECTOR))
    };

    let assignments = assignment_rows
        .iter()
        .map(|row| parse_assignment(row))
        .collect::<Result<Vec<_>, _>>()?;
    let weightings = weighting_rows
        .iter()
        .map(|row| parse_category_weighting(row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CourseDetails { assignments, weightings })
}
