//! Resolves marks the portal files under the combined "other/final" category.
//!
//! The portal never says which of the two categories such a mark belongs to,
//! but it does publish the averages of both. Every split of the ambiguous
//! marks into an "other" side and a "final" side is tried; if exactly one
//! split reproduces both published averages to one decimal place, the marks
//! are relabelled accordingly.

use crate::error::StrandError;
use crate::models::{Category, CategoryMark, Course};

/// Largest fixable mark count the enumeration can index with a `u64` mask.
pub const MAX_SUPPORTED_MARKS: usize = 63;

/// Weighted average Σ(percent·weight)/Σ(weight) over marks carrying both values.
///
/// `None` when no mark has both, so an empty side never matches a target.
pub fn weighted_average<'a, I>(marks: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a CategoryMark>,
{
    let (total, weight) = marks
        .into_iter()
        .filter_map(|mark| Some((mark.percent_mark?, mark.weight?)))
        .fold((0.0, 0.0), |(total, weight), (percent, w)| (total + percent * w, weight + w));

    if weight == 0.0 {
        None
    } else {
        Some(total / weight)
    }
}

// One decimal place, halves rounded up the way the portal publishes them.
fn tenths(value: f64) -> f64 {
    (value * 10.0).round()
}

fn rounds_to(average: Option<f64>, target: f64) -> bool {
    average.is_some_and(|average| tenths(average) == tenths(target))
}

// A mark can only be placed if it moves a weighted average.
fn is_fixable(mark: &CategoryMark) -> bool {
    mark.marks_received.is_some() && mark.weight.is_some_and(|w| w != 0.0)
}

/// Relabels the course's fixable other/final marks as `Other` or `Final`.
///
/// Does nothing when the course has no detail page or no fixable ambiguous
/// marks. Unfixable ambiguous marks keep their provisional category whatever
/// the outcome. On error no mark is changed.
pub fn resolve_ambiguous_strands(course: &mut Course, limit: usize) -> Result<(), StrandError> {
    let targets = (
        course.student_achievement(Category::Other),
        course.student_achievement(Category::Final),
    );
    let Some(assignments) = course.assignments.as_mut() else {
        return Ok(());
    };

    let mut fixable: Vec<&mut CategoryMark> = assignments
        .iter_mut()
        .flat_map(|assignment| assignment.marks.iter_mut())
        .filter(|mark| mark.category == Category::OtherOrFinal && is_fixable(mark))
        .collect();

    if fixable.is_empty() {
        return Ok(());
    }

    let limit = limit.min(MAX_SUPPORTED_MARKS);
    if fixable.len() > limit {
        return Err(StrandError::TooManyAmbiguousMarks {
            count: fixable.len(),
            limit,
        });
    }

    let (Some(other_target), Some(final_target)) = targets else {
        return Err(StrandError::NoSolutionFound);
    };

    let solution = {
        let marks: Vec<&CategoryMark> = fixable.iter().map(|mark| &**mark).collect();
        find_split(&marks, other_target, final_target)?
    };

    for (index, mark) in fixable.iter_mut().enumerate() {
        mark.category = if solution & (1u64 << index) != 0 {
            Category::Other
        } else {
            Category::Final
        };
    }

    Ok(())
}

/// Returns the unique bitmask (bit set = "other") whose split matches both targets.
fn find_split(marks: &[&CategoryMark], other_target: f64, final_target: f64) -> Result<u64, StrandError> {
    let mut solution = None;

    for mask in 0..(1u64 << marks.len()) {
        let in_other = |index: &usize| mask & (1u64 << *index) != 0;
        let other = (0..marks.len()).filter(in_other).map(|i| marks[i]);
        let fin = (0..marks.len()).filter(|i| !in_other(i)).map(|i| marks[i]);

        if rounds_to(weighted_average(other), other_target) && rounds_to(weighted_average(fin), final_target) {
            if solution.is_some() {
                return Err(StrandError::AmbiguousSolution);
            }
            solution = Some(mask);
        }
    }

    solution.ok_or(StrandError::NoSolutionFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, CategoryWeighting, CourseOverview};

    fn mark(category: Category, received: Option<f64>, total: f64, weight: Option<f64>) -> CategoryMark {
        CategoryMark {
            category,
            marks_received: received,
            marks_total: total,
            percent_mark: received.map(|r| r / total * 100.0),
            weight,
        }
    }

    fn ambiguous(received: f64, weight: f64) -> CategoryMark {
        mark(Category::OtherOrFinal, Some(received), 100.0, Some(weight))
    }

    fn graded(percent: f64, weight: f64) -> CategoryMark {
        CategoryMark {
            category: Category::OtherOrFinal,
            marks_received: Some(percent),
            marks_total: 100.0,
            percent_mark: Some(percent),
            weight: Some(weight),
        }
    }

    fn weighting(category: Category, achievement: f64) -> CategoryWeighting {
        CategoryWeighting {
            category,
            weight: None,
            course_weight: 15.0,
            student_achievement: achievement,
        }
    }

    fn sample_course(marks: Vec<CategoryMark>, other: f64, fin: f64) -> Course {
        Course {
            overview: CourseOverview {
                course_code: "MAT1D".into(),
                course_name: Some("Mathematics".into()),
                block: "A".into(),
                room: None,
                start_date: "2024-01-01".into(),
                end_date: "2024-06-01".into(),
                subject_id: Some("123".into()),
                current_mark: Some(80.0),
                extra_marks: Vec::new(),
            },
            assignments: Some(
                marks
                    .into_iter()
                    .enumerate()
                    .map(|(i, m)| Assignment {
                        name: format!("Assignment {i}"),
                        marks: vec![mark(Category::Knowledge, Some(9.0), 10.0, Some(5.0)), m],
                    })
                    .collect(),
            ),
            weightings: Some(vec![
                weighting(Category::Knowledge, 90.0),
                weighting(Category::Other, other),
                weighting(Category::Final, fin),
            ]),
        }
    }

    fn categories(course: &Course) -> Vec<Category> {
        course
            .assignments
            .as_ref()
            .unwrap()
            .iter()
            .map(|a| a.marks[1].category)
            .collect()
    }

    #[test]
    fn weighted_average_ignores_incomplete_marks() {
        let marks = [
            ambiguous(80.0, 1.0),
            ambiguous(50.0, 3.0),
            mark(Category::OtherOrFinal, None, 10.0, Some(4.0)),
            mark(Category::OtherOrFinal, Some(1.0), 10.0, None),
        ];
        assert_eq!(weighted_average(&marks), Some((80.0 + 150.0) / 4.0));
    }

    #[test]
    fn weighted_average_of_unweighted_marks_is_none() {
        let marks = [mark(Category::OtherOrFinal, Some(1.0), 10.0, None)];
        assert_eq!(weighted_average(&marks), None);
        assert_eq!(weighted_average(std::iter::empty()), None);
        assert!(!rounds_to(None, 0.0));
    }

    #[test]
    fn assigns_the_only_matching_split() {
        let mut course = sample_course(vec![ambiguous(60.0, 10.0), ambiguous(80.0, 10.0)], 80.0, 60.0);
        resolve_ambiguous_strands(&mut course, 20).unwrap();
        assert_eq!(categories(&course), vec![Category::Final, Category::Other]);
    }

    #[test]
    fn matches_to_one_decimal_place() {
        // other = (70*2 + 75*1) / 3 = 71.666.., published as 71.7
        let mut course = sample_course(
            vec![ambiguous(70.0, 2.0), ambiguous(75.0, 1.0), ambiguous(90.0, 5.0)],
            71.7,
            90.0,
        );
        resolve_ambiguous_strands(&mut course, 20).unwrap();
        assert_eq!(
            categories(&course),
            vec![Category::Other, Category::Other, Category::Final]
        );
    }

    #[test]
    fn half_tenths_round_up() {
        // other = (72.5 + 72) / 2 = 72.25, published as 72.3
        let mut course = sample_course(vec![graded(72.5, 1.0), graded(72.0, 1.0), graded(50.0, 1.0)], 72.3, 50.0);
        resolve_ambiguous_strands(&mut course, 20).unwrap();
        assert_eq!(
            categories(&course),
            vec![Category::Other, Category::Other, Category::Final]
        );
        assert!(rounds_to(Some(72.25), 72.3));
        assert!(!rounds_to(Some(72.25), 72.2));
    }

    #[test]
    fn interchangeable_marks_are_ambiguous() {
        let mut course = sample_course(vec![ambiguous(70.0, 10.0), ambiguous(70.0, 10.0)], 70.0, 70.0);
        let before = course.clone();
        assert_eq!(
            resolve_ambiguous_strands(&mut course, 20),
            Err(StrandError::AmbiguousSolution)
        );
        assert_eq!(course, before);
    }

    #[test]
    fn unreachable_targets_have_no_solution() {
        let mut course = sample_course(vec![ambiguous(100.0, 10.0), ambiguous(100.0, 5.0)], 90.0, 85.0);
        assert_eq!(
            resolve_ambiguous_strands(&mut course, 20),
            Err(StrandError::NoSolutionFound)
        );
        assert_eq!(categories(&course), vec![Category::OtherOrFinal; 2]);
    }

    #[test]
    fn unfixable_marks_stay_ambiguous() {
        let mut course = sample_course(
            vec![
                ambiguous(60.0, 10.0),
                mark(Category::OtherOrFinal, None, 20.0, Some(10.0)),
                ambiguous(80.0, 10.0),
                mark(Category::OtherOrFinal, Some(5.0), 20.0, Some(0.0)),
            ],
            80.0,
            60.0,
        );
        resolve_ambiguous_strands(&mut course, 20).unwrap();
        assert_eq!(
            categories(&course),
            vec![
                Category::Final,
                Category::OtherOrFinal,
                Category::Other,
                Category::OtherOrFinal,
            ]
        );
    }

    #[test]
    fn resolving_twice_is_a_no_op() {
        let mut course = sample_course(vec![ambiguous(60.0, 10.0), ambiguous(80.0, 10.0)], 80.0, 60.0);
        resolve_ambiguous_strands(&mut course, 20).unwrap();
        let resolved = course.clone();
        resolve_ambiguous_strands(&mut course, 20).unwrap();
        assert_eq!(course, resolved);
    }

    #[test]
    fn course_without_details_is_untouched() {
        let mut course = sample_course(vec![], 0.0, 0.0);
        course.assignments = None;
        course.weightings = None;
        assert_eq!(resolve_ambiguous_strands(&mut course, 20), Ok(()));
    }

    #[test]
    fn refuses_more_marks_than_the_limit() {
        let marks = (0..5).map(|i| ambiguous(50.0 + i as f64, 1.0)).collect();
        let mut course = sample_course(marks, 51.0, 53.0);
        assert_eq!(
            resolve_ambiguous_strands(&mut course, 4),
            Err(StrandError::TooManyAmbiguousMarks { count: 5, limit: 4 })
        );
    }

    #[test]
    fn missing_published_average_has_no_solution() {
        let mut course = sample_course(vec![ambiguous(60.0, 10.0), ambiguous(80.0, 10.0)], 80.0, 60.0);
        course
            .weightings
            .as_mut()
            .unwrap()
            .retain(|w| w.category != Category::Final);
        assert_eq!(
            resolve_ambiguous_strands(&mut course, 20),
            Err(StrandError::NoSolutionFound)
        );
    }
}
