// src/unlock.rs
//
// Drip-content evaluation: which items of a course a student can see right
// now. Deterministic in (enrollment time, now, completion set, rule set);
// re-evaluated on every content-list request.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{content::ContentItem, schedule::ContentScheduleRule};

/// One entry of the student-facing content list.
#[derive(Debug, Clone, Serialize)]
pub struct ContentAccess {
    pub content_id: i64,
    pub title: String,
    pub content_type: String,
    pub order_index: i32,
    pub is_unlocked: bool,

    /// Only set for time-based rules; prerequisite gates have no computable
    /// ETA.
    pub unlock_date: Option<DateTime<Utc>>,

    /// Human-readable countdown for time-gated items.
    pub available_in: Option<String>,
}

/// Evaluates every content item of a course against its schedule rule.
///
/// * No rule: unlocked immediately.
/// * `unlock_after_days = N` with N > 0: unlocks at enrollment + N days.
/// * Otherwise, `unlock_after_content_id = P`: unlocks once the student has
///   completed P, regardless of elapsed time.
///
/// A rule carrying both conditions resolves to the time-based path only
/// when the day count is positive, matching the stored behavior this was
/// ported from.
pub fn evaluate_course_content(
    items: &[ContentItem],
    rules: &HashMap<i64, ContentScheduleRule>,
    enrolled_at: DateTime<Utc>,
    completed: &HashSet<i64>,
    now: DateTime<Utc>,
) -> Vec<ContentAccess> {
    items
        .iter()
        .map(|item| {
            let (is_unlocked, unlock_date) =
                evaluate_rule(rules.get(&item.id), enrolled_at, completed, now);

            ContentAccess {
                content_id: item.id,
                title: item.title.clone(),
                content_type: item.content_type.clone(),
                order_index: item.order_index,
                is_unlocked,
                unlock_date,
                available_in: unlock_date.map(|date| format_remaining(date, now)),
            }
        })
        .collect()
}

/// Resolves a single rule to (is_unlocked, unlock_date).
fn evaluate_rule(
    rule: Option<&ContentScheduleRule>,
    enrolled_at: DateTime<Utc>,
    completed: &HashSet<i64>,
    now: DateTime<Utc>,
) -> (bool, Option<DateTime<Utc>>) {
    let Some(rule) = rule else {
        return (true, None);
    };

    if let Some(days) = rule.unlock_after_days.filter(|d| *d > 0) {
        let unlock_date = enrolled_at + Duration::days(i64::from(days));
        return (now >= unlock_date, Some(unlock_date));
    }

    if let Some(prerequisite_id) = rule.unlock_after_content_id {
        return (completed.contains(&prerequisite_id), None);
    }

    // Rule row with neither condition gates nothing.
    (true, None)
}

/// Formats the time until `unlock_date` as a coarse countdown:
/// "3d 4h", "4h 30m" or "12m", collapsing to "Available now" once due.
pub fn format_remaining(unlock_date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = unlock_date - now;

    if remaining <= Duration::zero() {
        return "Available now".to_string();
    }

    let days = remaining.num_days();
    let hours = remaining.num_hours();
    let minutes = remaining.num_minutes();

    if days >= 1 {
        format!("{}d {}h", days, hours - days * 24)
    } else if hours >= 1 {
        format!("{}h {}m", hours, minutes - hours * 60)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: i64, order_index: i32) -> ContentItem {
        ContentItem {
            id,
            course_id: 1,
            title: format!("Lesson {}", id),
            content_type: "lesson".to_string(),
            order_index,
            created_at: None,
        }
    }

    fn day_rule(content_id: i64, days: i32) -> ContentScheduleRule {
        ContentScheduleRule {
            id: content_id,
            course_id: 1,
            content_id,
            unlock_after_days: Some(days),
            unlock_after_content_id: None,
            created_at: None,
        }
    }

    fn prerequisite_rule(content_id: i64, prerequisite: i64) -> ContentScheduleRule {
        ContentScheduleRule {
            id: content_id,
            course_id: 1,
            content_id,
            unlock_after_days: None,
            unlock_after_content_id: Some(prerequisite),
            created_at: None,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_rule_unlocks_immediately() {
        let items = vec![item(1, 0)];
        let access =
            evaluate_course_content(&items, &HashMap::new(), t0(), &HashSet::new(), t0());

        assert!(access[0].is_unlocked);
        assert!(access[0].unlock_date.is_none());
        assert!(access[0].available_in.is_none());
    }

    #[test]
    fn test_day_rule_unlocks_exactly_at_boundary() {
        let items = vec![item(1, 0)];
        let rules = HashMap::from([(1, day_rule(1, 7))]);
        let unlock_date = t0() + Duration::days(7);

        let before = t0() + Duration::days(7) - Duration::minutes(1);
        let access = evaluate_course_content(&items, &rules, t0(), &HashSet::new(), before);
        assert!(!access[0].is_unlocked);
        assert_eq!(access[0].unlock_date, Some(unlock_date));

        let at = unlock_date;
        let access = evaluate_course_content(&items, &rules, t0(), &HashSet::new(), at);
        assert!(access[0].is_unlocked);

        let after = unlock_date + Duration::minutes(1);
        let access = evaluate_course_content(&items, &rules, t0(), &HashSet::new(), after);
        assert!(access[0].is_unlocked);
        assert_eq!(access[0].available_in.as_deref(), Some("Available now"));
    }

    #[test]
    fn test_prerequisite_rule_ignores_elapsed_time() {
        let items = vec![item(2, 1)];
        let rules = HashMap::from([(2, prerequisite_rule(2, 1))]);

        // A year after enrollment, still locked without the completion.
        let much_later = t0() + Duration::days(365);
        let access =
            evaluate_course_content(&items, &rules, t0(), &HashSet::new(), much_later);
        assert!(!access[0].is_unlocked);
        assert!(access[0].unlock_date.is_none());

        // Unlocks the moment the prerequisite is completed.
        let completed = HashSet::from([1]);
        let access = evaluate_course_content(&items, &rules, t0(), &completed, t0());
        assert!(access[0].is_unlocked);
    }

    #[test]
    fn test_dual_condition_prefers_positive_day_count() {
        let items = vec![item(3, 0)];
        let mut rule = day_rule(3, 2);
        rule.unlock_after_content_id = Some(1);
        let rules = HashMap::from([(3, rule)]);

        // Prerequisite completed, but the 2-day clock still gates.
        let completed = HashSet::from([1]);
        let access = evaluate_course_content(&items, &rules, t0(), &completed, t0());
        assert!(!access[0].is_unlocked);

        let access = evaluate_course_content(
            &items,
            &rules,
            t0(),
            &completed,
            t0() + Duration::days(2),
        );
        assert!(access[0].is_unlocked);
    }

    #[test]
    fn test_dual_condition_with_zero_days_falls_back_to_prerequisite() {
        let items = vec![item(3, 0)];
        let mut rule = day_rule(3, 0);
        rule.unlock_after_content_id = Some(1);
        let rules = HashMap::from([(3, rule)]);

        let access =
            evaluate_course_content(&items, &rules, t0(), &HashSet::new(), t0());
        assert!(!access[0].is_unlocked);

        let completed = HashSet::from([1]);
        let access = evaluate_course_content(&items, &rules, t0(), &completed, t0());
        assert!(access[0].is_unlocked);
    }

    #[test]
    fn test_empty_rule_gates_nothing() {
        let items = vec![item(4, 0)];
        let mut rule = day_rule(4, 0);
        rule.unlock_after_days = None;
        let rules = HashMap::from([(4, rule)]);

        let access =
            evaluate_course_content(&items, &rules, t0(), &HashSet::new(), t0());
        assert!(access[0].is_unlocked);
    }

    #[test]
    fn test_format_remaining_tiers() {
        let now = t0();

        let date = now + Duration::days(3) + Duration::hours(4);
        assert_eq!(format_remaining(date, now), "3d 4h");

        let date = now + Duration::hours(4) + Duration::minutes(30);
        assert_eq!(format_remaining(date, now), "4h 30m");

        let date = now + Duration::minutes(12);
        assert_eq!(format_remaining(date, now), "12m");

        assert_eq!(format_remaining(now, now), "Available now");
        assert_eq!(
            format_remaining(now - Duration::minutes(5), now),
            "Available now"
        );
    }
}
