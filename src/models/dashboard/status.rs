use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::submission::Submission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionStatus {
    Unsubmitted,
    Submitted,
    #[serde(rename = "Submitted_Late")]
    SubmittedLate,
}

/// Drafts never count. A submission last touched strictly after the due time is late.
pub fn classify(submission: Option<&Submission>, due_by: DateTime<Utc>) -> SubmissionStatus {
    match submission {
        Some(s) if !s.is_draft && s.updated_at > due_by => SubmissionStatus::SubmittedLate,
        Some(s) if !s.is_draft => SubmissionStatus::Submitted,
        _ => SubmissionStatus::Unsubmitted,
    }
}

/// The submission to show among candidates: the latest final one, else the latest draft.
pub fn pick<'a, I>(candidates: I) -> Option<&'a Submission>
where
    I: IntoIterator<Item = &'a Submission>,
{
    let mut best: Option<&Submission> = None;
    for s in candidates {
        best = match best {
            None => Some(s),
            Some(b) if b.is_draft && !s.is_draft => Some(s),
            Some(b) if b.is_draft == s.is_draft && (s.updated_at, s.id) > (b.updated_at, b.id) => Some(s),
            keep => keep,
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn submission(id: i64, is_draft: bool, updated_at: DateTime<Utc>) -> Submission {
        Submission {
            id,
            deadline_id: 1,
            from_project_id: Some(1),
            from_user_id: None,
            to_project_id: None,
            to_user_id: None,
            is_draft,
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn on_time_late_and_missing() {
        let due = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(classify(None, due), SubmissionStatus::Unsubmitted);
        let early = submission(1, false, due - Duration::hours(1));
        assert_eq!(classify(Some(&early), due), SubmissionStatus::Submitted);
        let late = submission(2, false, due + Duration::seconds(1));
        assert_eq!(classify(Some(&late), due), SubmissionStatus::SubmittedLate);
    }

    #[test]
    fn exactly_at_due_time_is_not_late() {
        let due = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let s = submission(1, false, due);
        assert_eq!(classify(Some(&s), due), SubmissionStatus::Submitted);
    }

    #[test]
    fn drafts_are_unsubmitted() {
        let due = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let s = submission(1, true, due - Duration::days(1));
        assert_eq!(classify(Some(&s), due), SubmissionStatus::Unsubmitted);
    }

    #[test]
    fn late_status_serializes_with_underscore() {
        assert_eq!(serde_json::to_value(SubmissionStatus::SubmittedLate).unwrap(), "Submitted_Late");
    }

    #[test]
    fn pick_prefers_latest_final_over_newer_draft() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let old_final = submission(1, false, t);
        let new_final = submission(2, false, t + Duration::hours(1));
        let newest_draft = submission(3, true, t + Duration::hours(2));
        let all = [old_final, new_final.clone(), newest_draft.clone()];
        assert_eq!(pick(&all).map(|s| s.id), Some(2));
        assert_eq!(pick([&newest_draft]).map(|s| s.id), Some(3));
        assert!(pick(std::iter::empty()).is_none());
    }
}
