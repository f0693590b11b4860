//! Person and course predicates shared by the policies.

use chrono::{DateTime, Months, Utc};

use cohorts_core::types::{Course, Person};
use cohorts_core::{AcademicSession, Settings};

/// Department that marks a student account.
pub const STUDENT_DEPARTMENT: &str = "student";

/// The conditions every staff-profile cohort member must meet, whatever
/// the cohort's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffFilter {
    auth_source: String,
    domain: String,
    excluded_prefixes: Vec<String>,
}

impl StaffFilter {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            auth_source: settings.auth_source.clone(),
            domain: settings.institutional_domain.to_lowercase(),
            excluded_prefixes: settings
                .excluded_prefixes()
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    /// Active, from the directory's auth source, on the institutional
    /// domain, and not a service account.
    pub fn admits(&self, person: &Person) -> bool {
        person.is_active()
            && person.auth == self.auth_source
            && person.email.to_lowercase().ends_with(&self.domain)
            && !self.is_excluded(person)
    }

    /// Email or username starts with an excluded prefix (case-insensitive).
    pub fn is_excluded(&self, person: &Person) -> bool {
        let email = person.email.to_lowercase();
        let username = person.username.to_lowercase();
        self.excluded_prefixes
            .iter()
            .any(|prefix| email.starts_with(prefix) || username.starts_with(prefix))
    }
}

/// Normalised department key: trimmed and lowercased.
pub fn department_key(department: &str) -> String {
    department.trim().to_lowercase()
}

/// A student account created strictly inside the rolling window.
pub fn is_new_student(person: &Person, now: DateTime<Utc>, months: u32) -> bool {
    let Some(cutoff) = now.checked_sub_months(Months::new(months)) else {
        return false;
    };
    person.is_active()
        && department_key(&person.department) == STUDENT_DEPARTMENT
        && person.created_at > cutoff
}

/// Shortname carries the session suffix, or `now` lies strictly inside the
/// course dates (covers offerings that span sessions).
pub fn course_is_running(course: &Course, session: AcademicSession, now: DateTime<Utc>) -> bool {
    course.shortname.ends_with(&session.shortname_suffix())
        || (course.start_date < now && now < course.end_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use cohorts_core::types::{CourseId, PersonId};
    use rstest::rstest;

    fn staff(username: &str, email: &str) -> Person {
        Person {
            id: PersonId(1),
            username: username.to_string(),
            email: email.to_string(),
            auth: "ldap".to_string(),
            department: "academic".to_string(),
            institution: String::new(),
            suspended: false,
            deleted: false,
            created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn filter() -> StaffFilter {
        StaffFilter::from_settings(&Settings::default())
    }

    #[test]
    fn admits_plain_staff_account() {
        assert!(filter().admits(&staff("jbloggs", "joe.bloggs@solent.ac.uk")));
    }

    #[rstest]
    #[case("consultant001", "c.one@solent.ac.uk")]
    #[case("jbloggs", "Consultant001@solent.ac.uk")]
    #[case("JobShop7", "js7@solent.ac.uk")]
    fn excluded_prefixes_match_email_or_username(#[case] username: &str, #[case] email: &str) {
        assert!(!filter().admits(&staff(username, email)));
    }

    #[test]
    fn rejects_foreign_domain_and_other_auth() {
        assert!(!filter().admits(&staff("jbloggs", "joe@example.com")));
        let mut manual = staff("jbloggs", "joe.bloggs@solent.ac.uk");
        manual.auth = "manual".into();
        assert!(!filter().admits(&manual));
    }

    #[test]
    fn rejects_suspended_and_deleted() {
        let mut p = staff("jbloggs", "joe.bloggs@solent.ac.uk");
        p.suspended = true;
        assert!(!filter().admits(&p));
        p.suspended = false;
        p.deleted = true;
        assert!(!filter().admits(&p));
    }

    #[test]
    fn empty_exclude_list_excludes_nobody() {
        let settings = Settings {
            email_exclude_pattern: String::new(),
            ..Settings::default()
        };
        let f = StaffFilter::from_settings(&settings);
        assert!(f.admits(&staff("consultant001", "consultant001@solent.ac.uk")));
    }

    fn student_created(now: DateTime<Utc>, created_at: DateTime<Utc>) -> bool {
        let mut p = staff("10012345", "10012345@solent.ac.uk");
        p.department = "student".into();
        p.created_at = created_at;
        is_new_student(&p, now, 6)
    }

    #[test]
    fn rolling_window_edges() {
        let now = Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap();
        let six_months_ago = now.checked_sub_months(Months::new(6)).unwrap();
        assert!(!student_created(now, six_months_ago - Duration::days(1)));
        assert!(!student_created(now, six_months_ago));
        assert!(student_created(now, six_months_ago + Duration::days(1)));
        let five_months_ago = now.checked_sub_months(Months::new(5)).unwrap();
        assert!(student_created(now, five_months_ago - Duration::days(29)));
    }

    #[test]
    fn staff_are_not_new_students() {
        let now = Utc::now();
        let p = staff("jbloggs", "joe.bloggs@solent.ac.uk");
        assert!(!is_new_student(&Person { created_at: now, ..p }, now, 6));
    }

    fn course(shortname: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Course {
        Course {
            id: CourseId(1),
            shortname: shortname.to_string(),
            start_date: start,
            end_date: end,
            location: None,
            level: None,
        }
    }

    #[test]
    fn running_by_session_suffix_or_dates() {
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        let session = AcademicSession::starting(2024);
        let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        assert!(course_is_running(&course("ABC101_2024/25", past, past), session, now));
        assert!(course_is_running(&course("ABC101_2023/24", past, later), session, now));
        assert!(!course_is_running(&course("ABC101_2023/24", past, past), session, now));
        assert!(!course_is_running(&course("ABC101_2023/24", now, later), session, now));
    }
}
