//! Supervisors and students, and the `Identity` variant that unifies them
//! for group resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;

/// Set of group numbers an identity belongs to.
pub type GroupSet = BTreeSet<i64>;

/// A supervisor may belong to several groups.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Supervisor {
    pub name: String,

    /// Research interest, free text.
    pub interest: String,

    pub email: String,

    /// Group numbers in registration order. Loaded from `supervisor_groups`.
    #[sqlx(skip)]
    pub groups: Vec<i64>,

    pub created_at: DateTime<Utc>,
}

/// A student belongs to exactly one group.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub name: String,

    /// Free-text reference to the student's supervisor.
    pub supervisor_ref: String,

    pub email: String,

    pub group_id: i64,

    pub created_at: DateTime<Utc>,
}

/// Which identity table a login targets.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Supervisor,
    Student,
}

impl UserType {
    /// Anything other than `supervisor` is looked up as a student.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("supervisor") {
            UserType::Supervisor
        } else {
            UserType::Student
        }
    }
}

/// A resolved requester.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Identity {
    Supervisor(Supervisor),
    Student(Student),
}

impl Identity {
    pub fn email(&self) -> &str {
        match self {
            Identity::Supervisor(s) => &s.email,
            Identity::Student(s) => &s.email,
        }
    }

    pub fn user_type(&self) -> UserType {
        match self {
            Identity::Supervisor(_) => UserType::Supervisor,
            Identity::Student(_) => UserType::Student,
        }
    }

    /// Groups this identity is a member of.
    pub fn groups(&self) -> GroupSet {
        match self {
            Identity::Supervisor(s) => s.groups.iter().copied().collect(),
            Identity::Student(s) => GroupSet::from([s.group_id]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor(groups: Vec<i64>) -> Identity {
        Identity::Supervisor(Supervisor {
            name: "Ada".into(),
            interest: "compilers".into(),
            email: "a@x.com".into(),
            groups,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn supervisor_groups_are_deduplicated() {
        let identity = supervisor(vec![2, 1, 2]);
        assert_eq!(identity.groups(), GroupSet::from([1, 2]));
        assert_eq!(identity.user_type(), UserType::Supervisor);
    }

    #[test]
    fn student_has_single_group() {
        let identity = Identity::Student(Student {
            name: "Bo".into(),
            supervisor_ref: "Ada".into(),
            email: "b@x.com".into(),
            group_id: 7,
            created_at: Utc::now(),
        });
        assert_eq!(identity.groups(), GroupSet::from([7]));
        assert_eq!(identity.email(), "b@x.com");
    }

    #[test]
    fn unknown_user_type_falls_back_to_student() {
        assert_eq!(UserType::parse_lenient("Supervisor"), UserType::Supervisor);
        assert_eq!(UserType::parse_lenient("student"), UserType::Student);
        assert_eq!(UserType::parse_lenient("admin"), UserType::Student);
    }
}
