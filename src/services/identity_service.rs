//! Identity registration, login lookups and group resolution.
//!
//! Group resolution tries the supervisor table first and the student table
//! second; an email found in neither belongs to no group. Every access check
//! in the folder and file services goes through [`IdentityService::authorize`]
//! or [`IdentityService::resolve_groups`].

use super::{ServiceError, ServiceResult, access, is_unique_violation, require_text};
use crate::models::identity::{GroupSet, Identity, Student, Supervisor, UserType};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

/// Registration input for a supervisor.
#[derive(Debug, Clone)]
pub struct NewSupervisor {
    pub name: String,
    pub interest: String,
    pub email: String,
    pub groups: Vec<i64>,
}

/// Registration input for a student.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub supervisor_ref: String,
    pub email: String,
    pub group_id: i64,
}

#[derive(Clone)]
pub struct IdentityService {
    db: Arc<SqlitePool>,
}

impl IdentityService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub async fn register_supervisor(&self, input: NewSupervisor) -> ServiceResult<Supervisor> {
        require_text("name", &input.name)?;
        require_text("email", &input.email)?;

        let supervisor = Supervisor {
            name: input.name,
            interest: input.interest,
            email: input.email,
            groups: input.groups,
            created_at: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO supervisors (email, name, interest, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&supervisor.email)
        .bind(&supervisor.name)
        .bind(&supervisor.interest)
        .bind(supervisor.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| duplicate_email(err, &supervisor.email))?;

        for (position, group_id) in supervisor.groups.iter().enumerate() {
            sqlx::query(
                "INSERT INTO supervisor_groups (supervisor_email, position, group_id)
                 VALUES (?, ?, ?)",
            )
            .bind(&supervisor.email)
            .bind(position as i64)
            .bind(*group_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(email = %supervisor.email, groups = ?supervisor.groups, "registered supervisor");
        Ok(supervisor)
    }

    pub async fn register_student(&self, input: NewStudent) -> ServiceResult<Student> {
        require_text("name", &input.name)?;
        require_text("email", &input.email)?;

        let student = Student {
            name: input.name,
            supervisor_ref: input.supervisor_ref,
            email: input.email,
            group_id: input.group_id,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO students (email, name, supervisor_ref, group_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&student.email)
        .bind(&student.name)
        .bind(&student.supervisor_ref)
        .bind(student.group_id)
        .bind(student.created_at)
        .execute(&*self.db)
        .await
        .map_err(|err| duplicate_email(err, &student.email))?;

        info!(email = %student.email, group_id = student.group_id, "registered student");
        Ok(student)
    }

    /// Look up `email` in the table selected by `user_type` only.
    pub async fn login(&self, email: &str, user_type: UserType) -> ServiceResult<Identity> {
        let found = match user_type {
            UserType::Supervisor => self.find_supervisor(email).await?.map(Identity::Supervisor),
            UserType::Student => self.find_student(email).await?.map(Identity::Student),
        };
        let identity = found.ok_or_else(|| ServiceError::NotFound("User not found".into()))?;
        info!(email, user_type = ?user_type, "login");
        Ok(identity)
    }

    pub async fn find_supervisor(&self, email: &str) -> ServiceResult<Option<Supervisor>> {
        let supervisor = sqlx::query_as::<_, Supervisor>(
            "SELECT name, interest, email, created_at FROM supervisors WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&*self.db)
        .await?;

        let Some(mut supervisor) = supervisor else {
            return Ok(None);
        };
        supervisor.groups = sqlx::query_scalar::<_, i64>(
            "SELECT group_id FROM supervisor_groups
             WHERE supervisor_email = ? ORDER BY position ASC",
        )
        .bind(email)
        .fetch_all(&*self.db)
        .await?;

        Ok(Some(supervisor))
    }

    pub async fn find_student(&self, email: &str) -> ServiceResult<Option<Student>> {
        Ok(sqlx::query_as::<_, Student>(
            "SELECT name, supervisor_ref, email, group_id, created_at
             FROM students WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&*self.db)
        .await?)
    }

    /// Resolve an email to a supervisor, else a student, else nothing.
    pub async fn resolve(&self, email: &str) -> ServiceResult<Option<Identity>> {
        if let Some(supervisor) = self.find_supervisor(email).await? {
            return Ok(Some(Identity::Supervisor(supervisor)));
        }
        Ok(self.find_student(email).await?.map(Identity::Student))
    }

    /// Groups the identity behind `email` belongs to; empty when unknown.
    pub async fn resolve_groups(&self, email: &str) -> ServiceResult<GroupSet> {
        let groups = self
            .resolve(email)
            .await?
            .map(|identity| identity.groups())
            .unwrap_or_default();
        debug!(email, groups = ?groups, "resolved groups");
        Ok(groups)
    }

    pub async fn authorize(&self, email: &str, target_group: i64) -> ServiceResult<bool> {
        let groups = self.resolve_groups(email).await?;
        Ok(access::may_create(&groups, target_group))
    }

    /// Like [`authorize`](Self::authorize) but fails with `Forbidden`.
    pub async fn require_group(&self, email: &str, target_group: i64) -> ServiceResult<()> {
        if self.authorize(email, target_group).await? {
            Ok(())
        } else {
            debug!(email, target_group, "group access denied");
            Err(ServiceError::Forbidden(
                "You do not have access to this group".into(),
            ))
        }
    }
}

fn duplicate_email(err: sqlx::Error, email: &str) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::BadRequest(format!("email `{email}` is already registered"))
    } else {
        ServiceError::Sqlx(err)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::memory_pool;

    /// Supervisor `a@x.com` in groups 1 and 2, students `b@x.com` and
    /// `c@x.com` in group 1.
    pub(crate) async fn seed(db: Arc<SqlitePool>) -> IdentityService {
        let service = IdentityService::new(db);
        service
            .register_supervisor(NewSupervisor {
                name: "Ada".into(),
                interest: "distributed systems".into(),
                email: "a@x.com".into(),
                groups: vec![1, 2],
            })
            .await
            .unwrap();
        for email in ["b@x.com", "c@x.com"] {
            service
                .register_student(NewStudent {
                    name: email.into(),
                    supervisor_ref: "Ada".into(),
                    email: email.into(),
                    group_id: 1,
                })
                .await
                .unwrap();
        }
        service
    }

    async fn seeded_identities() -> IdentityService {
        seed(Arc::new(memory_pool().await)).await
    }

    #[tokio::test]
    async fn supervisor_authorized_for_listed_groups_only() {
        let service = seeded_identities().await;
        assert!(service.authorize("a@x.com", 1).await.unwrap());
        assert!(service.authorize("a@x.com", 2).await.unwrap());
        assert!(!service.authorize("a@x.com", 3).await.unwrap());
    }

    #[tokio::test]
    async fn student_authorized_for_own_group_only() {
        let service = seeded_identities().await;
        assert!(service.authorize("b@x.com", 1).await.unwrap());
        assert!(!service.authorize("b@x.com", 2).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_email_has_no_groups() {
        let service = seeded_identities().await;
        assert!(service.resolve_groups("nobody@x.com").await.unwrap().is_empty());
        let err = service.require_group("nobody@x.com", 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn supervisor_groups_keep_registration_order() {
        let service = seeded_identities().await;
        let supervisor = service
            .register_supervisor(NewSupervisor {
                name: "Grace".into(),
                interest: "languages".into(),
                email: "g@x.com".into(),
                groups: vec![9, 3, 5],
            })
            .await
            .unwrap();
        let loaded = service.find_supervisor("g@x.com").await.unwrap().unwrap();
        assert_eq!(loaded.groups, vec![9, 3, 5]);
        assert_eq!(loaded.email, supervisor.email);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = seeded_identities().await;
        let err = service
            .register_student(NewStudent {
                name: "Again".into(),
                supervisor_ref: "Ada".into(),
                email: "b@x.com".into(),
                group_id: 2,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
        // The first registration is untouched.
        assert_eq!(
            service.resolve_groups("b@x.com").await.unwrap(),
            GroupSet::from([1])
        );
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let service = seeded_identities().await;
        let err = service
            .register_supervisor(NewSupervisor {
                name: "  ".into(),
                interest: String::new(),
                email: "z@x.com".into(),
                groups: vec![1],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn login_only_searches_requested_table() {
        let service = seeded_identities().await;

        let identity = service.login("a@x.com", UserType::Supervisor).await.unwrap();
        assert_eq!(identity.user_type(), UserType::Supervisor);

        let err = service.login("a@x.com", UserType::Student).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
