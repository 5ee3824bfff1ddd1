//! Login and registration handlers.
//!
//! Identity is asserted by email alone; there is no password or token.

use super::{GroupList, GroupNumber};
use crate::{
    errors::AppError,
    models::identity::{Identity, Student, Supervisor, UserType},
    services::identity_service::{NewStudent, NewSupervisor},
    state::AppState,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginReq {
    pub email: String,
    #[serde(default)]
    pub user_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResp {
    pub message: &'static str,
    pub user: Identity,
    pub user_type: UserType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSupervisorReq {
    pub name: String,
    pub interest: String,
    pub email: String,
    pub groups: GroupList,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentReq {
    pub name: String,
    pub supervisor_ref: String,
    pub email: String,
    pub group_id: GroupNumber,
}

#[derive(Serialize)]
pub struct SupervisorCreated {
    pub message: &'static str,
    pub supervisor: Supervisor,
}

#[derive(Serialize)]
pub struct StudentCreated {
    pub message: &'static str,
    pub student: Student,
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginReq>, JsonRejection>,
) -> Result<Json<LoginResp>, AppError> {
    let Json(req) = payload?;
    let user_type = UserType::parse_lenient(&req.user_type);
    let user = state.identities.login(&req.email, user_type).await?;

    Ok(Json(LoginResp {
        message: "Login successful",
        user,
        user_type,
    }))
}

/// `POST /api/auth/register/supervisor`
pub async fn register_supervisor(
    State(state): State<AppState>,
    payload: Result<Json<RegisterSupervisorReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let supervisor = state
        .identities
        .register_supervisor(NewSupervisor {
            name: req.name,
            interest: req.interest,
            email: req.email,
            groups: req.groups.values()?,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SupervisorCreated {
            message: "Supervisor registered",
            supervisor,
        }),
    ))
}

/// `POST /api/auth/register/student`
pub async fn register_student(
    State(state): State<AppState>,
    payload: Result<Json<RegisterStudentReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let student = state
        .identities
        .register_student(NewStudent {
            name: req.name,
            supervisor_ref: req.supervisor_ref,
            email: req.email,
            group_id: req.group_id.value()?,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StudentCreated {
            message: "Student registered",
            student,
        }),
    ))
}
