//! Folder endpoints.

use super::{Flag, GroupNumber};
use crate::{
    errors::AppError,
    models::folder::Folder,
    services::folder_service::{FolderUpdate, NewFolder},
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderReq {
    pub name: String,
    pub visibility: Option<Flag>,
    pub owner_email: String,
    pub group_id: GroupNumber,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFolderReq {
    pub name: Option<String>,
    pub visibility: Option<Flag>,
}

/// Query for listing: `?ownerEmail=`. A missing email sees nothing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    #[serde(default)]
    pub owner_email: String,
}

/// Query for search: `?query=&ownerEmail=`. A missing query matches all.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub owner_email: String,
}

#[derive(Serialize)]
pub struct FolderResp {
    pub message: &'static str,
    pub folder: Folder,
}

#[derive(Serialize)]
pub struct MessageResp {
    pub message: &'static str,
}

/// `POST /api/folders`
pub async fn create_folder(
    State(state): State<AppState>,
    payload: Result<Json<CreateFolderReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let folder = state
        .folders
        .create(NewFolder {
            name: req.name,
            visibility: req.visibility.as_ref().is_some_and(Flag::value),
            owner_email: req.owner_email,
            group_id: req.group_id.value()?,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FolderResp {
            message: "Folder created",
            folder,
        }),
    ))
}

/// `GET /api/folders?ownerEmail=`
pub async fn list_folders(
    State(state): State<AppState>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> Result<Json<Vec<Folder>>, AppError> {
    let Query(q) = query?;
    Ok(Json(state.folders.list(&q.owner_email).await?))
}

/// `GET /api/folders/search?query=&ownerEmail=`
pub async fn search_folders(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Folder>>, AppError> {
    let Query(q) = query?;
    Ok(Json(state.folders.search(&q.query, &q.owner_email).await?))
}

/// `PUT /api/folders/{id}`
///
/// Not restricted to the owner.
pub async fn update_folder(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateFolderReq>, JsonRejection>,
) -> Result<Json<FolderResp>, AppError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let folder = state
        .folders
        .update(
            id,
            FolderUpdate {
                name: req.name,
                visibility: req.visibility.as_ref().map(Flag::value),
            },
        )
        .await?;

    Ok(Json(FolderResp {
        message: "Folder updated",
        folder,
    }))
}

/// `DELETE /api/folders/{id}`
///
/// Succeeds whether or not the folder existed. Files inside are kept.
pub async fn delete_folder(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResp>, AppError> {
    let Path(id) = id?;
    state.folders.delete(id).await?;
    Ok(Json(MessageResp {
        message: "Folder deleted",
    }))
}
