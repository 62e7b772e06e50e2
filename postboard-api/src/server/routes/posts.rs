use crate::{
    server::{
        Result, ServerError, ServerRouter, ServerState, SharedRepository,
        json::{Created, Json},
        lock,
    },
    session::WalletSession,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::model::post::{Post, PostDraft, PostId};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_delete(delete_post)
        .typed_patch(edit_post)
        .typed_post(like_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

async fn list_posts(
    PostsPath(): PostsPath,
    State(repository): State<SharedRepository>,
) -> Json<Vec<Post>> {
    Json(lock(&repository).posts().to_vec())
}

#[axum::debug_handler(state = ServerState)]
async fn create_post(
    PostsPath(): PostsPath,
    State(repository): State<SharedRepository>,
    State(wallet): State<Arc<WalletSession>>,
    Json(draft): Json<PostDraft>,
) -> Result<Created<Vec<Post>>> {
    let author = wallet.author().await;

    let posts = lock(&repository).add(draft, author)?.to_vec();
    Ok(Created(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: PostId,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(repository): State<SharedRepository>,
) -> Result<Json<Post>> {
    let post = lock(&repository)
        .get(id)
        .cloned()
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(repository): State<SharedRepository>,
) -> Result<Json<Vec<Post>>> {
    let posts = lock(&repository).delete(id)?.to_vec();

    Ok(Json(posts))
}

async fn edit_post(
    PostPath { id }: PostPath,
    State(repository): State<SharedRepository>,
) -> Result<Json<Post>> {
    let post = lock(&repository).edit(id)?.clone();

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct LikePostPath {
    id: PostId,
}

async fn like_post(
    LikePostPath { id }: LikePostPath,
    State(repository): State<SharedRepository>,
) -> Result<Json<Vec<Post>>> {
    let posts = lock(&repository).like(id)?.to_vec();

    Ok(Json(posts))
}
