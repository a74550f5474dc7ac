use anyhow::Result;
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tracing::debug;

use crate::catalog_store::{
    group_artist_albums, AlbumPatch, CatalogError, CatalogStore, Cost, NewAlbum, NewArtist,
    NewSong, DEFAULT_ALBUM_NAME,
};
use crate::user::{
    LoginRequest, RegistrationRequest, UserManager, UserStore, UserUpdate,
};
use crate::validation::MSG_REQUIRED;

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::media::{
    discard_media_file, parse_song_upload, serve_media_file, store_media_file, SONG_AUDIO_DIR,
    SONG_IMAGES_DIR,
};
use super::session::Session;
use super::state::*;
use super::{log_requests, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

// =============================================================================
// Artists
// =============================================================================

async fn get_artists(State(catalog_store): State<GuardedCatalogStore>) -> ApiResult<Response> {
    let artists = catalog_store.list_artists()?;
    Ok(Json(artists).into_response())
}

/// Grouped artist→albums mapping, one key per stage name, in join order.
async fn get_artists_albums(
    State(catalog_store): State<GuardedCatalogStore>,
) -> ApiResult<Response> {
    let rows = catalog_store.list_artist_album_rows()?;
    let mut body = serde_json::Map::new();
    for (stage_name, entry) in group_artist_albums(rows) {
        body.insert(
            stage_name,
            serde_json::to_value(entry).map_err(anyhow::Error::from)?,
        );
    }
    Ok(Json(serde_json::Value::Object(body)).into_response())
}

async fn get_artist(
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let artist = catalog_store.get_artist(id)?.ok_or(ApiError::NotFound)?;
    let counts = catalog_store
        .artist_album_counts(id)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(serde_json::json!({
        "id": artist.id,
        "stage_name": artist.stage_name,
        "social_link": artist.social_link,
        "albums": counts.albums,
        "approved_albums": counts.approved_albums,
    }))
    .into_response())
}

#[derive(Deserialize, Debug)]
struct CreateArtistBody {
    pub stage_name: Option<String>,
    pub social_link: Option<String>,
}

async fn post_artist(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Json(body): Json<CreateArtistBody>,
) -> ApiResult<Response> {
    let stage_name = match body.stage_name.filter(|s| !s.is_empty()) {
        Some(stage_name) => stage_name,
        None => return Err(ApiError::field("stage_name", MSG_REQUIRED)),
    };
    let artist = catalog_store.create_artist(NewArtist {
        stage_name,
        social_link: body.social_link,
    })?;
    Ok((StatusCode::CREATED, Json(artist)).into_response())
}

// =============================================================================
// Albums
// =============================================================================

// `cost` stays a raw value here so a malformed amount becomes a field-scoped
// validation error rather than a body-level deserialization rejection.
#[derive(Deserialize, Debug)]
struct CreateAlbumBody {
    pub artist: Option<i64>,
    pub album_name: Option<String>,
    pub released_at: Option<i64>,
    pub cost: Option<serde_json::Value>,
}

async fn post_album(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Json(body): Json<CreateAlbumBody>,
) -> ApiResult<Response> {
    let mut errors = crate::validation::FieldErrors::new();
    if body.artist.is_none() {
        errors.push("artist", MSG_REQUIRED);
    }
    if body.released_at.is_none() {
        errors.push("released_at", MSG_REQUIRED);
    }
    let cost = match &body.cost {
        Some(raw) => match Cost::from_json(raw) {
            Ok(cost) => Some(cost),
            Err(e) => {
                errors.push("cost", e.to_string());
                None
            }
        },
        None => {
            errors.push("cost", MSG_REQUIRED);
            None
        }
    };
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let artist_id = body.artist.expect("validated above");
    let new_album = NewAlbum {
        artist_id,
        album_name: body
            .album_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_ALBUM_NAME.to_string()),
        released_at: body.released_at.expect("validated above"),
        cost: cost.expect("validated above"),
    };

    match catalog_store.create_album(new_album) {
        Ok(album) => Ok((StatusCode::CREATED, Json(album)).into_response()),
        Err(CatalogError::UnknownArtist(id)) => Err(ApiError::field(
            "artist",
            &format!("Invalid pk \"{}\" - object does not exist.", id),
        )),
        Err(e) => Err(e.into()),
    }
}

#[derive(Deserialize, Debug)]
struct PatchAlbumBody {
    pub album_name: Option<String>,
    pub released_at: Option<i64>,
    pub cost: Option<serde_json::Value>,
}

async fn patch_album(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(body): Json<PatchAlbumBody>,
) -> ApiResult<Response> {
    let cost = match &body.cost {
        Some(raw) => {
            Some(Cost::from_json(raw).map_err(|e| ApiError::field("cost", &e.to_string()))?)
        }
        None => None,
    };
    let album = catalog_store.update_album(
        id,
        AlbumPatch {
            album_name: body.album_name,
            released_at: body.released_at,
            cost,
        },
    )?;
    Ok(Json(album).into_response())
}

async fn delete_album(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    catalog_store.delete_album(id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Deserialize, Debug)]
struct ApproveAlbumsBody {
    pub ids: Vec<i64>,
}

#[derive(Serialize)]
struct ApproveAlbumsResponse {
    pub approved: usize,
    pub message: String,
}

async fn approve_albums(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Json(body): Json<ApproveAlbumsBody>,
) -> ApiResult<Response> {
    let approved = catalog_store.approve_albums(&body.ids)?;
    let message = if approved == 1 {
        format!("{} album was successfully approved", approved)
    } else {
        format!("{} albums were successfully approved", approved)
    };
    Ok(Json(ApproveAlbumsResponse { approved, message }).into_response())
}

// =============================================================================
// Songs
// =============================================================================

async fn post_song(
    _session: Session,
    State(state): State<ServerState>,
    Path(album_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Response> {
    if state.catalog_store.get_album(album_id)?.is_none() {
        return Err(ApiError::NotFound);
    }

    let upload = parse_song_upload(multipart).await?;

    let media_path = &state.config.media_path;
    let audio_uri = store_media_file(
        media_path,
        SONG_AUDIO_DIR,
        &upload.audio.file_name,
        &upload.audio.bytes,
    )?;
    let image_uri = match &upload.image {
        Some(image) => Some(store_media_file(
            media_path,
            SONG_IMAGES_DIR,
            &image.file_name,
            &image.bytes,
        )?),
        None => None,
    };

    let song = match state.catalog_store.create_song(NewSong {
        album_id,
        name: upload.name,
        image_uri: image_uri.clone(),
        audio_uri: audio_uri.clone(),
    }) {
        Ok(song) => song,
        Err(e) => {
            // The row never landed, so the stored files must not linger.
            discard_media_file(media_path, &audio_uri);
            if let Some(uri) = &image_uri {
                discard_media_file(media_path, uri);
            }
            return Err(e.into());
        }
    };
    Ok((StatusCode::CREATED, Json(song)).into_response())
}

#[derive(Deserialize, Debug)]
struct RenameSongBody {
    pub name: Option<String>,
}

async fn patch_song(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
    Json(body): Json<RenameSongBody>,
) -> ApiResult<Response> {
    let name = match body.name.filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => return Err(ApiError::field("name", MSG_REQUIRED)),
    };
    let song = catalog_store.rename_song(id, &name)?;
    Ok(Json(song).into_response())
}

async fn delete_song(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    catalog_store.delete_song(id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Deserialize, Debug)]
struct DeleteSongsBody {
    pub ids: Vec<i64>,
}

async fn delete_songs(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Json(body): Json<DeleteSongsBody>,
) -> ApiResult<Response> {
    catalog_store.delete_songs(&body.ids)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn get_song_audio(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let song = state.catalog_store.get_song(id)?.ok_or(ApiError::NotFound)?;
    Ok(serve_media_file(&state.config.media_path, &song.audio_uri))
}

async fn get_song_image(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let song = state.catalog_store.get_song(id)?.ok_or(ApiError::NotFound)?;
    match song.image_uri {
        Some(uri) => Ok(serve_media_file(&state.config.media_path, &uri)),
        None => Err(ApiError::NotFound),
    }
}

// =============================================================================
// Users and authentication
// =============================================================================

async fn get_user(
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let user = user_manager.lock().unwrap().get_user(id)?;
    Ok(Json(user).into_response())
}

async fn patch_user(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdate>,
) -> ApiResult<Response> {
    let user = user_manager
        .lock()
        .unwrap()
        .update_user(session.user_id, id, body, false)?;
    Ok(Json(user).into_response())
}

async fn put_user(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdate>,
) -> ApiResult<Response> {
    let user = user_manager
        .lock()
        .unwrap()
        .update_user(session.user_id, id, body, true)?;
    Ok(Json(user).into_response())
}

async fn register(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<RegistrationRequest>,
) -> ApiResult<Response> {
    let registered = user_manager.lock().unwrap().register(body)?;
    Ok((StatusCode::CREATED, Json(registered)).into_response())
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
    user: crate::user::User,
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Response> {
    debug!("login() called for {:?}", body.username);
    let (token, user) = user_manager.lock().unwrap().login(body)?;

    let response_body = LoginSuccessResponse {
        token: token.value.0.clone(),
        user,
    };
    let response_body = serde_json::to_string(&response_body).map_err(anyhow::Error::from)?;

    let cookie_value = HeaderValue::from_str(&format!(
        "session_token={}; Path=/; HttpOnly",
        token.value.0
    ))
    .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(response::Builder::new()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .header(axum::http::header::SET_COOKIE, cookie_value)
        .body(Body::from(response_body))
        .map_err(|e| ApiError::Internal(e.into()))?)
}

async fn logout(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> ApiResult<Response> {
    user_manager.lock().unwrap().logout(&session.token)?;
    Ok(response::Builder::new()
        .status(StatusCode::NO_CONTENT)
        .header(
            axum::http::header::SET_COOKIE,
            "session_token=; Path=/; Max-Age=0",
        )
        .body(Body::empty())
        .map_err(|e| ApiError::Internal(e.into()))?)
}

// =============================================================================
// App assembly
// =============================================================================

impl ServerState {
    pub fn new(
        config: ServerConfig,
        catalog_store: GuardedCatalogStore,
        user_manager: UserManager,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            catalog_store,
            user_manager: Arc::new(Mutex::new(user_manager)),
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    catalog_store: GuardedCatalogStore,
    user_store: Box<dyn UserStore>,
) -> Result<Router> {
    let user_manager = UserManager::new(user_store);
    let state = ServerState::new(config, catalog_store, user_manager);

    let auth_routes: Router = Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/logout/", post(logout))
        .with_state(state.clone());

    // Nested routers in axum 0.8 cannot match the bare trailing-slash
    // prefix ("/artists/"), so those collection roots are routed here
    // with their full paths and merged alongside the nests.
    let collection_routes: Router = Router::new()
        .route("/artists/", get(get_artists))
        .route("/artists/", post(post_artist))
        .route("/albums/", post(post_album))
        .with_state(state.clone());

    let artist_routes: Router = Router::new()
        .route("/albums/", get(get_artists_albums))
        .route("/{id}/", get(get_artist))
        .with_state(state.clone());

    let album_routes: Router = Router::new()
        .route("/approve/", post(approve_albums))
        .route("/{id}", patch(patch_album))
        .route("/{id}", delete(delete_album))
        .route("/{id}/songs/", post(post_song))
        .with_state(state.clone());

    let song_routes: Router = Router::new()
        .route("/delete/", post(delete_songs))
        .route("/{id}", patch(patch_song))
        .route("/{id}", delete(delete_song))
        .route("/{id}/audio", get(get_song_audio))
        .route("/{id}/image", get(get_song_image))
        .with_state(state.clone());

    let user_routes: Router = Router::new()
        .route("/{id}/", get(get_user))
        .route("/{id}/", patch(patch_user))
        .route("/{id}/", put(put_user))
        .with_state(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let app: Router = home_router
        .merge(collection_routes)
        .nest("/authentication", auth_routes)
        .nest("/artists", artist_routes)
        .nest("/albums", album_routes)
        .nest("/songs", song_routes)
        .nest("/users", user_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    catalog_store: GuardedCatalogStore,
    user_store: Box<dyn UserStore>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, catalog_store, user_store)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
