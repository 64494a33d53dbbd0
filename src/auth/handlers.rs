use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AdminUpdateUserRequest, AuthResponse, ForgotPasswordRequest, LoginRequest,
            MessageResponse, RegisterRequest, ResetPasswordRequest, SuccessResponse,
            UpdatePasswordRequest, UpdateProfileRequest, UserResponse, UsersResponse,
        },
        password::{hash_password, verify_password},
        reset,
        services::{normalize_email, public_base_url, validate_name, validate_password},
        session::{expired_cookie, session_cookie, AdminOnly, AuthUser, Authorized},
    },
    error::AppError,
    extract::{ApiJson, ApiPath},
    mail::Email,
    state::AppState,
    users::{Avatar, NewUser, Role, User, UserPatch},
};

const INVALID_CREDENTIALS: &str = "invalid email or password";
const INVALID_RESET_TOKEN: &str = "Password is invalid or token has expired";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/:token", put(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/update", put(update_profile))
        .route("/password/update", put(update_password))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(all_users))
        .route(
            "/admin/user/:id",
            get(get_user_details).put(update_user).delete(delete_user),
        )
}

/// Issues a session for `user`: cookie plus token and user in the body.
fn send_token(state: &AppState, user: User) -> Result<Response, AppError> {
    let token = state.jwt.issue(user.id)?;
    let cookie = session_cookie(&state.config.cookie, &token, OffsetDateTime::now_utc())?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            success: true,
            token,
            user,
        }),
    )
        .into_response())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Response, AppError> {
    let name = validate_name(&payload.name)?;
    let email = normalize_email(&payload.email)?;
    validate_password(&payload.password)?;

    let hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            name: &name,
            email: &email,
            password: &hash,
            role: Role::User,
            avatar: Avatar::default(),
        })
        .await
        .map_err(|e| {
            warn!(error = %e, email = %email, "register failed");
            e
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    send_token(&state, user)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    let email = payload.email.map(|e| e.trim().to_lowercase()).unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("Please enter email and password".into()));
    }

    let Some(creds) = state.users.credentials_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(&password, &creds.password_hash)? {
        warn!(user_id = %creds.id, "login invalid password");
        return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.into()));
    }

    let user = state
        .users
        .find_by_id(creds.id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated(INVALID_CREDENTIALS.into()))?;

    info!(user_id = %user.id, "user logged in");
    send_token(&state, user)
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> Result<Response, AppError> {
    let cookie = expired_cookie(&state.config.cookie)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            success: true,
            message: "Logged Out Successfully".into(),
        }),
    )
        .into_response())
}

#[instrument(skip(state, headers, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found with this email".into()))?;

    let token = reset::generate();
    let ttl = Duration::minutes(state.config.reset_ttl_minutes);
    reset::attach(state.users.as_ref(), user.id, &token.hash, ttl).await?;

    let reset_url = format!(
        "{}/api/v1/password/reset/{}",
        public_base_url(state.config.public_url.as_deref(), &headers),
        token.plaintext
    );
    let body = format!(
        "Your password reset token is as follows:\n\n{}\n\nIf you have not requested this email, then ignore it.",
        reset_url
    );

    let sent = state
        .mailer
        .send(Email {
            to: user.email.clone(),
            subject: "ShopIt Password Recovery".into(),
            body,
        })
        .await;

    if let Err(e) = sent {
        error!(error = %e, user_id = %user.id, "reset email failed; clearing token");
        reset::clear(state.users.as_ref(), user.id).await?;
        return Err(e.into());
    }

    info!(user_id = %user.id, "password reset email sent");
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Email sent to: {}", user.email),
    }))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Response, AppError> {
    let pending = reset::resolve(state.users.as_ref(), &token)
        .await?
        .ok_or_else(|| {
            warn!("reset with invalid or expired token");
            AppError::BadRequest(INVALID_RESET_TOKEN.into())
        })?;

    if payload.password != payload.confirm_password {
        return Err(AppError::BadRequest("Password does not match".into()));
    }
    validate_password(&payload.password)?;

    let hash = hash_password(&payload.password)?;
    let user = reset::consume(state.users.as_ref(), &token, &hash)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %pending.id, "reset token spent by a concurrent request");
            AppError::BadRequest(INVALID_RESET_TOKEN.into())
        })?;

    info!(user_id = %user.id, "password reset");
    send_token(&state, user)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        error!(user_id = %user_id, "user not found");
        AppError::Unauthenticated("User not found".into())
    })?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let patch = UserPatch {
        name: payload.name.as_deref().map(validate_name).transpose()?,
        email: payload.email.as_deref().map(normalize_email).transpose()?,
        role: None,
    };

    state
        .users
        .update(user_id, patch)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;

    info!(user_id = %user_id, "profile updated");
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<UpdatePasswordRequest>,
) -> Result<Response, AppError> {
    let creds = state
        .users
        .credentials_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;

    if !verify_password(&payload.old_password, &creds.password_hash)? {
        warn!(user_id = %user_id, "update password with wrong old password");
        return Err(AppError::Unauthenticated("Old password is incorrect".into()));
    }
    validate_password(&payload.password)?;

    let hash = hash_password(&payload.password)?;
    state.users.set_password_hash(user_id, hash.as_str()).await?;

    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;

    info!(user_id = %user_id, "password updated");
    send_token(&state, user)
}

#[instrument(skip(state, _admin))]
pub async fn all_users(
    Authorized(_admin, _): Authorized<AdminOnly>,
    State(state): State<AppState>,
) -> Result<Json<UsersResponse>, AppError> {
    let users = state.users.list().await?;
    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

fn user_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User not found with id: {}", id))
}

#[instrument(skip(state, _admin))]
pub async fn get_user_details(
    Authorized(_admin, _): Authorized<AdminOnly>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state, admin, payload))]
pub async fn update_user(
    Authorized(admin, _): Authorized<AdminOnly>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<AdminUpdateUserRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let patch = UserPatch {
        name: payload.name.as_deref().map(validate_name).transpose()?,
        email: payload.email.as_deref().map(normalize_email).transpose()?,
        role: payload.role,
    };

    state
        .users
        .update(id, patch)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    info!(admin_id = %admin.id, user_id = %id, "user updated by admin");
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    Authorized(admin, _): Authorized<AdminOnly>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.users.delete(id).await? {
        return Err(user_not_found(id));
    }
    info!(admin_id = %admin.id, user_id = %id, "user deleted by admin");
    Ok(Json(SuccessResponse { success: true }))
}
