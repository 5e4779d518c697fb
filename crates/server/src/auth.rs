//! Authentication endpoints: signup, OTP verification, login, token
//! rotation, logout.

use api_types::Envelope;
use api_types::auth::{
    Login, LoginResponse, OtpDeliveryMethod, RefreshToken, RefreshTokenResponse, ResendOtp,
    SignupNew, UserView, VerifyOtp,
};
use axum::{Json, extract::State, http::StatusCode};
use axum_extra::{TypedHeader, headers::UserAgent};
use chrono::Utc;
use uuid::Uuid;

use engine::{
    AuthTokens, EngineError, NewUser, OtpChannel, OtpNotification, TokenKind, User, credentials,
};

use crate::{ServerError, ServerState, ok, ok_message};

const MIN_PASSWORD_LEN: usize = 8;

fn avatar_url(full_name: &str) -> String {
    format!("https://api.dicebear.com/9.x/micah/svg?seed={full_name}")
}

fn delivery_channel(method: OtpDeliveryMethod) -> OtpChannel {
    match method {
        OtpDeliveryMethod::Email => OtpChannel::Email,
        OtpDeliveryMethod::PhoneNumber => OtpChannel::Sms,
    }
}

fn channel_for_user(user: &User) -> OtpChannel {
    match user.verification_method.as_str() {
        "PHONE_NUMBER" => OtpChannel::Sms,
        _ => OtpChannel::Email,
    }
}

fn validate_signup(payload: &SignupNew) -> Result<(), ServerError> {
    let mut errors = Vec::new();
    if !payload.email.contains('@') {
        errors.push(api_types::ErrorDetail {
            message: "a valid email is required".to_string(),
            field: Some("email".to_string()),
        });
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        errors.push(api_types::ErrorDetail {
            message: format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            field: Some("password".to_string()),
        });
    }
    if payload.full_name.trim().is_empty() {
        errors.push(api_types::ErrorDetail {
            message: "full name is required".to_string(),
            field: Some("full_name".to_string()),
        });
    }
    if payload.otp_delivery_method == OtpDeliveryMethod::PhoneNumber
        && payload.phone_number.as_deref().unwrap_or("").trim().is_empty()
    {
        errors.push(api_types::ErrorDetail {
            message: "phone number is required for SMS delivery".to_string(),
            field: Some("phone_number".to_string()),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServerError::Validation(errors))
    }
}

async fn issue_and_send_otp(
    state: &ServerState,
    user: &User,
    channel: OtpChannel,
) -> Result<(), ServerError> {
    let otp = credentials::generate_otp();
    state
        .engine
        .issue_otp(user.id, &otp, credentials::otp_expiry())
        .await?;

    state
        .notifier
        .send_otp(&OtpNotification {
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            otp,
            channel,
        })
        .await?;
    Ok(())
}

pub async fn signup(
    State(state): State<ServerState>,
    Json(payload): Json<SignupNew>,
) -> Result<(StatusCode, Json<Envelope<()>>), ServerError> {
    validate_signup(&payload)?;

    let method = payload.otp_delivery_method;
    let user = state
        .engine
        .create_user(NewUser {
            email: payload.email.clone(),
            full_name: payload.full_name,
            password_hash: credentials::hash_password(&payload.password)?,
            phone_number: payload.phone_number,
            verification_method: match method {
                OtpDeliveryMethod::Email => "EMAIL".to_string(),
                OtpDeliveryMethod::PhoneNumber => "PHONE_NUMBER".to_string(),
            },
        })
        .await?;

    let mx_user = state
        .mx
        .create_user(&user.email, &user.id.to_string())
        .await
        .map_err(|err| {
            tracing::error!("error creating aggregator user: {err}");
            EngineError::Upstream("error creating mx user".to_string())
        })?;
    state.engine.link_mx_user(user.id, &mx_user.guid).await?;

    issue_and_send_otp(&state, &user, delivery_channel(method)).await?;

    let target = match method {
        OtpDeliveryMethod::Email => "email",
        OtpDeliveryMethod::PhoneNumber => "phone",
    };
    Ok(ok_message(&format!(
        "Account created. Please check your {target} for the OTP."
    )))
}

pub async fn verify_otp(
    State(state): State<ServerState>,
    Json(payload): Json<VerifyOtp>,
) -> Result<(StatusCode, Json<Envelope<()>>), ServerError> {
    let token = state
        .engine
        .find_token(&payload.otp, TokenKind::Otp)
        .await?
        .ok_or_else(|| ServerError::validation("Invalid or expired token"))?;

    if token.is_expired(Utc::now()) {
        state
            .engine
            .delete_tokens(token.user_id, TokenKind::Otp)
            .await?;
        return Err(ServerError::validation("Invalid or expired token"));
    }

    state.engine.mark_user_verified(token.user_id).await?;
    state.engine.consume_token(token.id).await?;

    Ok(ok_message("OTP verified successfully"))
}

pub async fn resend_otp(
    State(state): State<ServerState>,
    Json(payload): Json<ResendOtp>,
) -> Result<(StatusCode, Json<Envelope<()>>), ServerError> {
    let user = state
        .engine
        .user_by_email(&payload.email)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("user".to_string()))?;

    if user.is_verified {
        return Err(ServerError::validation("user already verified"));
    }

    issue_and_send_otp(&state, &user, channel_for_user(&user)).await?;
    Ok(ok_message("A new OTP has been sent."))
}

pub async fn login(
    State(state): State<ServerState>,
    user_agent: Option<TypedHeader<UserAgent>>,
    Json(payload): Json<Login>,
) -> Result<(StatusCode, Json<Envelope<LoginResponse>>), ServerError> {
    let user = state
        .engine
        .user_by_email(&payload.email)
        .await?
        .ok_or_else(|| EngineError::Unauthorized("invalid credentials".to_string()))?;

    if !credentials::verify_password(&payload.password, &user.password_hash)? {
        return Err(EngineError::Unauthorized("invalid credentials".to_string()).into());
    }
    if !user.is_verified {
        return Err(EngineError::Unauthorized("user is not verified".to_string()).into());
    }

    let access_token = state.auth.generate_access_token(user.id, &user.email)?;
    let refresh_token = state.auth.generate_refresh_token(user.id)?;
    state
        .engine
        .issue_refresh_token(
            user.id,
            &refresh_token,
            AuthTokens::refresh_expiry(),
            user_agent.map(|ua| ua.as_str().to_string()),
        )
        .await?;

    Ok(ok(LoginResponse {
        access_token,
        refresh_token,
        user: UserView {
            id: user.id.to_string(),
            email: user.email,
            avatar: avatar_url(&user.full_name),
            full_name: user.full_name,
        },
    }))
}

pub async fn refresh_token(
    State(state): State<ServerState>,
    user_agent: Option<TypedHeader<UserAgent>>,
    Json(payload): Json<RefreshToken>,
) -> Result<(StatusCode, Json<Envelope<RefreshTokenResponse>>), ServerError> {
    let claims = state.auth.verify_refresh(&payload.refresh_token)?;

    let stored = state
        .engine
        .find_token(&payload.refresh_token, TokenKind::RefreshToken)
        .await?
        .ok_or_else(|| EngineError::Unauthorized("invalid refresh token".to_string()))?;

    if stored.is_expired(Utc::now()) {
        state
            .engine
            .delete_tokens(stored.user_id, TokenKind::RefreshToken)
            .await?;
        return Err(EngineError::Unauthorized("refresh token expired".to_string()).into());
    }

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| EngineError::Unauthorized("invalid refresh token".to_string()))?;
    let user = state.engine.user_by_id(user_id).await?;

    let access_token = state.auth.generate_access_token(user.id, &user.email)?;
    let refresh_token = state.auth.generate_refresh_token(user.id)?;
    state
        .engine
        .issue_refresh_token(
            user.id,
            &refresh_token,
            AuthTokens::refresh_expiry(),
            user_agent.map(|ua| ua.as_str().to_string()),
        )
        .await?;

    Ok(ok(RefreshTokenResponse {
        access_token,
        refresh_token,
    }))
}

pub async fn logout(
    State(state): State<ServerState>,
    Json(payload): Json<RefreshToken>,
) -> Result<(StatusCode, Json<Envelope<()>>), ServerError> {
    if let Some(stored) = state
        .engine
        .find_token(&payload.refresh_token, TokenKind::RefreshToken)
        .await?
    {
        state
            .engine
            .delete_tokens(stored.user_id, TokenKind::RefreshToken)
            .await?;
    }

    Ok(ok_message("Logged out successfully"))
}
