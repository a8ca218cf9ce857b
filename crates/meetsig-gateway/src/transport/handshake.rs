//! Handshake gate (pre-upgrade admission).
//!
//! Every check runs before the HTTP connection is upgraded, in this order:
//! identities present, credential valid, room exists, room window open,
//! caller is a member, path identity belongs to the caller. The first
//! failure is returned as a structured HTTP rejection and nothing is
//! registered with the hub.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;

use meetsig_core::error::{ClientCode, Result, SignalError};

use crate::directory::{Claims, IdentityVerifier, Membership, RoomDirectory, RoomRecord};
use crate::policy::JoinWindow;

/// A caller that passed every admission check.
#[derive(Debug, Clone)]
pub struct Admission {
    pub room_identity: String,
    pub user_identity: String,
    pub room: RoomRecord,
    pub claims: Claims,
    pub display_name: Option<String>,
}

pub struct HandshakeGate {
    identity: Arc<dyn IdentityVerifier>,
    rooms: Arc<dyn RoomDirectory>,
    members: Arc<dyn Membership>,
    window: JoinWindow,
}

impl HandshakeGate {
    pub fn new(
        identity: Arc<dyn IdentityVerifier>,
        rooms: Arc<dyn RoomDirectory>,
        members: Arc<dyn Membership>,
        window: JoinWindow,
    ) -> Self {
        Self { identity, rooms, members, window }
    }

    pub async fn admit(
        &self,
        room_identity: &str,
        user_identity: &str,
        credential: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        if room_identity.is_empty() || user_identity.is_empty() {
            return Err(SignalError::BadRequest(
                "room identity and user identity are required".into(),
            ));
        }

        let credential = credential.map(str::trim).unwrap_or_default();
        if credential.is_empty() {
            return Err(SignalError::Unauthorized("token is required".into()));
        }
        let claims = self.identity.verify(credential).await?;

        let room = self.rooms.resolve(room_identity).await?;

        self.window
            .check_room(&room, now)
            .map_err(SignalError::OutOfWindow)?;

        if !self.members.is_member(room.id, claims.id).await? {
            return Err(SignalError::Forbidden("user is not a member of the room".into()));
        }

        let display_name = self.members.display_name(room.id, claims.id).await?;
        if !identity_matches(user_identity, &claims, display_name.as_deref()) {
            return Err(SignalError::Forbidden("identity mismatch".into()));
        }

        Ok(Admission {
            room_identity: room_identity.to_string(),
            user_identity: user_identity.to_string(),
            room,
            claims,
            display_name,
        })
    }
}

/// The path identity may be the numeric user id, the account name (any
/// case), or the caller's display name in this room (exact).
pub fn identity_matches(identity: &str, claims: &Claims, member_display_name: Option<&str>) -> bool {
    if identity.is_empty() {
        return false;
    }
    if identity == claims.id.to_string() {
        return true;
    }
    if identity.to_lowercase() == claims.display_name.to_lowercase() {
        return true;
    }
    member_display_name.is_some_and(|name| identity == name)
}

/// HTTP rejection for a failed handshake.
#[derive(Debug)]
pub struct Rejection(pub SignalError);

impl From<SignalError> for Rejection {
    fn from(e: SignalError) -> Self {
        Self(e)
    }
}

fn status_for(code: ClientCode) -> StatusCode {
    match code {
        ClientCode::BadRequest => StatusCode::BAD_REQUEST,
        ClientCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ClientCode::NotFound => StatusCode::NOT_FOUND,
        ClientCode::Forbidden => StatusCode::FORBIDDEN,
        ClientCode::Conflict => StatusCode::CONFLICT,
        ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let code = self.0.client_code();
        let status = status_for(code);
        let mut body = json!({
            "code": status.as_u16(),
            "reason": code.as_str(),
            "msg": self.0.to_string(),
        });
        if let Some(detail) = self.0.detail() {
            body["detail"] = json!(detail);
        }
        (status, Json(body)).into_response()
    }
}
