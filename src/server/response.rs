//! The uniform response envelope (spec §6 "Every response follows
//! `{success:bool, message:string, data:any, token?:string|null}`").

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
            data,
            token: None,
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            token: None,
        }
    }

    pub fn ok_with_token(data: T, token: String) -> Self {
        Self {
            success: true,
            message: "ok".to_string(),
            data,
            token: Some(token),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: (),
            token: None,
        }
    }
}
