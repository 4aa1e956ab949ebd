//! Store events published for out-of-band observers.

use serde::Serialize;

use super::entities::Otp;

/// Kind of store event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpEventKind {
    /// An attempt was consumed
    Check,
    /// The record was verified
    Close,
}

/// `{type, namespace, id, data}` notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtpEvent {
    #[serde(rename = "type")]
    pub kind: OtpEventKind,
    pub namespace: String,
    pub id: String,
    /// The record for `check`, null for `close`
    pub data: Option<Otp>,
}

impl OtpEvent {
    pub fn check(otp: &Otp) -> Self {
        Self {
            kind: OtpEventKind::Check,
            namespace: otp.namespace.clone(),
            id: otp.id.clone(),
            data: Some(otp.clone()),
        }
    }

    pub fn close(namespace: &str, id: &str) -> Self {
        Self {
            kind: OtpEventKind::Close,
            namespace: namespace.to_string(),
            id: id.to_string(),
            data: None,
        }
    }
}
