use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Body of `GET /`.
#[derive(Serialize, Debug)]
pub struct IndexStatus {
    pub ok: bool,
    pub msg: &'static str,
}

impl IndexStatus {
    pub fn alive() -> Self {
        Self { ok: true, msg: "notes upload backend alive" }
    }
}

/// Uniform JSON error payload: `{error, detail?}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
