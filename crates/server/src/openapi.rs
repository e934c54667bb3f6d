use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct IndexResponseDoc { pub ok: bool, pub msg: String }

#[derive(ToSchema)]
pub struct ErrorResponseDoc { pub error: String, pub detail: Option<String> }

#[derive(ToSchema)]
pub struct CheckResponseDoc { pub available: bool }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequestDoc { pub user_id: String, pub display_name: Option<String> }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponseDoc { pub success: bool, pub user_id: String, pub token: String }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFormDoc {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub user_id: String,
    pub token: String,
}

#[derive(ToSchema)]
pub struct UploadResponseDoc { pub success: bool, pub url: String, pub path: String }

#[derive(ToSchema)]
pub struct FileEntryDoc { pub name: String, pub path: String, pub download_url: Option<String> }

#[derive(ToSchema)]
pub struct ListResponseDoc { pub success: bool, pub files: Vec<FileEntryDoc> }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequestDoc { pub file_path: String, pub user_id: String, pub token: String }

#[derive(ToSchema)]
pub struct SuccessResponseDoc { pub success: bool }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::index,
        crate::routes::health,
        crate::routes::users::check,
        crate::routes::users::register,
        crate::routes::notes::upload,
        crate::routes::notes::list,
        crate::routes::notes::delete,
    ),
    components(
        schemas(
            HealthResponse,
            IndexResponseDoc,
            ErrorResponseDoc,
            CheckResponseDoc,
            RegisterRequestDoc,
            RegisterResponseDoc,
            UploadFormDoc,
            UploadResponseDoc,
            FileEntryDoc,
            ListResponseDoc,
            DeleteRequestDoc,
            SuccessResponseDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "users"),
        (name = "notes")
    )
)]
pub struct ApiDoc;
