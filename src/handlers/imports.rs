use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    imports::ImportError,
    AppState,
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::error;

pub fn router() -> Router<AppState> {
    Router::new().route("/products", post(import_products))
}

fn is_csv_upload(file_name: &str, content_type: Option<&str>) -> bool {
    let by_extension = file_name.to_lowercase().ends_with(".csv");
    let by_mime = content_type
        .map(|ct| ct.contains("csv") || ct == "text/plain" || ct == "application/octet-stream")
        .unwrap_or(true);
    by_extension && by_mime
}

/// Bulk catalog upload. Batch-shape problems are 400 with a flat
/// `{ "error": ... }` body; per-row outcomes ride in the 200 report.
async fn import_products(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload: Option<(String, String)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::flat(
            StatusCode::BAD_REQUEST,
            format!("Could not read upload: {}", e),
        )
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let content_type = field.content_type().map(str::to_string);

        if !is_csv_upload(&file_name, content_type.as_deref()) {
            return Err(ApiError::flat(
                StatusCode::BAD_REQUEST,
                "Upload must be a .csv file",
            ));
        }

        let bytes = field.bytes().await.map_err(|e| {
            ApiError::flat(
                StatusCode::BAD_REQUEST,
                format!("Could not read upload: {}", e),
            )
        })?;
        let content = String::from_utf8(bytes.to_vec()).map_err(|_| {
            ApiError::flat(StatusCode::BAD_REQUEST, "CSV file must be UTF-8 encoded")
        })?;

        upload = Some((file_name, content));
        break;
    }

    let (file_name, content) = upload.ok_or_else(|| {
        ApiError::flat(StatusCode::BAD_REQUEST, "Missing 'file' field in upload")
    })?;

    match state
        .services
        .imports
        .import(&file_name, &content, &user.actor())
        .await
    {
        Ok(report) => Ok(Json(report)),
        Err(e @ (ImportError::Empty | ImportError::MissingColumns(_) | ImportError::TooManyRows(_))) => {
            Err(ApiError::flat(StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

/// Flat 500 used by the panic-recovery layer around this route. Earlier
/// rows commit independently, so the message must not claim nothing was
/// imported.
pub fn unexpected_failure_response() -> ApiError {
    error!("Import aborted unexpectedly");
    ApiError::flat(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Import failed unexpectedly; rows processed before the failure may already have been imported",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_uploads_are_checked_by_extension_and_mime() {
        assert!(is_csv_upload("products.csv", Some("text/csv")));
        assert!(is_csv_upload("PRODUCTS.CSV", None));
        assert!(is_csv_upload("products.csv", Some("application/octet-stream")));

        assert!(!is_csv_upload("products.xlsx", Some("text/csv")));
        assert!(!is_csv_upload("products.csv", Some("image/png")));
    }
}
