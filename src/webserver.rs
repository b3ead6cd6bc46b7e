use crate::certificate::CertificateInput;
use crate::configs::ServerConfig;
use crate::course::{CourseInput, Organization};
use crate::protocol::{Protocol, Request, Response};
use crate::roles::Role;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;

#[derive(Deserialize)]
struct IssueCertificatePayload {
    acting_wallet: String,
    #[serde(default)]
    anchor: bool,
    certificate: CertificateInput,
}

#[derive(Deserialize)]
struct ValidateCertificatePayload {
    #[serde(alias = "certificateId")]
    certificate_id: String,
}

#[derive(Deserialize)]
struct CertificateActionPayload {
    acting_wallet: String,
    #[serde(alias = "certificateId")]
    certificate_id: String,
}

#[derive(Deserialize)]
struct UpdateCertificatePayload {
    acting_wallet: String,
    #[serde(alias = "certificateId")]
    certificate_id: String,
    patch: Value,
}

#[derive(Deserialize)]
struct AssignRolePayload {
    acting_wallet: String,
    wallet_address: String,
    role: Role,
}

#[derive(Deserialize)]
struct CreateCoursePayload {
    acting_wallet: String,
    course: CourseInput,
}

#[derive(Deserialize)]
struct UpdateCoursePayload {
    acting_wallet: String,
    course_id: String,
    patch: Value,
}

#[derive(Deserialize)]
struct DeleteCoursePayload {
    acting_wallet: String,
    course_id: String,
}

/// Serve the registry API plus static files from the configured web root
pub async fn serve(config: &ServerConfig, protocol: Arc<Protocol>) -> anyhow::Result<()> {
    let app = router(protocol, &config.web_root);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    println!("✓ Registry server starting");
    println!("  Address: http://{}", addr);
    println!("  Serving static files from {}\n", config.web_root.display());

    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

pub fn router(protocol: Arc<Protocol>, web_root: &std::path::Path) -> Router {
    Router::new()
        .route("/api/status", get(registry_status))
        .route("/api/certificates", get(list_certificates))
        .route("/api/certificates/issue", post(issue_certificate))
        .route("/api/certificates/update", post(update_certificate))
        .route("/api/certificates/revoke", post(revoke_certificate))
        .route("/api/certificates/anchor", post(anchor_certificate))
        .route("/api/validation/certificate", post(validate_certificate))
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/courses/update", post(update_course))
        .route("/api/courses/delete", post(delete_course))
        .route(
            "/api/courses/:course_id/certificates",
            get(certificates_by_course),
        )
        .route("/api/roles/:wallet_address", get(get_role))
        .route("/api/roles/assign", post(assign_role))
        .route(
            "/api/organizations",
            get(list_organizations).post(register_organization),
        )
        .fallback_service(ServeDir::new(web_root))
        .with_state(protocol)
}

/// Fold a protocol response into an HTTP status + JSON body
fn respond(response: Response) -> (StatusCode, Json<Response>) {
    let status = match &response {
        Response::Error { kind, .. } => match kind.as_str() {
            "validation" => StatusCode::BAD_REQUEST,
            "not_found" => StatusCode::NOT_FOUND,
            "authorization" => StatusCode::FORBIDDEN,
            "policy" => StatusCode::CONFLICT,
            _ => StatusCode::BAD_GATEWAY,
        },
        _ => StatusCode::OK,
    };
    (status, Json(response))
}

async fn registry_status(
    State(protocol): State<Arc<Protocol>>,
) -> (StatusCode, Json<Response>) {
    respond(protocol.process(Request::RegistryStatus).await)
}

async fn list_certificates(
    State(protocol): State<Arc<Protocol>>,
) -> (StatusCode, Json<Response>) {
    respond(protocol.process(Request::ListCertificates).await)
}

async fn issue_certificate(
    State(protocol): State<Arc<Protocol>>,
    Json(payload): Json<IssueCertificatePayload>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::IssueCertificate {
                acting_wallet: payload.acting_wallet,
                anchor: payload.anchor,
                certificate: payload.certificate,
            })
            .await,
    )
}

async fn update_certificate(
    State(protocol): State<Arc<Protocol>>,
    Json(payload): Json<UpdateCertificatePayload>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::UpdateCertificate {
                acting_wallet: payload.acting_wallet,
                certificate_id: payload.certificate_id,
                patch: payload.patch,
            })
            .await,
    )
}

async fn revoke_certificate(
    State(protocol): State<Arc<Protocol>>,
    Json(payload): Json<CertificateActionPayload>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::RevokeCertificate {
                acting_wallet: payload.acting_wallet,
                certificate_id: payload.certificate_id,
            })
            .await,
    )
}

async fn anchor_certificate(
    State(protocol): State<Arc<Protocol>>,
    Json(payload): Json<CertificateActionPayload>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::AnchorCertificate {
                acting_wallet: payload.acting_wallet,
                certificate_id: payload.certificate_id,
            })
            .await,
    )
}

async fn validate_certificate(
    State(protocol): State<Arc<Protocol>>,
    Json(payload): Json<ValidateCertificatePayload>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::ValidateCertificate {
                certificate_id: payload.certificate_id,
            })
            .await,
    )
}

async fn certificates_by_course(
    State(protocol): State<Arc<Protocol>>,
    Path(course_id): Path<String>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::CertificatesByCourse { course_id })
            .await,
    )
}

async fn list_courses(State(protocol): State<Arc<Protocol>>) -> (StatusCode, Json<Response>) {
    respond(protocol.process(Request::ListCourses).await)
}

async fn create_course(
    State(protocol): State<Arc<Protocol>>,
    Json(payload): Json<CreateCoursePayload>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::CreateCourse {
                acting_wallet: payload.acting_wallet,
                course: payload.course,
            })
            .await,
    )
}

async fn update_course(
    State(protocol): State<Arc<Protocol>>,
    Json(payload): Json<UpdateCoursePayload>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::UpdateCourse {
                acting_wallet: payload.acting_wallet,
                course_id: payload.course_id,
                patch: payload.patch,
            })
            .await,
    )
}

async fn delete_course(
    State(protocol): State<Arc<Protocol>>,
    Json(payload): Json<DeleteCoursePayload>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::DeleteCourse {
                acting_wallet: payload.acting_wallet,
                course_id: payload.course_id,
            })
            .await,
    )
}

async fn get_role(
    State(protocol): State<Arc<Protocol>>,
    Path(wallet_address): Path<String>,
) -> (StatusCode, Json<Response>) {
    respond(protocol.process(Request::GetRole { wallet_address }).await)
}

async fn assign_role(
    State(protocol): State<Arc<Protocol>>,
    Json(payload): Json<AssignRolePayload>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::AssignRole {
                acting_wallet: payload.acting_wallet,
                wallet_address: payload.wallet_address,
                role: payload.role,
            })
            .await,
    )
}

async fn list_organizations(
    State(protocol): State<Arc<Protocol>>,
) -> (StatusCode, Json<Response>) {
    respond(protocol.process(Request::ListOrganizations).await)
}

async fn register_organization(
    State(protocol): State<Arc<Protocol>>,
    Json(organization): Json<Organization>,
) -> (StatusCode, Json<Response>) {
    respond(
        protocol
            .process(Request::RegisterOrganization { organization })
            .await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_statuses() {
        let cases = [
            ("validation", StatusCode::BAD_REQUEST),
            ("not_found", StatusCode::NOT_FOUND),
            ("authorization", StatusCode::FORBIDDEN),
            ("policy", StatusCode::CONFLICT),
            ("collaborator", StatusCode::BAD_GATEWAY),
        ];
        for (kind, expected) in cases {
            let (status, _) = respond(Response::Error {
                kind: kind.to_string(),
                message: "test".to_string(),
            });
            assert_eq!(status, expected, "kind {}", kind);
        }

        let (status, _) = respond(Response::Pong {
            message: "ok".to_string(),
        });
        assert_eq!(status, StatusCode::OK);
    }
}
