//! Protocol Module
//!
//! Request/response types for the registry API and the processor that
//! dispatches them. Every mutating request names the acting wallet; the
//! processor clears it through the role authority before touching the
//! certificate store or course catalog, so authorization lives in exactly
//! one place.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::certificate::{Certificate, CertificateInput};
use crate::course::{Course, CourseCatalog, CourseInput, Organization, OrganizationDirectory};
use crate::document_store::DocumentStore;
use crate::error::{RegistryError, Result};
use crate::pinning::ContentPinner;
use crate::roles::{Role, RoleAuthority};
use crate::statistics::{collect_registry_stats, RegistryStats};
use crate::store::{CertificateStore, ValidationReport};

/// Request types from API clients
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Request {
    IssueCertificate {
        acting_wallet: String,
        /// Attempt content anchoring before the record is persisted
        #[serde(default)]
        anchor: bool,
        certificate: CertificateInput,
    },
    ListCertificates,
    CertificatesByCourse {
        course_id: String,
    },
    UpdateCertificate {
        acting_wallet: String,
        certificate_id: String,
        patch: Value,
    },
    ValidateCertificate {
        certificate_id: String,
    },
    RevokeCertificate {
        acting_wallet: String,
        certificate_id: String,
    },
    AnchorCertificate {
        acting_wallet: String,
        certificate_id: String,
    },
    GetRole {
        wallet_address: String,
    },
    AssignRole {
        acting_wallet: String,
        wallet_address: String,
        role: Role,
    },
    CreateCourse {
        acting_wallet: String,
        course: CourseInput,
    },
    ListCourses,
    UpdateCourse {
        acting_wallet: String,
        course_id: String,
        patch: Value,
    },
    DeleteCourse {
        acting_wallet: String,
        course_id: String,
    },
    RegisterOrganization {
        organization: Organization,
    },
    ListOrganizations,
    RegistryStatus,
    Ping,
}

/// Response types sent back to clients
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Response {
    CertificateIssued {
        message: String,
        anchored: bool,
        certificate: Certificate,
    },
    CertificateList {
        certificates: Vec<Certificate>,
        count: usize,
    },
    CertificateUpdated {
        message: String,
        certificate: Certificate,
    },
    ValidationResult {
        report: ValidationReport,
    },
    CertificateRevoked {
        message: String,
        certificate: Certificate,
    },
    CertificateAnchored {
        message: String,
        anchored: bool,
        certificate: Certificate,
    },
    RoleInfo {
        wallet_address: String,
        role: Role,
    },
    RoleAssigned {
        message: String,
        wallet_address: String,
        role: Role,
    },
    CourseCreated {
        message: String,
        course: Course,
    },
    CourseList {
        courses: Vec<Course>,
        count: usize,
    },
    CourseUpdated {
        message: String,
        course: Course,
    },
    CourseDeleted {
        message: String,
        course_id: String,
    },
    OrganizationRegistered {
        message: String,
        organization: Organization,
    },
    OrganizationList {
        organizations: Vec<Organization>,
        count: usize,
    },
    RegistryStatus {
        stats: RegistryStats,
    },
    Pong {
        message: String,
    },
    Error {
        kind: String,
        message: String,
    },
}

/// Processes registry requests against the underlying components
pub struct Protocol {
    store: Arc<dyn DocumentStore>,
    certificates: CertificateStore,
    courses: CourseCatalog,
    organizations: OrganizationDirectory,
    roles: RoleAuthority,
}

impl Protocol {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        pinner: Arc<dyn ContentPinner>,
        owner_account: impl Into<String>,
    ) -> Self {
        Self {
            certificates: CertificateStore::new(store.clone(), pinner),
            courses: CourseCatalog::new(store.clone()),
            organizations: OrganizationDirectory::new(store.clone()),
            roles: RoleAuthority::new(store.clone(), owner_account),
            store,
        }
    }

    pub fn certificates(&self) -> &CertificateStore {
        &self.certificates
    }

    pub fn courses(&self) -> &CourseCatalog {
        &self.courses
    }

    pub fn organizations(&self) -> &OrganizationDirectory {
        &self.organizations
    }

    pub fn roles(&self) -> &RoleAuthority {
        &self.roles
    }

    /// Process a request, folding registry errors into [`Response::Error`]
    pub async fn process(&self, request: Request) -> Response {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => Response::Error {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Response> {
        match request {
            Request::IssueCertificate {
                acting_wallet,
                anchor,
                certificate,
            } => {
                self.require_role(
                    &acting_wallet,
                    Role::OrganizationVerifier,
                    "issuing certificates",
                )
                .await?;
                let (anchored, certificate) = if anchor {
                    let outcome = self.certificates.create_anchored(certificate).await?;
                    (outcome.is_anchored(), outcome.into_certificate())
                } else {
                    (false, self.certificates.create(certificate).await?)
                };
                Ok(Response::CertificateIssued {
                    message: format!(
                        "Certificate {} issued to {}",
                        certificate.certificate_id, certificate.recipient_wallet
                    ),
                    anchored,
                    certificate,
                })
            }
            Request::ListCertificates => {
                let certificates = self.certificates.list().await?;
                Ok(Response::CertificateList {
                    count: certificates.len(),
                    certificates,
                })
            }
            Request::CertificatesByCourse { course_id } => {
                let certificates = self.certificates.by_course(&course_id).await?;
                Ok(Response::CertificateList {
                    count: certificates.len(),
                    certificates,
                })
            }
            Request::UpdateCertificate {
                acting_wallet,
                certificate_id,
                patch,
            } => {
                let existing = self.lookup_certificate(&certificate_id).await?;
                self.authorize_certificate_mutation(&acting_wallet, &existing)
                    .await?;
                let certificate = self.certificates.update(&certificate_id, patch).await?;
                Ok(Response::CertificateUpdated {
                    message: format!("Certificate {} updated", certificate.certificate_id),
                    certificate,
                })
            }
            Request::ValidateCertificate { certificate_id } => {
                let report = self.certificates.validate(&certificate_id).await?;
                Ok(Response::ValidationResult { report })
            }
            Request::RevokeCertificate {
                acting_wallet,
                certificate_id,
            } => {
                let existing = self.lookup_certificate(&certificate_id).await?;
                self.authorize_certificate_mutation(&acting_wallet, &existing)
                    .await?;
                let certificate = self.certificates.revoke(&certificate_id).await?;
                Ok(Response::CertificateRevoked {
                    message: format!("Certificate {} revoked", certificate.certificate_id),
                    certificate,
                })
            }
            Request::AnchorCertificate {
                acting_wallet,
                certificate_id,
            } => {
                let existing = self.lookup_certificate(&certificate_id).await?;
                self.authorize_certificate_mutation(&acting_wallet, &existing)
                    .await?;
                let outcome = self.certificates.anchor_existing(&certificate_id).await?;
                let anchored = outcome.is_anchored();
                let certificate = outcome.into_certificate();
                Ok(Response::CertificateAnchored {
                    message: if anchored {
                        format!("Certificate {} anchored", certificate.certificate_id)
                    } else {
                        format!(
                            "Certificate {} left unanchored, pinning unavailable",
                            certificate.certificate_id
                        )
                    },
                    anchored,
                    certificate,
                })
            }
            Request::GetRole { wallet_address } => {
                let role = self.roles.role_of(&wallet_address).await;
                Ok(Response::RoleInfo {
                    wallet_address,
                    role,
                })
            }
            Request::AssignRole {
                acting_wallet,
                wallet_address,
                role,
            } => {
                let role = self
                    .roles
                    .assign_role(&acting_wallet, &wallet_address, role)
                    .await?;
                Ok(Response::RoleAssigned {
                    message: format!("{} is now {}", wallet_address, role.as_str()),
                    wallet_address,
                    role,
                })
            }
            Request::CreateCourse {
                acting_wallet,
                course,
            } => {
                self.require_role(
                    &acting_wallet,
                    Role::OrganizationVerifier,
                    "creating courses",
                )
                .await?;
                let course = self.courses.create(course).await?;
                Ok(Response::CourseCreated {
                    message: format!("Course {} created", course.title),
                    course,
                })
            }
            Request::ListCourses => {
                let courses = self.courses.list().await?;
                Ok(Response::CourseList {
                    count: courses.len(),
                    courses,
                })
            }
            Request::UpdateCourse {
                acting_wallet,
                course_id,
                patch,
            } => {
                self.require_role(
                    &acting_wallet,
                    Role::OrganizationVerifier,
                    "updating courses",
                )
                .await?;
                let course = self.courses.update(&course_id, patch).await?;
                Ok(Response::CourseUpdated {
                    message: format!("Course {} updated", course.title),
                    course,
                })
            }
            Request::DeleteCourse {
                acting_wallet,
                course_id,
            } => {
                self.require_role(&acting_wallet, Role::Admin, "deleting courses")
                    .await?;
                self.courses.delete(&course_id).await?;
                Ok(Response::CourseDeleted {
                    message: format!("Course {} deleted", course_id),
                    course_id,
                })
            }
            Request::RegisterOrganization { organization } => {
                let organization = self.organizations.create(organization).await?;
                Ok(Response::OrganizationRegistered {
                    message: format!("Organization {} registered", organization.name),
                    organization,
                })
            }
            Request::ListOrganizations => {
                let organizations = self.organizations.list().await?;
                Ok(Response::OrganizationList {
                    count: organizations.len(),
                    organizations,
                })
            }
            Request::RegistryStatus => {
                let stats = collect_registry_stats(self.store.as_ref()).await?;
                Ok(Response::RegistryStatus { stats })
            }
            Request::Ping => Ok(Response::Pong {
                message: "Registry operational".to_string(),
            }),
        }
    }

    async fn require_role(&self, acting: &str, required: Role, action: &str) -> Result<()> {
        if self.roles.has_at_least(acting, required).await {
            Ok(())
        } else {
            Err(RegistryError::Authorization(format!(
                "{} requires the {} role",
                action,
                required.as_str()
            )))
        }
    }

    /// Issuers may mutate their own certificates; moderators and above may
    /// mutate any
    async fn authorize_certificate_mutation(
        &self,
        acting: &str,
        certificate: &Certificate,
    ) -> Result<()> {
        if acting == certificate.issuer_wallet {
            return Ok(());
        }
        if self.roles.has_at_least(acting, Role::Moderator).await {
            return Ok(());
        }
        Err(RegistryError::Authorization(format!(
            "{} may not mutate certificate {}",
            acting, certificate.certificate_id
        )))
    }

    async fn lookup_certificate(&self, key: &str) -> Result<Certificate> {
        self.certificates
            .find_any(key)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("certificate {}", key)))
    }
}
