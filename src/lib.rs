//! Cert Registry - Role-Gated Certificate Lifecycle Library
//!
//! A certificate-issuance registry that manages the full lifecycle of course
//! completion certificates — creation, content anchoring, validation, and
//! revocation — with every mutation gated by an ordered role hierarchy.
//!
//! # Overview
//!
//! Two cooperating components form the core:
//!
//! ```text
//! Role Authority (who may do it)
//!   └── Certificate Store (create / anchor / validate / revoke)
//!         ├── Document Store  (certificates, courses, role_assignments)
//!         └── Content Pinner  (IPFS-style content + metadata anchoring)
//! ```
//!
//! A caller clears an operation through the role authority, then the
//! certificate store performs it. Anchoring is best-effort: a certificate is
//! complete with or without its content pinned.
//!
//! # Features
//!
//! - **Two-State Lifecycle**: certificates are `verified` until revoked;
//!   revocation flips a flag, never deletes, and is terminal
//! - **Role Hierarchy**: `user < organization_verifier < moderator < admin`,
//!   with a configured contract-owner wallet that is always admin
//! - **Best-Effort Anchoring**: text rendition plus JSON metadata pinned to
//!   content-addressed storage, with explicit success reporting
//! - **Pluggable Storage**: in-memory store for development and tests,
//!   Firestore REST backend for deployment
//! - **JSON API**: axum server mirroring the registry protocol, plus static
//!   file serving for the front-end
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use cert_registry::certificate::CertificateInput;
//! use cert_registry::document_store::MemoryStore;
//! use cert_registry::pinning::LocalPinner;
//! use cert_registry::protocol::Protocol;
//! use cert_registry::roles::Role;
//!
//! # async fn example() -> cert_registry::error::Result<()> {
//! let protocol = Protocol::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(LocalPinner::new()),
//!     "bernieio.testnet",
//! );
//!
//! // The contract owner grants an issuing organization its role
//! protocol
//!     .roles()
//!     .assign_role("bernieio.testnet", "org.testnet", Role::OrganizationVerifier)
//!     .await?;
//!
//! // Issue, then revoke, then validate
//! let certificate = protocol
//!     .certificates()
//!     .create(CertificateInput {
//!         title: Some("Intro to X".to_string()),
//!         recipient_wallet: Some("alice.testnet".to_string()),
//!         issuer_wallet: Some("org.testnet".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! protocol.certificates().revoke(&certificate.certificate_id).await?;
//!
//! let report = protocol
//!     .certificates()
//!     .validate(&certificate.certificate_id)
//!     .await?;
//! assert!(!report.is_valid);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Overview
//!
//! ## [`store`]
//!
//! The certificate store: create / list / update / validate / revoke, plus
//! orchestration of anchoring. Lookups fall back across three keys —
//! `certificateId`, the storage document id, and `blockchainHash`.
//!
//! ## [`roles`]
//!
//! The role authority: read-through role resolution with default
//! provisioning, rank comparison, and admin-gated role assignment. The
//! owner wallet's admin role is a local constant that survives storage
//! outage.
//!
//! ## [`certificate`]
//!
//! The certificate record and its single normalization step. All field
//! defaulting happens in one documented table.
//!
//! ## [`document_store`] / [`firestore`]
//!
//! The storage seam and its two implementations. Components receive an
//! explicit store instance; nothing global.
//!
//! ## [`pinning`]
//!
//! The content-addressing seam: Pinata over HTTP, or locally derived
//! addresses when no pinning service is configured.
//!
//! ## [`protocol`] / [`webserver`]
//!
//! Tagged request/response types, the processor that authorizes and
//! dispatches them, and the axum routes that expose it all over HTTP.
//!
//! # Error Handling
//!
//! Library operations return [`error::RegistryError`], a small taxonomy of
//! validation, not-found, authorization, policy, and collaborator failures.
//! Anchoring failures are the one deliberate exception to propagation: they
//! are logged and reported through
//! [`store::AnchorOutcome`] instead of failing the operation.

pub mod certificate;
pub mod configs;
pub mod course;
pub mod document_store;
pub mod error;
pub mod firestore;
pub mod pinning;
pub mod protocol;
pub mod roles;
pub mod seed;
pub mod statistics;
pub mod store;
pub mod webserver;
