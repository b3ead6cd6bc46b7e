use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document_store::{
    DocumentStore, ListQuery, CERTIFICATES, COURSES, ORGANIZATIONS, ROLE_ASSIGNMENTS,
};
use crate::error::Result;

/// Aggregate counts over the registry's collections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    /// Total number of certificate records, revoked included
    pub total_certificates: usize,
    /// Certificates still carrying the verified status
    pub valid_certificates: usize,
    /// Certificates that have been revoked
    pub revoked_certificates: usize,
    /// Certificates with a populated content anchor
    pub anchored_certificates: usize,
    pub total_courses: usize,
    pub total_role_assignments: usize,
    pub total_organizations: usize,
}

/// Gather statistics across all registry collections
///
/// # Example
/// ```no_run
/// use cert_registry::document_store::MemoryStore;
/// use cert_registry::statistics::collect_registry_stats;
///
/// # async fn example() -> cert_registry::error::Result<()> {
/// let store = MemoryStore::new();
/// let stats = collect_registry_stats(&store).await?;
/// println!("Total certificates: {}", stats.total_certificates);
/// # Ok(())
/// # }
/// ```
pub async fn collect_registry_stats(store: &dyn DocumentStore) -> Result<RegistryStats> {
    let certificates = store.list(CERTIFICATES, ListQuery::all()).await?;
    let revoked = certificates
        .iter()
        .filter(|doc| doc.data.get("status").and_then(Value::as_str) == Some("revoked"))
        .count();
    let anchored = certificates
        .iter()
        .filter(|doc| {
            doc.data
                .get("contentHash")
                .map(|v| !v.is_null())
                .unwrap_or(false)
        })
        .count();

    let courses = store.list(COURSES, ListQuery::all()).await?;
    let role_assignments = store.list(ROLE_ASSIGNMENTS, ListQuery::all()).await?;
    let organizations = store.list(ORGANIZATIONS, ListQuery::all()).await?;

    Ok(RegistryStats {
        total_certificates: certificates.len(),
        valid_certificates: certificates.len() - revoked,
        revoked_certificates: revoked,
        anchored_certificates: anchored,
        total_courses: courses.len(),
        total_role_assignments: role_assignments.len(),
        total_organizations: organizations.len(),
    })
}

/// Print registry statistics in a terminal box
pub fn print_registry_statistics(stats: &RegistryStats) {
    println!("\n╔════════════════════════════════════════════╗");
    println!("║          CERTIFICATE REGISTRY              ║");
    println!("╠════════════════════════════════════════════╣");
    println!(
        "║ Certificates:        {:>5} total            ║",
        stats.total_certificates
    );
    println!(
        "║   valid / revoked:   {:>5} / {:<5}          ║",
        stats.valid_certificates, stats.revoked_certificates
    );
    println!(
        "║   anchored:          {:>5}                  ║",
        stats.anchored_certificates
    );
    println!(
        "║ Courses:             {:>5}                  ║",
        stats.total_courses
    );
    println!(
        "║ Role assignments:    {:>5}                  ║",
        stats.total_role_assignments
    );
    println!(
        "║ Organizations:       {:>5}                  ║",
        stats.total_organizations
    );
    println!("╚════════════════════════════════════════════╝\n");
}
