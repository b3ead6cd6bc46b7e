//! Seed Data Module
//!
//! Sample courses, certificates, and organizations for demos and local
//! development. Everything goes through the normal store paths so the seeded
//! records pick up the same normalization as real ones.

use crate::certificate::{CertificateInput, CertificateStatus};
use crate::course::{CourseInput, Organization};
use crate::error::Result;
use crate::protocol::Protocol;
use crate::roles::Role;

const SAMPLE_ORG_WALLET: &str = "achievo-org.testnet";

fn sample_courses() -> Vec<CourseInput> {
    vec![
        CourseInput {
            title: Some("Introduction to Blockchain".to_string()),
            description: Some("Learn the fundamentals of blockchain technology".to_string()),
            category: Some("blockchain".to_string()),
            instructor: Some("Achievo Education Institute".to_string()),
            duration: Some("8 weeks".to_string()),
            level: Some("Beginner".to_string()),
            price_near: Some("5".to_string()),
            price_usd: Some("15".to_string()),
            skills: Some(vec![
                "blockchain".to_string(),
                "cryptocurrency".to_string(),
                "smart_contracts".to_string(),
            ]),
            organization_wallet: Some(SAMPLE_ORG_WALLET.to_string()),
        },
        CourseInput {
            title: Some("Web3 Development".to_string()),
            description: Some("Build decentralized applications on NEAR Protocol".to_string()),
            category: Some("development".to_string()),
            instructor: Some("Achievo Education Institute".to_string()),
            duration: Some("12 weeks".to_string()),
            level: Some("Intermediate".to_string()),
            price_near: Some("10".to_string()),
            price_usd: Some("30".to_string()),
            skills: Some(vec![
                "web3".to_string(),
                "smart_contracts".to_string(),
                "dapp_development".to_string(),
                "near_protocol".to_string(),
            ]),
            organization_wallet: Some(SAMPLE_ORG_WALLET.to_string()),
        },
        CourseInput {
            title: Some("DeFi Fundamentals".to_string()),
            description: Some("Understanding Decentralized Finance protocols".to_string()),
            category: Some("finance".to_string()),
            instructor: Some("Achievo Education Institute".to_string()),
            duration: Some("6 weeks".to_string()),
            level: Some("Beginner".to_string()),
            price_near: Some("7".to_string()),
            price_usd: Some("21".to_string()),
            skills: Some(vec![
                "defi".to_string(),
                "liquidity_pools".to_string(),
                "yield_farming".to_string(),
                "tokenomics".to_string(),
            ]),
            organization_wallet: Some(SAMPLE_ORG_WALLET.to_string()),
        },
    ]
}

fn sample_certificate() -> CertificateInput {
    CertificateInput {
        certificate_id: Some("CERT_001".to_string()),
        title: Some("Introduction to Blockchain".to_string()),
        recipient_name: Some("John Student".to_string()),
        recipient_wallet: Some("achievo-student.testnet".to_string()),
        issuer_name: Some("Achievo Education Institute".to_string()),
        issuer_wallet: Some(SAMPLE_ORG_WALLET.to_string()),
        course_id: Some("BLOCKCHAIN_101".to_string()),
        issue_date: Some("2024-02-15".to_string()),
        completion_date: Some("2024-02-15".to_string()),
        grade: Some("A".to_string()),
        skills: Some(vec![
            "blockchain".to_string(),
            "cryptocurrency".to_string(),
            "smart_contracts".to_string(),
        ]),
        status: Some(CertificateStatus::Verified),
        blockchain_hash: Some("QmSampleHash123456789".to_string()),
    }
}

fn sample_organization() -> Organization {
    Organization {
        id: String::new(),
        name: "Achievo Education Institute".to_string(),
        email: "contact@achievo-edu.org".to_string(),
        wallet_address: SAMPLE_ORG_WALLET.to_string(),
        verified: true,
        description: "Leading blockchain education institute".to_string(),
        website: "https://achievo-edu.org".to_string(),
        created_at: String::new(),
    }
}

/// Load the sample data set into the registry
pub async fn seed_registry(protocol: &Protocol) -> Result<()> {
    let owner = protocol.roles().owner_account().to_string();

    // the sample issuer needs an organization role before it can issue
    protocol
        .roles()
        .assign_role(&owner, SAMPLE_ORG_WALLET, Role::OrganizationVerifier)
        .await?;
    println!("✓ Granted organization role to {}", SAMPLE_ORG_WALLET);

    for course in sample_courses() {
        let course = protocol.courses().create(course).await?;
        println!("✓ Created course: {}", course.title);
    }

    let organization = protocol.organizations().create(sample_organization()).await?;
    println!("✓ Created organization: {}", organization.name);

    let certificate = protocol.certificates().create(sample_certificate()).await?;
    println!("✓ Created certificate: {}", certificate.certificate_id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::MemoryStore;
    use crate::pinning::LocalPinner;
    use crate::statistics::collect_registry_stats;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_seed_populates_all_collections() {
        let store = Arc::new(MemoryStore::new());
        let protocol = Protocol::new(store.clone(), Arc::new(LocalPinner::new()), "bernieio.testnet");

        seed_registry(&protocol).await.unwrap();

        let stats = collect_registry_stats(store.as_ref()).await.unwrap();
        assert_eq!(stats.total_courses, 3);
        assert_eq!(stats.total_certificates, 1);
        assert_eq!(stats.total_organizations, 1);
        assert_eq!(stats.total_role_assignments, 1);

        // the seeded issuer can issue more certificates
        assert!(
            protocol
                .roles()
                .has_at_least(SAMPLE_ORG_WALLET, Role::OrganizationVerifier)
                .await
        );

        // and the seeded certificate resolves by its blockchain hash
        let report = protocol
            .certificates()
            .validate("QmSampleHash123456789")
            .await
            .unwrap();
        assert!(report.is_valid);
    }
}
