//! ACME ordering, acme-dns provisioning, and the ACME account keystore
//! (spec components C, D, E, G).

pub mod acme_dns_client;
pub mod driver;
pub mod keystore;
pub mod provisioning;

pub use acme_dns_client::AcmeDnsClient;
pub use driver::{AcmeDriver, AcmeDriverConfig, DriverAction, DriverRequest};
pub use keystore::{AccountKeystore, AccountRegistration, LoadedAccount};
pub use provisioning::{DnsSetupPlan, ProvisionOutcome, ProvisioningOrchestrator};
