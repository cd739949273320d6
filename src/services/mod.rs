pub mod provisioning_service;

pub use provisioning_service::{
    CreateSuperadminRequest, ProvisioningOutcome, ProvisioningService,
};
