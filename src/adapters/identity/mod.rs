//! Identity adapters - authentication account provisioning.

mod gotrue_provisioner;

pub use gotrue_provisioner::{GoTrueConfig, GoTrueProvisioner};
