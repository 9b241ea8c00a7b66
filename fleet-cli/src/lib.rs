//! fleet-cli: two-phase deployment of peer-to-peer node fleets
//!
//! The bootstrap node is deployed first; its address is then handed to every
//! other host, which is deployed in parallel. Ports and peer ids of the
//! running nodes are read back from `docker port` / `docker logs` and merged
//! into a node directory.

pub mod commands;
pub mod config;
pub mod deployer;
pub mod executor;
pub mod introspector;
pub mod orchestrator;
pub mod report;

pub use config::{DeploySettings, DeploymentPlan, FleetConfig, PhasePlan};
pub use deployer::{DeployEnv, Deployer};
pub use executor::{ExecutionMode, HostOutcome, RemoteExecutor, SshExecutor};
pub use introspector::{ContainerIntrospector, NodeNotReady, Readiness};
pub use orchestrator::{FleetFailurePolicy, MissingIdentityPolicy, Orchestrator};
