pub mod config;
pub mod deployment;
pub mod error;
pub mod routes;

pub type DeploymentImpl = deployment::LocalDeployment;
