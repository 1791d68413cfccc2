//! Strain stress server: the `TestService` gRPC implementation and its bootstrap.

pub mod config;
pub mod server;
pub mod service;
pub mod streams;

/// Generated protobuf / tonic types live inside this module.
pub mod pb {
    tonic::include_proto!("strain");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("strain_descriptor");
}

pub use config::ServerConfig;
pub use server::serve;
pub use service::StressService;
