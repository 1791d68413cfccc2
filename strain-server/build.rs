//! Compile the protobuf definitions into Rust source at build time.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR")?);

    // The client half is only used by the integration tests.
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .bytes([".strain.StressResponse.payload"])
        .file_descriptor_set_path(out_dir.join("strain_descriptor.bin"))
        .compile(
            &["../proto/strain.proto"],
            &["../proto"],
        )?;

    println!("cargo:rerun-if-changed=../proto/strain.proto");
    Ok(())
}
