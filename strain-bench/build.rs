//! Generate the client half of the protobuf service.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile(
            &["../proto/strain.proto"],
            &["../proto"],
        )?;

    println!("cargo:rerun-if-changed=../proto/strain.proto");
    Ok(())
}
