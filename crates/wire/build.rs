fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().compile_protos(
        &[
            "proto/api/v1/challenge.proto",
            "proto/api/v1/instance.proto",
            "proto/api/v1/info.proto",
        ],
        &["proto"],
    )?;
    Ok(())
}
