fn main() -> std::io::Result<()> {
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["proto/cri-api/api.proto"], &["proto/cri-api"])?;

    Ok(())
}
