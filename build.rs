fn main() -> std::io::Result<()> {
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(
            &[
                "vendor/github.com/containerd/containerd/api/services/events/v1/events.proto",
                "vendor/github.com/containerd/containerd/api/types/event.proto",
                "vendor/github.com/containerd/containerd/api/events/snapshot.proto",
                "vendor/github.com/containerd/containerd/api/events/image.proto",
                "vendor/github.com/containerd/containerd/api/events/container.proto",
            ],
            &["vendor"],
        )?;

    Ok(())
}
