fn main() {
    println!("cargo:rerun-if-changed=proto/sequencer.proto");

    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()
            .expect("no vendored protoc binary for this host platform");
        // SAFETY: build scripts are single-threaded at this point.
        unsafe { std::env::set_var("PROTOC", protoc) };
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/sequencer.proto"], &["proto"])
        .expect("failed to compile sequencer.proto");
}
