fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protobuf_src::protoc());
    tonic_build::compile_protos("proto/pipeliner.proto")?;
    println!("cargo:rerun-if-changed=proto/pipeliner.proto");
    Ok(())
}
