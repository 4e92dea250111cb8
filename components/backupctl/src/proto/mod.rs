pub mod api {
    tonic::include_proto!("api");
}
