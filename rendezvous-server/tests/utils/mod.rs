
pub use faulty_store::*;
pub use recording_transport::*;
pub use test_client::*;
