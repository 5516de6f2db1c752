pub mod info_client;
mod response_structs;

pub use info_client::InfoClient;
pub use response_structs::*;
