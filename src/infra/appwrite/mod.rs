pub mod appwrite_client;

pub use appwrite_client::AppwriteClient;
