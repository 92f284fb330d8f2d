pub mod http_image_fetcher;

pub use http_image_fetcher::HttpImageFetcher;
