pub mod urls;

pub use urls::extract_urls;
