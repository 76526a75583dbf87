pub mod adapter;
pub mod browser;
pub mod extraction;
pub mod fetch_utils;
pub mod http_client;
pub mod scrape;
pub mod vendor;

pub use adapter::{Adapter, AdapterChain};
pub use browser::{Browser, BrowserSession, HttpBrowser};
pub use extraction::{ChatCompletionsExtractor, Extractor};
pub use http_client::create_http_client_with_timeout;
pub use scrape::{LiftScrapeAdapter, ScrapeAdapter, ScrapeMode, WebcamScrapeAdapter};
pub use vendor::VendorAdapter;
