pub mod http_lookup;

pub use http_lookup::HttpLookupClient;
