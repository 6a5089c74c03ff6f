use reqwest::StatusCode;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failures raised while talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to build catalog HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    #[error("catalog request to `{endpoint}` failed")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("catalog answered {status} for `{endpoint}`")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
    /// The catalog accepted the request but queued it; the caller should retry later.
    #[error("catalog is still preparing the response for `{endpoint}`")]
    Busy { endpoint: &'static str },
    #[error("malformed catalog XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed catalog XML attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),
}
