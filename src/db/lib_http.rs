use std::error::Error;

use reqwest::{
    blocking::Client,
    header::{ACCEPT, UPGRADE_INSECURE_REQUESTS, USER_AGENT},
};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Blocking GET, returning whatever status the server answered with.
/// Transport failures (DNS, connection refused, ...) are errors.
pub trait HttpGet {
    fn get(&self, url: &str) -> Result<HttpResponse, Box<dyn Error>>;
}

impl HttpGet for Client {
    fn get(&self, url: &str) -> Result<HttpResponse, Box<dyn Error>> {
        let response = Client::get(self, url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(UPGRADE_INSECURE_REQUESTS, "1")
            .header(ACCEPT, "application/json")
            .send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}
