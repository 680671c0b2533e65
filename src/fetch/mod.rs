mod client;
mod basic;
pub mod auth;
#[cfg(test)]
mod stub;

pub use client::HttpClient;
pub use basic::BasicClient;
#[cfg(test)]
pub(crate) use stub::StubClient;

use crate::services::weather_api::ProviderError;

/// Issues a GET for `url` and returns the body of a successful response.
///
/// Non-2xx responses become [`ProviderError::Status`] carrying the status code
/// and the response body.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    provider: &'static str,
    url: reqwest::Url,
) -> Result<Vec<u8>, ProviderError> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client
        .execute(req)
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider,
            status,
            body,
        });
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;
    Ok(bytes.to_vec())
}
