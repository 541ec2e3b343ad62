use std::sync::Arc;

use slapper_http::HttpRequest;

use super::error::{Error, Result};
use crate::TargetList;

/// Turn parsed targets into ready-to-send requests, once, before the run starts.
///
/// `extra_headers` are added to every request; for a name the target already declares,
/// the extra values go after the declared ones.
pub fn prepare_requests(
    targets: &TargetList,
    extra_headers: &[(String, String)],
) -> Result<Arc<[HttpRequest]>> {
    targets
        .iter()
        .enumerate()
        .map(|(index, target)| {
            let method = http::Method::from_bytes(target.method().as_bytes()).map_err(|_| {
                Error::InvalidMethod {
                    index,
                    method: target.method().to_string(),
                }
            })?;

            let mut headers = target.headers().clone();
            for (name, value) in extra_headers {
                headers.append(name, value.clone());
            }

            let mut req = HttpRequest::new(method, target.url());
            req.headers = headers
                .pairs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            req.body = target.body().clone();
            Ok(req)
        })
        .collect()
}
