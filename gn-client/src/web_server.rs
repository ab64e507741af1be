use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use commons_error::*;
use log::*;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Method;
use url::Url;

use gndto::api_error::ApiError;
use gndto::error_codes::{HTTP_CLIENT_ERROR, INVALID_URL};
use gndto::{HttpReply, ReplyBody, WebResponse};

///
/// One http end point: a base url, a session (cookie jar) and optional basic credentials.
///
pub(crate) struct WebServer {
    base_url: String,
    client: Client,
    jar: Arc<Jar>,
    credentials: Option<(String, String)>,
}

impl WebServer {
    pub fn new(base_url: &str, timeout: Duration, credentials: Option<(String, String)>) -> WebResponse<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::from_errorset_with(&HTTP_CLIENT_ERROR, e))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_owned(), client, jar, credentials })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    ///
    /// end_point , ex : "/upload/srs", "layers/geonode:roads.json"
    /// An absolute url is kept as is.
    ///
    pub fn build_url(&self, end_point: &str) -> String {
        if end_point.starts_with("http://") || end_point.starts_with("https://") {
            end_point.to_owned()
        } else if end_point.starts_with('/') {
            format!("{}{}", self.base_url, end_point)
        } else {
            format!("{}/{}", self.base_url, end_point)
        }
    }

    pub fn build_url_with_params(&self, end_point: &str, params: &[(&str, &str)]) -> WebResponse<String> {
        let url = Url::parse_with_params(&self.build_url(end_point), params)
            .map_err(|e| ApiError::from_errorset_with(&INVALID_URL, e))?;
        Ok(url.to_string())
    }

    /// Value of a cookie sent to the base url
    pub fn cookie(&self, name: &str) -> Option<String> {
        let url = Url::parse(&self.base_url).ok()?;
        let header = self.jar.cookies(&url)?;
        let cookies = header.to_str().ok()?;
        cookies.split(';').map(str::trim).find_map(|c| {
            let (k, v) = c.split_once('=')?;
            (k == name).then(|| v.to_string())
        })
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request_builder = self.client.request(method, url);
        match &self.credentials {
            Some((user, password)) => request_builder.basic_auth(user, Some(password)),
            None => request_builder,
        }
    }

    ///
    /// Send the request and read the whole reply.
    /// A status >= 400 is an error carrying the body as message.
    ///
    pub fn send(request_builder: RequestBuilder) -> WebResponse<HttpReply> {
        let response = request_builder.send().map_err(|e| {
            log_warn!("Http request failed, e=[{}]", e);
            ApiError::from_errorset_with(&HTTP_CLIENT_ERROR, e)
        })?;
        Self::read_reply(response)
    }

    fn read_reply(response: Response) -> WebResponse<HttpReply> {
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_lowercase(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let raw = response.text().map_err(|e| ApiError::from_errorset_with(&HTTP_CLIENT_ERROR, e))?;

        if status >= 400 {
            log_debug!("Error reply, url=[{}], status=[{}]", &url, status);
            return Err(ApiError::owned(status, raw));
        }
        Ok(HttpReply { status, url, headers, body: ReplyBody::from_text(raw) })
    }

    ///
    /// Send with retries on transport errors and on 502/503/504.
    /// The wait before the retry n is backoff * 2^(n-1) seconds.
    ///
    pub fn send_retry<F>(&self, build: F, max_retry: u32, backoff_factor: f64) -> WebResponse<HttpReply>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut count: u32 = 0;
        loop {
            let r_reply = Self::send(build());
            let retryable = match &r_reply {
                Ok(_) => false,
                Err(e) => e.http_error_code == HTTP_CLIENT_ERROR.http_error_code || matches!(e.http_error_code, 502..=504),
            };
            if !retryable || count >= max_retry {
                return r_reply;
            }
            count += 1;
            let wait = backoff_factor * f64::from(2u32.saturating_pow(count - 1));
            log_warn!("Url call failed, attempt=[{}], wait=[{:.2}s]", count, wait);
            thread::sleep(Duration::try_from_secs_f64(wait.max(0.0)).unwrap_or(Duration::ZERO));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::Method;

    use crate::web_server::WebServer;

    #[test]
    fn build_url_variants() {
        let server = WebServer::new("http://localhost:8000/", Duration::from_secs(5), None).unwrap();
        assert_eq!("http://localhost:8000/upload/srs", server.build_url("/upload/srs"));
        assert_eq!("http://localhost:8000/layers/x.json", server.build_url("layers/x.json"));
        assert_eq!("http://other:9000/upload/final", server.build_url("http://other:9000/upload/final"));
    }

    #[test]
    fn params_are_encoded() {
        let server = WebServer::new("http://localhost:8000", Duration::from_secs(5), None).unwrap();
        let url = server.build_url_with_params("/api/v2/datasets", &[("filter{name.icontains}", "boxes")]).unwrap();
        assert!(url.starts_with("http://localhost:8000/api/v2/datasets?filter%7Bname.icontains%7D=boxes"));
    }

    #[test]
    fn error_status_carries_the_body() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/broken").with_status(400).with_body("Total upload size exceeds 1 byte.").create();

        let web = WebServer::new(&server.url(), Duration::from_secs(5), None).unwrap();
        let e = WebServer::send(web.request(Method::GET, &web.build_url("/broken"))).unwrap_err();
        assert_eq!(400, e.http_error_code);
        assert!(e.message.contains("Total upload size"));
    }

    #[test]
    fn retry_stops_after_the_budget() {
        let mut server = mockito::Server::new();
        let m = server.mock("GET", "/rest/layers/x.json").with_status(503).expect(3).create();

        let web = WebServer::new(&server.url(), Duration::from_secs(5), None).unwrap();
        let url = web.build_url("/rest/layers/x.json");
        let e = web.send_retry(|| web.request(Method::GET, &url), 2, 0.0).unwrap_err();
        assert_eq!(503, e.http_error_code);
        m.assert();
    }

    #[test]
    fn cookies_are_kept_in_the_session() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/").with_header("set-cookie", "csrftoken=abc123; Path=/").with_body("<html/>").create();

        let web = WebServer::new(&server.url(), Duration::from_secs(5), None).unwrap();
        WebServer::send(web.request(Method::GET, &web.build_url("/"))).unwrap();
        assert_eq!(Some("abc123".to_string()), web.cookie("csrftoken"));
        assert_eq!(None, web.cookie("sessionid"));
    }
}
