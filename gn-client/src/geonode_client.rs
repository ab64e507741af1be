use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use commons_error::*;
use log::*;
use reqwest::blocking::multipart::Form;
use reqwest::blocking::RequestBuilder;
use reqwest::Method;
use serde_json::Value;

use gndto::api_error::ApiError;
use gndto::error_codes::{LOGIN_FAILED, MISSING_CSRF_TOKEN, UPLOAD_FILE_UNREADABLE};
use gndto::{HttpReply, WebResponse};

use crate::html::Html;
use crate::upload_step;
use crate::web_server::WebServer;

pub const LOGIN_PATH: &str = "/account/login/";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const SESSION_COOKIE: &str = "sessionid";

/// Public view for everybody, so the WMS client can read the layer without credentials
pub const DEFAULT_PERMISSIONS: &str = r#"{ "users": {"AnonymousUser": ["view_resourcebase"]} , "groups":{}}"#;

const SHAPEFILE_SIDECARS: [&str; 3] = ["dbf", "shx", "prj"];

///
/// Browser-like client of the GeoNode site: a session with its cookies,
/// the csrf token handling and the multipart upload of the wizard.
///
pub struct GeoNodeClient {
    server: WebServer,
    user: String,
    password: String,
    csrf_token: RefCell<Option<String>>,
}

impl GeoNodeClient {
    pub fn new(base_url: &str, user: &str, password: &str, timeout: Duration) -> WebResponse<Self> {
        Ok(Self {
            server: WebServer::new(base_url, timeout, None)?,
            user: user.to_owned(),
            password: password.to_owned(),
            csrf_token: RefCell::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        self.server.base_url()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn is_logged_in(&self) -> bool {
        self.csrf_token.borrow().is_some() && self.server.cookie(SESSION_COOKIE).is_some()
    }

    ///
    /// Post the login form with the token of a fresh page,
    /// then keep the token rotated by the login.
    ///
    pub fn login(&self) -> WebResponse<()> {
        let token = self.get_csrf_token(false)?;
        let form = [
            ("csrfmiddlewaretoken", token.as_str()),
            ("login", self.user.as_str()),
            ("next", "/"),
            ("password", self.password.as_str()),
        ];
        self.make_request(LOGIN_PATH, Some(&form), false)?;

        if self.server.cookie(SESSION_COOKIE).is_none() {
            log_error!("No session after the login, user=[{}]", &self.user);
            return Err(ApiError::from_errorset_with(&LOGIN_FAILED, &self.user));
        }

        let token = self.get_csrf_token(true)?;
        *self.csrf_token.borrow_mut() = Some(token);
        log_info!("Logged in GeoNode, user=[{}]", &self.user);
        Ok(())
    }

    ///
    /// Value of the csrftoken cookie.
    /// Unless `last` is set, the home page is requested first to get a fresh one.
    ///
    pub fn get_csrf_token(&self, last: bool) -> WebResponse<String> {
        if !last {
            self.get("/")?;
        }
        self.server.cookie(CSRF_COOKIE).ok_or_else(|| ApiError::from_errorset(&MISSING_CSRF_TOKEN))
    }

    ///
    /// GET the path, or POST the form when there is one.
    /// Ajax requests carry the X-Requested-With header, like the wizard pages do.
    ///
    pub fn make_request(&self, path: &str, data: Option<&[(&str, &str)]>, ajax: bool) -> WebResponse<HttpReply> {
        let url = self.server.build_url(path);
        let request_builder = match data {
            None => self.server.request(Method::GET, &url),
            Some(form) => self.with_csrf_headers(self.server.request(Method::POST, &url), &url).form(form),
        };
        let request_builder = if ajax {
            request_builder.header("X-Requested-With", "XMLHttpRequest")
        } else {
            request_builder
        };
        log_debug!("Request, url=[{}], post=[{}], ajax=[{}]", &url, data.is_some(), ajax);
        WebServer::send(request_builder)
    }

    pub fn get(&self, path: &str) -> WebResponse<HttpReply> {
        self.make_request(path, None, false)
    }

    pub fn get_html(&self, path: &str) -> WebResponse<(HttpReply, Html)> {
        let reply = self.get(path)?;
        let html = Html::new(reply.text());
        Ok((reply, html))
    }

    /// Json request for the REST api, with the session and the csrf headers
    pub fn send_json(&self, method: Method, path: &str, body: Option<&Value>) -> WebResponse<HttpReply> {
        let url = self.server.build_url(path);
        let request_builder = self.with_csrf_headers(self.server.request(method, &url), &url);
        let request_builder = match body {
            Some(b) => request_builder.json(b),
            None => request_builder,
        };
        WebServer::send(request_builder.header("Accept", "application/json"))
    }

    pub fn build_url_with_params(&self, end_point: &str, params: &[(&str, &str)]) -> WebResponse<String> {
        self.server.build_url_with_params(end_point, params)
    }

    ///
    /// Upload a dataset: the base file and, for a shapefile, the .dbf/.shx/.prj found next to it.
    /// Logs in on first use. The reply body is json when the save step succeeded.
    ///
    pub fn upload_file(&self, file_path: &Path, perms: Option<&str>) -> WebResponse<HttpReply> {
        if self.csrf_token.borrow().is_none() {
            self.login()?;
        }
        let token = self.get_csrf_token(true)?;

        let mut form = Form::new()
            .text("permissions", perms.unwrap_or(DEFAULT_PERMISSIONS).to_string())
            .text("csrfmiddlewaretoken", token)
            .text("time", "true")
            .text("charset", "UTF-8");

        for (field, path) in upload_parts(file_path) {
            form = form.file(field.clone(), &path).map_err(|e| {
                log_error!("Cannot attach the file, field=[{}], path=[{}], e=[{}]", &field, path.display(), e);
                ApiError::from_errorset_with(&UPLOAD_FILE_UNREADABLE, path.display())
            })?;
        }

        let url = self.server.build_url(&upload_step(None));
        log_info!("Upload the file, path=[{}]", file_path.display());
        let request_builder = self
            .with_csrf_headers(self.server.request(Method::POST, &url), &url)
            .header("X-Requested-With", "XMLHttpRequest")
            .multipart(form);
        WebServer::send(request_builder)
    }

    /// Wait for the site to answer, errors are ignored
    pub fn wait_for_startup(&self, attempts: u32) -> bool {
        for i in 0..attempts {
            match self.get_html("/") {
                Ok(_) => return true,
                Err(e) => log_warn!("GeoNode not ready, attempt=[{}], e=[{}]", i, e),
            }
        }
        false
    }

    fn with_csrf_headers(&self, request_builder: RequestBuilder, url: &str) -> RequestBuilder {
        let request_builder = request_builder.header("Referer", url);
        match self.server.cookie(CSRF_COOKIE) {
            Some(token) => request_builder.header("X-CSRFToken", token),
            None => request_builder,
        }
    }
}

/// Multipart fields of an upload, the base file last
pub fn upload_parts(file_path: &Path) -> Vec<(String, PathBuf)> {
    let mut parts = vec![];
    let ext = file_path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "shp" => {
            for sidecar in SHAPEFILE_SIDECARS {
                let path = file_path.with_extension(sidecar);
                // a shapefile may come without one of its files
                if path.exists() {
                    parts.push((format!("{}_file", sidecar), path));
                }
            }
        }
        "tif" => parts.push(("tif_file".to_string(), file_path.to_path_buf())),
        _ => {}
    }
    parts.push(("base_file".to_string(), file_path.to_path_buf()));
    parts
}
