use commons_error::*;
use log::*;
use reqwest::Method;
use serde_json::json;

use gndto::geonode_types::{DatasetList, DatasetSummary, ResourcePermissions, UploadSizeLimit, UploadSizeLimitEnvelope};
use gndto::WebResponse;

use crate::geonode_client::GeoNodeClient;

const DATASETS_PATH: &str = "/api/v2/datasets";
const RESOURCES_PATH: &str = "/api/v2/resources";
const UPLOAD_SIZE_LIMITS_PATH: &str = "/api/v2/upload-size-limits";
const CSW_PATH: &str = "/catalogue/csw";

///
/// GeoNode REST v2 calls, made with the session of the web client
///
pub struct GeoNodeApi<'a> {
    client: &'a GeoNodeClient,
}

impl<'a> GeoNodeApi<'a> {
    pub fn new(client: &'a GeoNodeClient) -> Self {
        Self { client }
    }

    pub fn find_datasets(&self, name_contains: &str) -> WebResponse<Vec<DatasetSummary>> {
        self.dataset_list(&[("filter{name.icontains}", name_contains)])
    }

    pub fn datasets_owned_by(&self, user: &str) -> WebResponse<Vec<DatasetSummary>> {
        self.dataset_list(&[("filter{owner.username}", user), ("page_size", "100")])
    }

    pub fn delete_resource(&self, pk: i64) -> WebResponse<()> {
        log_info!("Delete the resource, pk=[{}]", pk);
        self.client.send_json(Method::DELETE, &format!("{}/{}", RESOURCES_PATH, pk), None)?;
        Ok(())
    }

    pub fn resource_permissions(&self, pk: i64) -> WebResponse<ResourcePermissions> {
        self.client.get(&format!("{}/{}/permissions", RESOURCES_PATH, pk))?.parse()
    }

    pub fn get_upload_size_limit(&self, slug: &str) -> WebResponse<UploadSizeLimit> {
        let envelope: UploadSizeLimitEnvelope = self.client.get(&format!("{}/{}", UPLOAD_SIZE_LIMITS_PATH, slug))?.parse()?;
        Ok(envelope.upload_size_limit)
    }

    pub fn set_upload_size_limit(&self, slug: &str, max_size: u64, description: Option<&str>) -> WebResponse<()> {
        let mut body = json!({ "max_size": max_size });
        if let Some(d) = description {
            body["description"] = json!(d);
        }
        log_info!("Set the upload size limit, slug=[{}], max_size=[{}]", slug, max_size);
        self.client.send_json(Method::PATCH, &format!("{}/{}", UPLOAD_SIZE_LIMITS_PATH, slug), Some(&body))?;
        Ok(())
    }

    /// The catalogue knows the record when GetRecordById returns it (and no exception report)
    pub fn catalogue_record_exists(&self, uuid: &str) -> WebResponse<bool> {
        let url = self.client.build_url_with_params(
            CSW_PATH,
            &[
                ("service", "CSW"),
                ("version", "2.0.2"),
                ("request", "GetRecordById"),
                ("elementsetname", "full"),
                ("id", uuid),
            ],
        )?;
        let reply = self.client.get(&url)?;
        let text = reply.text();
        Ok(text.contains(uuid) && !text.contains("ExceptionReport"))
    }

    /// Every page of the list, following the next links until the total is reached
    fn dataset_list(&self, params: &[(&str, &str)]) -> WebResponse<Vec<DatasetSummary>> {
        let mut url = self.client.build_url_with_params(DATASETS_PATH, params)?;
        let mut datasets = vec![];
        loop {
            let list: DatasetList = self.client.get(&url)?.parse()?;
            let page_size = list.datasets.len();
            datasets.extend(list.datasets);
            log_debug!("Datasets page read, url=[{}], count=[{}], total=[{:?}]", &url, page_size, list.total);

            let all_read = list.total.map_or(false, |total| datasets.len() as u64 >= total);
            match list.links.next.filter(|next| !next.is_empty()) {
                Some(next) if page_size > 0 && !all_read => url = next,
                _ => break,
            }
        }
        log_debug!("Datasets found, count=[{}]", datasets.len());
        Ok(datasets)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;

    use crate::geonode_api::GeoNodeApi;
    use crate::geonode_client::GeoNodeClient;

    fn client(server: &mockito::ServerGuard) -> GeoNodeClient {
        GeoNodeClient::new(&server.url(), "admin", "admin", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn datasets_by_owner() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/api/v2/datasets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("filter{owner.username}".into(), "admin".into()),
                Matcher::UrlEncoded("page_size".into(), "100".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"{"total": 2, "datasets": [{"pk": 3, "name": "roads"}, {"pk": "4", "name": "water"}]}"#)
            .create();

        let client = client(&server);
        let datasets = GeoNodeApi::new(&client).datasets_owned_by("admin").unwrap();
        let pks: Vec<i64> = datasets.iter().map(|d| d.pk).collect();
        assert_eq!(vec![3, 4], pks);
    }

    #[test]
    fn datasets_of_every_page() {
        let mut server = mockito::Server::new();
        let page_1: Vec<String> = (1..=100).map(|pk| format!(r#"{{"pk": {}, "name": "ds_{}"}}"#, pk, pk)).collect();
        let next = format!("{}/api/v2/datasets?filter%7Bowner.username%7D=admin&page=2&page_size=100", server.url());
        let _p1 = server
            .mock("GET", "/api/v2/datasets")
            .match_query(Matcher::Regex("^filter[^&]*&page_size=100$".into()))
            .with_body(format!(
                r#"{{"links": {{"next": "{}", "previous": null}}, "total": 101, "page": 1, "datasets": [{}]}}"#,
                next,
                page_1.join(",")
            ))
            .create();
        let p2 = server
            .mock("GET", "/api/v2/datasets")
            .match_query(Matcher::Regex("(^|&)page=2(&|$)".into()))
            .with_body(r#"{"links": {"next": null, "previous": "x"}, "total": 101, "page": 2, "datasets": [{"pk": 101, "name": "ds_101"}]}"#)
            .expect(1)
            .create();

        let client = client(&server);
        let datasets = GeoNodeApi::new(&client).datasets_owned_by("admin").unwrap();
        assert_eq!(101, datasets.len());
        assert_eq!(101, datasets.last().unwrap().pk);
        p2.assert();
    }

    #[test]
    fn size_limit_is_patched() {
        let mut server = mockito::Server::new();
        let m = server
            .mock("PATCH", "/api/v2/upload-size-limits/dataset_upload_size")
            .match_body(Matcher::PartialJsonString(r#"{"max_size": 1}"#.to_string()))
            .with_body(r#"{"upload-size-limit": {"slug": "dataset_upload_size", "max_size": 1}}"#)
            .create();

        let client = client(&server);
        GeoNodeApi::new(&client).set_upload_size_limit("dataset_upload_size", 1, None).unwrap();
        m.assert();
    }

    #[test]
    fn catalogue_record() {
        let mut server = mockito::Server::new();
        let _found = server
            .mock("GET", "/catalogue/csw")
            .match_query(Matcher::UrlEncoded("id".into(), "a1b2".into()))
            .with_body("<csw:GetRecordByIdResponse><dc:identifier>a1b2</dc:identifier></csw:GetRecordByIdResponse>")
            .create();
        let _missing = server
            .mock("GET", "/catalogue/csw")
            .match_query(Matcher::UrlEncoded("id".into(), "zz99".into()))
            .with_body("<ows:ExceptionReport>zz99 not found</ows:ExceptionReport>")
            .create();

        let client = client(&server);
        let api = GeoNodeApi::new(&client);
        assert!(api.catalogue_record_exists("a1b2").unwrap());
        assert!(!api.catalogue_record_exists("zz99").unwrap());
    }

    #[test]
    fn delete_missing_resource_is_an_error() {
        let mut server = mockito::Server::new();
        let _m = server.mock("DELETE", "/api/v2/resources/12").with_status(404).with_body("Not found").create();

        let client = client(&server);
        assert_eq!(404, GeoNodeApi::new(&client).delete_resource(12).unwrap_err().http_error_code);
    }
}
