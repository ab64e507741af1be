use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, bail, ensure};
use commons_error::*;
use log::*;
use serde_json::Value;

use gn_client::html::text_of;
use gn_client::{get_wms, unquote, upload_step, GeoNodeApi, GeoNodeClient, GeoServerCatalog, WebMapService};
use gnconfig::settings::E2eSettings;
use gndto::{HttpReply, ProgressReply, UploadStepReply};

use crate::scratch::ScratchFiles;

/// Check run on the reply of an upload, with the name expected for the dataset
pub type FinalCheck = fn(&UploadHarness, &str, &HttpReply) -> anyhow::Result<()>;

/// Files of a folder that are uploaded on their own (the sidecars follow them)
const MAIN_EXTENSIONS: [&str; 4] = ["tif", "shp", "zip", "asc"];

const WMS_VERSION: &str = "1.1.1";

///
/// Everything a test needs to drive an upload and check the outcome:
/// the logged GeoNode session, the GeoServer catalog and the scratch files.
/// Dropping the harness is the tear down.
///
pub struct UploadHarness {
    pub settings: E2eSettings,
    pub client: GeoNodeClient,
    pub catalog: GeoServerCatalog,
    scratch: RefCell<ScratchFiles>,
}

impl UploadHarness {
    pub fn set_up(settings: E2eSettings) -> anyhow::Result<Self> {
        // Await startup, the first pages may fail while GeoNode warms up
        let probe = new_geonode_client(&settings)?;
        if !probe.wait_for_startup(settings.startup_attempts) {
            log_warn!("GeoNode did not answer, url=[{}]", &settings.geonode_url);
        }

        let client = new_geonode_client(&settings)?;
        let catalog = GeoServerCatalog::new(
            &settings.geoserver_rest_url(),
            &settings.geoserver_user,
            &settings.geoserver_password,
            settings.geoserver_max_retries,
            settings.geoserver_backoff_factor,
            settings.geoserver_timeout,
        )?;

        Ok(Self { settings, client, catalog, scratch: RefCell::new(ScratchFiles::default()) })
    }

    pub fn api(&self) -> GeoNodeApi<'_> {
        GeoNodeApi::new(&self.client)
    }

    /// Capabilities of GeoServer, for one layer when the type name is given
    pub fn get_wms(&self, type_name: Option<&str>, with_credentials: bool) -> anyhow::Result<WebMapService> {
        let credentials = with_credentials
            .then(|| (self.settings.geoserver_user.clone(), self.settings.geoserver_password.clone()));
        let wms = get_wms(&self.settings.geoserver_location, WMS_VERSION, type_name, credentials, self.settings.geoserver_timeout)?;
        Ok(wms)
    }

    /// ex : good_data(&["vector", "san_andres_y_providencia_water.shp"])
    pub fn good_data(&self, parts: &[&str]) -> PathBuf {
        parts.iter().fold(self.settings.good_data(), |p, part| p.join(part))
    }

    pub fn bad_data(&self) -> PathBuf {
        self.settings.bad_data()
    }

    /// File shipped with the suites (gn-upload-tests/data)
    pub fn fixture(&self, name: &str) -> PathBuf {
        self.settings.fixtures_path.join(name)
    }

    pub fn temp_file(&self, ext: &str) -> anyhow::Result<PathBuf> {
        self.scratch.borrow_mut().temp_file(ext)
    }

    pub fn make_csv(&self, fieldnames: &[&str], rows: &[&[(&str, &str)]]) -> anyhow::Result<PathBuf> {
        self.scratch.borrow_mut().make_csv(fieldnames, rows)
    }

    pub fn make_zip(&self, pattern: &str) -> anyhow::Result<PathBuf> {
        self.scratch.borrow_mut().make_zip(pattern)
    }

    /// The final page of the upload renders
    pub fn check_dataset_geonode_page(&self, path: &str) -> anyhow::Result<()> {
        let (reply, _) = self.client.get_html(path)?;
        ensure!(reply.status == 200, "Unexpected status [{}] for the page [{}]", reply.status, path);
        ensure!(reply.has_header("content-type"), "No content-type for the page [{}]", path);
        Ok(())
    }

    /// The layer shows up in the capabilities of GeoServer, type_name ex: "geonode:roads"
    pub fn check_dataset_geoserver_caps(&self, type_name: &str) -> anyhow::Result<()> {
        let parts: Vec<&str> = type_name.split(':').collect();
        let [_ws, dataset_name] = parts.as_slice() else {
            bail!("Type name is not <workspace>:<name>, type_name=[{}]", type_name);
        };
        let wms = self.get_wms(Some(type_name), true)?;
        let names: Vec<&str> = wms.items().iter().map(|l| l.name.as_str()).collect();
        ensure!(wms.contains(dataset_name), "{} is not in {:?}", dataset_name, names);
        Ok(())
    }

    /// The layer is known by the GeoServer REST api
    pub fn check_dataset_geoserver_rest(&self, dataset_name: &str) -> anyhow::Result<()> {
        let layer = self.catalog.get_layer(dataset_name)?;
        ensure!(layer.is_some(), "Layer [{}] not found in GeoServer", dataset_name);
        Ok(())
    }

    ///
    /// Go through the time step: get the page (twice when we are sent to the srs step first),
    /// then post the form with the last csrf token.
    /// The step reply is None when the body is not json.
    ///
    pub fn check_and_pass_through_timestep(&self, redirect_to: &str) -> anyhow::Result<(HttpReply, Option<UploadStepReply>)> {
        let time_step = upload_step(Some("time"));
        let srs_step = upload_step(Some("srs"));
        if redirect_to.contains(&srs_step) {
            self.client.make_request(redirect_to, None, false)?;
        } else {
            ensure!(redirect_to.contains(&time_step), "[{}] is not the time step", redirect_to);
        }
        let reply = self.client.make_request(redirect_to, None, false)?;
        let token = self.client.get_csrf_token(true)?;
        ensure!(reply.status == 200, "Unexpected status [{}] for the time step", reply.status);

        let reply = self.client.make_request(redirect_to, Some(&[("csrfmiddlewaretoken", token.as_str())]), true)?;
        let step = match reply.json() {
            Some(_) => Some(reply.step_reply()?),
            None => None,
        };
        Ok((reply, step))
    }

    pub fn complete_raster_upload(&self, file_path: &str, reply: &HttpReply) -> anyhow::Result<()> {
        self.complete_dataset_upload(file_path, reply, true)
    }

    pub fn complete_upload(&self, file_path: &str, reply: &HttpReply) -> anyhow::Result<()> {
        self.complete_dataset_upload(file_path, reply, false)
    }

    /// The save step worked and sent us to the next step
    pub fn check_save_step(&self, reply: &HttpReply) -> anyhow::Result<UploadStepReply> {
        ensure!(reply.status == 200, "Unexpected status [{}] for the save step", reply.status);
        let json = reply.json().ok_or_else(|| anyhow!("The save step did not return json"))?;
        ensure!(json.is_object(), "The save step did not return an object, got {}", json);
        let step = reply.step_reply()?;
        ensure!(step.success, "expected success but got {}", json);
        ensure!(step.redirect_to.is_some(), "No redirect_to in {}", json);
        Ok(step)
    }

    ///
    /// Go through the remaining steps of the wizard and return the page of the dataset,
    /// or the current step when the final reply has no usable url.
    ///
    pub fn finish_upload(&self, current_step: &str, dataset_name: &str, is_raster: bool, skip_srs: bool) -> anyhow::Result<String> {
        let mut current_step = current_step.to_string();
        if !is_raster {
            let (reply, step) = self.check_and_pass_through_timestep(&current_step)?;
            ensure!(reply.status == 200, "Unexpected status [{}] after the time step", reply.status);
            if let Some(step) = step.filter(|s| s.success) {
                current_step = step.redirect_to.ok_or_else(|| anyhow!("No redirect_to after the time step"))?;
            }
        }

        let reply = if !is_raster && !skip_srs {
            ensure!(current_step.contains(&upload_step(Some("srs"))), "[{}] is not the srs step", &current_step);
            // if all is good, the srs step redirects to the final page
            let final_step = current_step.replace("srs", "final");
            self.client.make_request(&final_step, None, false)?
        } else {
            let final_step = upload_step(Some("final"));
            ensure!(
                current_step.contains(&final_step),
                "current_step: {} - upload_step('final'): {}",
                &current_step,
                &final_step
            );
            self.client.get(&current_step)?
        };
        ensure!(reply.status == 200, "Unexpected status [{}] for the final step", reply.status);

        match reply.json().and_then(|j| j.get("url")).and_then(Value::as_str) {
            Some(url) => {
                let url = unquote(url).to_string();
                if url.contains(dataset_name) {
                    Ok(url)
                } else {
                    log_warn!("expected {} in URL, got {}", dataset_name, &url);
                    Ok(current_step)
                }
            }
            None => Ok(current_step),
        }
    }

    ///
    /// The page renders, then GeoServer knows the layer (caps and REST).
    /// GeoServer may take a while to publish it, a miss is only a warning.
    ///
    pub fn check_dataset_complete(&self, dataset_page: &str, original_name: &str) -> anyhow::Result<()> {
        self.check_dataset_geonode_page(dataset_page)?;

        let type_name = dataset_page.rsplit('/').next().unwrap_or(dataset_page);
        let dataset_name = type_name.split(':').nth(1).unwrap_or(original_name);

        let mut caps_found = false;
        for i in 0..self.settings.caps_attempts {
            let r = self
                .check_dataset_geoserver_caps(type_name)
                .and_then(|_| self.check_dataset_geoserver_rest(dataset_name));
            match r {
                Ok(_) => {
                    caps_found = true;
                    break;
                }
                Err(e) => log_debug!("Dataset not published yet, attempt=[{}], e=[{}]", i, e),
            }
        }
        if !caps_found {
            log_warn!("Could not recognize Dataset {} on GeoServer WMS Capa", original_name);
        }
        Ok(())
    }

    /// Reply for a dataset that cannot be imported as is, GeoNode asks for its projection
    pub fn check_invalid_projection(&self, dataset_name: &str, reply: &HttpReply) -> anyhow::Result<()> {
        log_info!("Upload reply for an invalid dataset, name=[{}], status=[{}]", dataset_name, reply.status);
        if reply.json().is_none() {
            return Ok(());
        }
        let step = reply.step_reply()?;
        ensure!(step.success, "expected success for [{}]", dataset_name);
        let redirect_to = step.redirect_to.ok_or_else(|| anyhow!("No redirect_to for [{}]", dataset_name))?;
        if redirect_to.contains("srs") {
            ensure!(redirect_to.contains(&upload_step(Some("srs"))), "[{}] is not the srs step", &redirect_to);
            let (_, html) = self.client.get_html(&redirect_to)?;
            let h2 = html.find_all("h2");
            let first = h2.first().ok_or_else(|| anyhow!("No h2 in the srs page [{}]", &redirect_to))?;
            log_debug!("Srs page, name=[{}], h2=[{}]", dataset_name, text_of(first));
        }
        Ok(())
    }

    pub fn check_upload_complete(&self, dataset_name: &str, reply: &HttpReply) -> anyhow::Result<()> {
        log_info!("Upload reply, name=[{}], status=[{}]", dataset_name, reply.status);
        if reply.json().is_none() {
            return Ok(());
        }
        let step = reply.step_reply()?;
        ensure!(step.success, "expected success for [{}]", dataset_name);
        let redirect_to = step.redirect_to.ok_or_else(|| anyhow!("No redirect_to for [{}]", dataset_name))?;
        if redirect_to.contains("final") {
            ensure!(redirect_to.contains(&upload_step(Some("final"))), "[{}] is not the final step", &redirect_to);
        }
        Ok(())
    }

    /// Any reply will do, the status is only reported
    pub fn check_upload_failed(&self, dataset_name: &str, reply: &HttpReply) -> anyhow::Result<()> {
        log_info!("Upload expected to fail, name=[{}], status=[{}]", dataset_name, reply.status);
        Ok(())
    }

    /// Upload every main file of the folder (in name order) and check each reply
    pub fn upload_folder_of_files(&self, folder: &Path, final_check: FinalCheck, mut session_ids: Option<&mut Vec<u64>>) -> anyhow::Result<()> {
        for file in main_files(folder)? {
            let base = file.with_extension("");
            let base = base.to_string_lossy();
            let reply = self.client.upload_file(&file, None)?;
            self.after_upload(&base, &reply, final_check, session_ids.as_mut().map(|ids| &mut **ids))?;
        }
        Ok(())
    }

    /// Upload the file and check the reply, check_name is the path without extension by default
    pub fn upload_file(&self, file: &Path, final_check: FinalCheck, check_name: Option<&str>, session_ids: Option<&mut Vec<u64>>) -> anyhow::Result<()> {
        let default_name = file.with_extension("");
        let check_name = match check_name {
            Some(name) => name.to_string(),
            None => default_name.to_string_lossy().to_string(),
        };
        log_info!("Upload the file, path=[{}]", file.display());
        let reply = self.client.upload_file(file, None)?;
        self.after_upload(&check_name, &reply, final_check, session_ids)
    }

    ///
    /// Poll the progress of the importer session until it is COMPLETE.
    /// While it's RUNNING, poll again, up to the attempt budget. Any other state ends the wait.
    /// Return the last progress read, None without url.
    ///
    pub fn wait_for_progress(&self, progress_url: Option<&str>) -> anyhow::Result<Option<ProgressReply>> {
        let Some(url) = progress_url.filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let mut attempt: u32 = 0;
        loop {
            let reply = self.client.get(url)?;
            if reply.json().map_or(false, Value::is_null) {
                return Ok(None);
            }
            let progress: ProgressReply = reply.parse()?;
            log_debug!("[{}] Progress, url=[{}], state=[{:?}]", attempt, url, &progress.state);

            if progress.is_running() && attempt < self.settings.progress_max_attempts {
                attempt += 1;
                thread::sleep(self.settings.progress_interval);
                continue;
            }
            return Ok(Some(progress));
        }
    }

    /// Delete every dataset of the test user, return how many were deleted
    pub fn purge_user_datasets(&self) -> anyhow::Result<usize> {
        if !self.client.is_logged_in() {
            self.client.login()?;
        }
        let api = self.api();
        let datasets = api.datasets_owned_by(self.client.user())?;
        for dataset in &datasets {
            api.delete_resource(dataset.pk)?;
        }
        log_info!("Datasets deleted, user=[{}], count=[{}]", self.client.user(), datasets.len());
        Ok(datasets.len())
    }

    fn complete_dataset_upload(&self, file_path: &str, reply: &HttpReply, is_raster: bool) -> anyhow::Result<()> {
        let dataset_name = Path::new(file_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        if reply.json().is_none() {
            return Ok(());
        }
        let step = self.check_save_step(reply)?;
        let redirect_to = step.redirect_to.unwrap_or_default();
        let dataset_page = self.finish_upload(&redirect_to, &dataset_name, is_raster, false)?;
        self.check_dataset_complete(&dataset_page, &dataset_name)
    }

    fn after_upload(&self, check_name: &str, reply: &HttpReply, final_check: FinalCheck, session_ids: Option<&mut Vec<u64>>) -> anyhow::Result<()> {
        if reply.json().is_some() {
            let step = reply.step_reply()?;
            if let (Some(ids), Some(id)) = (session_ids, step.session_id()) {
                ids.push(id);
            }
            self.wait_for_progress(step.progress.as_deref())?;
        }
        final_check(self, check_name, reply)
    }
}

impl Drop for UploadHarness {
    fn drop(&mut self) {
        self.scratch.borrow_mut().clear();

        if self.settings.geofence_enabled {
            if let Err(e) = self.catalog.delete_all_geofence_rules() {
                log_error!("Cannot delete the GeoFence rules, e=[{}]", e);
            }
        }
    }
}

fn new_geonode_client(settings: &E2eSettings) -> anyhow::Result<GeoNodeClient> {
    let client = GeoNodeClient::new(
        &settings.geonode_url,
        &settings.geonode_user,
        &settings.geonode_password,
        settings.geoserver_timeout,
    )?;
    Ok(client)
}

/// Files of the folder with a main extension, sorted by name
pub fn main_files(folder: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in fs::read_dir(folder).map_err(err_fwd!("Cannot read the folder, path=[{}]", folder.display()))? {
        let path = entry?.path();
        let ext = path.extension().map(|e| e.to_string_lossy().to_lowercase()).unwrap_or_default();
        if MAIN_EXTENSIONS.contains(&ext.as_str()) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::harness::main_files;

    #[test]
    fn main_files_of_a_folder() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.SHP", "b.dbf", "a.tif", "c.asc", "c.prj", "d.zip", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let names: Vec<String> = main_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(vec!["a.tif", "b.SHP", "c.asc", "d.zip"], names);
    }
}
