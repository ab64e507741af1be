use std::env;
use std::path::PathBuf;
use std::process::exit;

use anyhow::anyhow;

use commons_error::*;
use gn_upload_tests::{load_settings, FinalCheck, UploadHarness};
use gnconfig::properties::get_prop_value;
use gnconfig::property_name::UPLOAD_PERMISSIONS_PROPERTY;

const PARAMETER_ERROR: u16 = 10;
const CONFIGURATION_FAILED: u16 = 20;
const SET_UP_FAILED: u16 = 30;
const UPLOAD_FAILED: u16 = 110;
const SUCCESS: u16 = 0;

#[derive(Debug)]
struct Params {
    file: PathBuf,
    raster: bool,
    perms: Option<String>,
    props: Vec<(String, String)>,
}

/// --env is read by the configuration reader itself, it's only skipped here
fn parse_args(args: &[String]) -> anyhow::Result<Params> {
    let mut file = None;
    let mut raster = false;
    let mut perms = None;
    let mut props = vec![];
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--raster" => raster = true,
            "--perms" => {
                i += 1;
                perms = Some(args.get(i).ok_or_else(|| anyhow!("Missing value for --perms"))?.clone());
            }
            "--prop" => {
                i += 1;
                let prop = args.get(i).ok_or_else(|| anyhow!("Missing value for --prop"))?;
                let (key, value) = prop.split_once('=').ok_or_else(|| anyhow!("Property is not key=value, prop=[{}]", prop))?;
                props.push((key.trim().to_string(), value.to_string()));
            }
            "--env" => i += 1,
            other if other.starts_with("--") => return Err(anyhow!("Unknown option, option=[{}]", other)),
            other => file = Some(PathBuf::from(other)),
        }
        i += 1;
    }
    let file = file.ok_or_else(|| anyhow!("No file to upload"))?;
    Ok(Params { file, raster, perms, props })
}

fn upload(harness: &UploadHarness, params: &Params) -> anyhow::Result<()> {
    let final_check: FinalCheck = if params.raster {
        UploadHarness::complete_raster_upload
    } else {
        UploadHarness::complete_upload
    };

    let perms = params.perms.clone().or_else(|| get_prop_value(UPLOAD_PERMISSIONS_PROPERTY).ok());
    let reply = harness.client.upload_file(&params.file, perms.as_deref())?;
    let check_name = params.file.with_extension("");
    if reply.json().is_some() {
        let step = reply.step_reply()?;
        if let Some(id) = step.session_id() {
            println!("Importer session [{}]", id);
        }
        let progress = harness.wait_for_progress(step.progress.as_deref())?;
        println!("Progress [{:?}]", progress.map(|p| p.state));
    }
    final_check(harness, &check_name.to_string_lossy(), &reply)
}

fn success_or_err(err: anyhow::Result<()>, err_code: u16) -> u16 {
    if err.is_err() {
        err_code
    } else {
        SUCCESS
    }
}

fn display_usage() {
    println!("gn-upload-check <file> [--raster] [--perms <json>] [--prop <key=value>]... [--env <folder>]");
}

///
/// Upload one dataset through the wizard and check that GeoNode and GeoServer publish it
///
fn main() {
    println!("gn-upload-check version 0.1.0");

    let args: Vec<String> = env::args().collect();
    let Ok(params) = parse_args(&args).map_err(eprint_fwd!("Error while parsing the arguments")) else {
        display_usage();
        exit_program(PARAMETER_ERROR);
    };

    let Ok(settings) = load_settings(&params.props).map_err(eprint_fwd!("Error while reading the configuration")) else {
        exit_program(CONFIGURATION_FAILED);
    };

    let Ok(harness) = UploadHarness::set_up(settings).map_err(eprint_fwd!("Error while connecting the servers")) else {
        exit_program(SET_UP_FAILED);
    };

    let err = upload(&harness, &params).map_err(eprint_fwd!("Upload failed, file=[{}]", params.file.display()));
    let exit_code = success_or_err(err, UPLOAD_FAILED);
    // tear down before leaving, exit() skips the destructors
    drop(harness);
    exit_program(exit_code);
}

fn exit_program(code: u16) -> ! {
    println!("Terminated [{}]", code);
    exit(i32::from(code))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::parse_args;

    fn args(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn file_with_options() {
        let p = parse_args(&args(&["gn-upload-check", "--env", "/etc/gn", "relief.tif", "--raster"])).unwrap();
        assert_eq!(PathBuf::from("relief.tif"), p.file);
        assert!(p.raster);
        assert!(p.perms.is_none());

        let p = parse_args(&args(&["gn-upload-check", "roads.shp", "--perms", r#"{"users": {}}"#])).unwrap();
        assert!(!p.raster);
        assert_eq!(Some(r#"{"users": {}}"#), p.perms.as_deref());
    }

    #[test]
    fn missing_file_or_unknown_option() {
        assert!(parse_args(&args(&["gn-upload-check", "--raster"])).is_err());
        assert!(parse_args(&args(&["gn-upload-check", "a.shp", "--fast"])).is_err());
        assert!(parse_args(&args(&["gn-upload-check", "a.shp", "--perms"])).is_err());
        assert!(parse_args(&args(&["gn-upload-check", "a.shp", "--prop", "caps.attempts"])).is_err());
    }

    #[test]
    fn property_overrides() {
        let p = parse_args(&args(&[
            "gn-upload-check",
            "--prop",
            "caps.attempts=2",
            "roads.shp",
            "--prop",
            "upload.permissions={\"users\": {}}",
        ]))
        .unwrap();
        assert_eq!(
            vec![
                ("caps.attempts".to_string(), "2".to_string()),
                ("upload.permissions".to_string(), r#"{"users": {}}"#.to_string())
            ],
            p.props
        );
    }
}
