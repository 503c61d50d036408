//! Integration tests for the `ghi` CLI.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use mockito::{Mock, ServerGuard};
use tempfile::TempDir;

const ASSET: &str = "lego_v4.17.4_linux_amd64.tar.gz";

/// Temp dirs for recipes, scratch space and install destinations.
struct TestContext {
    temp_dir: TempDir,
    bin_dir: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let bin_dir = temp_dir.path().join("bin");
        fs::create_dir_all(&bin_dir).expect("failed to create bin dir");
        fs::create_dir_all(temp_dir.path().join("scratch")).expect("failed to create scratch dir");
        Self { temp_dir, bin_dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.temp_dir.path().join(rel)
    }

    fn ghi_cmd(&self, api_url: &str) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_ghi");
        let mut cmd = Command::new(bin_path);
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("GHI_API_URL", api_url);
        cmd.env("GHI_TMPDIR", self.path("scratch"));
        cmd.env_remove("GITHUB_TOKEN");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn write_recipe(&self, body: &str) -> PathBuf {
        let path = self.path("recipe.toml");
        fs::write(&path, body).expect("failed to write recipe");
        path
    }

    fn lego_recipe(&self, dst: &Path, extra: &str) -> PathBuf {
        self.write_recipe(&format!(
            r#"
repo = "go-acme/lego"
asset_regex = 'lego_.*\.tar\.gz'
{extra}

[[move_rules]]
src_regex = "lego"
dst = "{}"
mode = "0755"
"#,
            dst.display()
        ))
    }
}

/// A tar.gz holding `lego` and `LICENSE`, like the upstream release.
fn lego_archive() -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data, mode) in [("lego", &b"#!/bin/sh\necho lego\n"[..], 0o644), ("LICENSE", &b"MIT"[..], 0o644)] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Serve release metadata and the lego archive, which must be fetched
/// `asset_hits` times. Returns (metadata mock, asset mock).
fn serve_release(server: &mut ServerGuard, asset_hits: usize) -> (Mock, Mock) {
    let url = server.url();
    let body = format!(
        r#"{{"tag_name":"v4.17.4","assets":[
            {{"name":"{ASSET}","browser_download_url":"{url}/download/{ASSET}"}},
            {{"name":"lego_v4.17.4_checksums.txt","browser_download_url":"{url}/download/checksums.txt"}}
        ]}}"#
    );
    let release = server
        .mock("GET", "/repos/go-acme/lego/releases/latest")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create();
    let asset = server
        .mock("GET", format!("/download/{ASSET}").as_str())
        .with_status(200)
        .with_body(lego_archive())
        .expect(asset_hits)
        .create();
    (release, asset)
}

fn json_line(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().last().unwrap_or_default();
    serde_json::from_str(line).unwrap_or_else(|e| panic!("not JSON ({e}): {stdout}"))
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .ghi_cmd("http://127.0.0.1:9")
        .arg("--help")
        .output()
        .expect("failed to run ghi");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("install"));
}

#[test]
fn test_host_command() {
    let ctx = TestContext::new();
    let output = ctx
        .ghi_cmd("http://127.0.0.1:9")
        .arg("host")
        .output()
        .expect("failed to run ghi");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("architectures"));
    assert!(stdout.contains(std::env::consts::ARCH));
}

#[test]
fn test_install_lego_json() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let (release, asset) = serve_release(&mut server, 1);
    let recipe = ctx.lego_recipe(&ctx.bin_dir, "");

    let output = ctx
        .ghi_cmd(&server.url())
        .args(["install", "--json"])
        .arg(&recipe)
        .output()
        .expect("failed to run ghi");

    release.assert();
    asset.assert();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = json_line(&output);
    assert_eq!(report["changed"], true);
    assert_eq!(report["asset"], ASSET);
    assert_eq!(report["tag"], "v4.17.4");

    let installed = ctx.bin_dir.join("lego");
    assert_eq!(fs::read_to_string(&installed).unwrap(), "#!/bin/sh\necho lego\n");
    assert_eq!(fs::metadata(&installed).unwrap().permissions().mode() & 0o777, 0o755);
    assert!(!ctx.bin_dir.join("LICENSE").exists());

    // Scratch space is discarded after the run.
    assert_eq!(fs::read_dir(ctx.path("scratch")).unwrap().count(), 0);
}

#[test]
fn test_version_marker_skips_download() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let (release, asset) = serve_release(&mut server, 0);
    let marker = ctx.path("lego.version");
    fs::write(&marker, "v4.17.4").unwrap();
    let recipe = ctx.lego_recipe(
        &ctx.bin_dir,
        &format!("version_file = \"{}\"", marker.display()),
    );

    let output = ctx
        .ghi_cmd(&server.url())
        .args(["install", "--json"])
        .arg(&recipe)
        .output()
        .expect("failed to run ghi");

    release.assert();
    asset.assert();
    assert!(output.status.success());
    assert_eq!(json_line(&output)["changed"], false);
    assert!(!ctx.bin_dir.join("lego").exists());
}

#[test]
fn test_version_marker_written_after_install() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let _mocks = serve_release(&mut server, 1);
    let marker = ctx.path("lego.version");
    let recipe = ctx.lego_recipe(
        &ctx.bin_dir,
        &format!("version_file = \"{}\"", marker.display()),
    );

    let output = ctx
        .ghi_cmd(&server.url())
        .args(["install", "--json"])
        .arg(&recipe)
        .output()
        .expect("failed to run ghi");

    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&marker).unwrap(), "v4.17.4");
}

#[test]
fn test_conflict_reports_failure() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let _mocks = serve_release(&mut server, 1);
    let recipe = ctx.lego_recipe(&ctx.path("missing/dir/lego"), "");

    let output = ctx
        .ghi_cmd(&server.url())
        .args(["install", "--json"])
        .arg(&recipe)
        .output()
        .expect("failed to run ghi");

    assert_eq!(output.status.code(), Some(1));
    let report = json_line(&output);
    assert_eq!(report["failed"], true);
    assert_eq!(report["kind"], "conflict");
    assert!(!ctx.path("missing").exists());
}

#[test]
fn test_invalid_repo_is_config_error() {
    let ctx = TestContext::new();
    let recipe = ctx.write_recipe("repo = \"not-a-repo\"\nasset_regex = \"x\"\n");

    let output = ctx
        .ghi_cmd("http://127.0.0.1:9")
        .args(["install", "--json"])
        .arg(&recipe)
        .output()
        .expect("failed to run ghi");

    assert_eq!(output.status.code(), Some(1));
    let report = json_line(&output);
    assert_eq!(report["kind"], "config");
    assert!(report["msg"].as_str().unwrap().contains("owner/repo"));
}

#[test]
fn test_dry_run_downloads_nothing() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let (release, asset) = serve_release(&mut server, 0);
    let recipe = ctx.lego_recipe(&ctx.bin_dir, "");

    let output = ctx
        .ghi_cmd(&server.url())
        .args(["--dry-run", "install", "--json"])
        .arg(&recipe)
        .output()
        .expect("failed to run ghi");

    release.assert();
    asset.assert();
    assert!(output.status.success());
    let report = json_line(&output);
    assert_eq!(report["changed"], false);
    assert_eq!(report["asset"], ASSET);
}

#[test]
fn test_select_prints_asset() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let _mocks = serve_release(&mut server, 1);
    let recipe = ctx.lego_recipe(&ctx.bin_dir, "");

    let output = ctx
        .ghi_cmd(&server.url())
        .arg("select")
        .arg(&recipe)
        .output()
        .expect("failed to run ghi");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some(ASSET));
    assert!(lines.next().unwrap().ends_with(&format!("/download/{ASSET}")));
}

#[test]
fn test_flags_without_recipe_file() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let _mocks = serve_release(&mut server, 1);

    let output = ctx
        .ghi_cmd(&server.url())
        .args(["select", "--repo", "go-acme/lego", "--asset-regex", r"lego_.*\.tar\.gz"])
        .output()
        .expect("failed to run ghi");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with(ASSET));
}

#[test]
fn test_missing_recipe_file() {
    let ctx = TestContext::new();
    let output = ctx
        .ghi_cmd("http://127.0.0.1:9")
        .args(["install"])
        .arg(ctx.path("nope.toml"))
        .output()
        .expect("failed to run ghi");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read recipe"));
}

#[test]
fn test_bare_asset_named_like_extract_dir() {
    let ctx = TestContext::new();
    let mut server = mockito::Server::new();
    let url = server.url();
    let _release = server
        .mock("GET", "/repos/acme/extract/releases/tags/v1.0.0")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"tag_name":"v1.0.0","assets":[{{"name":"extract","browser_download_url":"{url}/download/extract"}}]}}"#
        ))
        .create();
    let _asset = server
        .mock("GET", "/download/extract")
        .with_status(200)
        .with_body("#!/bin/sh\n")
        .create();
    let recipe = ctx.write_recipe(&format!(
        r#"
repo = "acme/extract"
tag = "v1.0.0"
asset_regex = "extract"

[[move_rules]]
src_regex = "extract"
dst = "{}"
mode = "0755"
"#,
        ctx.bin_dir.join("extract").display()
    ));

    let output = ctx
        .ghi_cmd(&server.url())
        .args(["install", "--json"])
        .arg(&recipe)
        .output()
        .expect("failed to run ghi");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));
    assert_eq!(json_line(&output)["changed"], true);
    assert_eq!(fs::read_to_string(ctx.bin_dir.join("extract")).unwrap(), "#!/bin/sh\n");
}
