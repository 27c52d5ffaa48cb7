// file: tests/pipeline_flow.rs
// description: end-to-end runs of the aggregation pipeline against a scripted git backend

use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;
use template_aggregator::{
    Config, GitBackend, Result, SyncMode, SyncOutcome, TemplatePipeline, local_repo_name,
};

/// Materializes a fixed file set per URL on clone and appends `pull_files`
/// on pull.
#[derive(Default)]
struct ScriptedBackend {
    clone_files: HashMap<String, Vec<(&'static str, &'static str)>>,
    pull_files: Mutex<Vec<(&'static str, &'static str)>>,
}

impl GitBackend for ScriptedBackend {
    fn clone_repo(&self, url: &str, destination: &Path) -> Result<()> {
        fs::create_dir_all(destination)?;
        for (relative, content) in self.clone_files.get(url).into_iter().flatten() {
            write(destination, relative, content);
        }
        Ok(())
    }

    fn pull(&self, repo_path: &Path) -> Result<()> {
        for (relative, content) in self.pull_files.lock().unwrap().drain(..) {
            write(repo_path, relative, content);
        }
        Ok(())
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn snapshot(dir: &Path) -> BTreeMap<String, String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            (
                e.file_name().to_string_lossy().into_owned(),
                fs::read_to_string(e.path()).unwrap(),
            )
        })
        .collect()
}

const PD: &str = "https://github.com/projectdiscovery/nuclei-templates";
const MIRROR: &str = "https://github.com/someone/nuclei-mirror";
const EXTRA: &str = "https://github.com/other/yaml-rules";
const BANNED: &str = "https://github.com/bad/nuclei-junk";

fn config(root: &Path) -> Config {
    let mut config = Config::default_config();
    config.token = "test-token".to_string();
    config.workdir = root.to_path_buf();
    config.parallel_workers = Some(2);
    config.repositories = vec![
        PD.to_string(),
        MIRROR.to_string(),
        EXTRA.to_string(),
        BANNED.to_string(),
    ];
    config.blacklist = vec![BANNED.to_string()];
    config
}

fn backend() -> ScriptedBackend {
    let critical = "id: rce\ninfo:\n  name: rce\n  severity: critical\n";
    let mut clone_files = HashMap::new();
    clone_files.insert(
        PD.to_string(),
        vec![
            ("http/cves/cve-2021-1234.yaml", "id: cve-a\ninfo:\n  severity: high\n"),
            ("http/rce.yaml", critical),
            ("nuclei_/http/tech-detect.yaml", "id: tech\ninfo:\n  severity: info\n"),
            ("nuclei_/http/mixed.yaml", "id: mixed\ninfo:\n  severity: \"low,medium\"\n"),
            ("workflows/wf.yaml", "id: wf\nworkflows: []\n"),
        ],
    );
    clone_files.insert(
        MIRROR.to_string(),
        vec![
            ("copy/rce-copy.yaml", critical),
            ("cves/cve-2021-1234.yaml", "id: cve-b\ninfo:\n  severity: medium\n"),
            ("misc/banner-grab.yaml", "id: grab\ninfo:\n  severity: low\n"),
        ],
    );
    clone_files.insert(
        EXTRA.to_string(),
        vec![("rules/banner.yml", "id: banner\ninfo:\n  severity: info\n")],
    );
    clone_files.insert(
        BANNED.to_string(),
        vec![("junk.yaml", "id: junk\n")],
    );

    ScriptedBackend {
        clone_files,
        pull_files: Mutex::new(Vec::new()),
    }
}

#[tokio::test]
async fn full_run_builds_filtered_aggregate() {
    let temp = TempDir::new().unwrap();
    let pipeline = TemplatePipeline::new(config(temp.path())).with_progress(false);

    let summary = pipeline.run(backend(), SyncMode::Clone).await.unwrap();

    assert_eq!(summary.fleet.attempted(), 3);
    assert_eq!(summary.fleet.succeeded(), 3);
    assert!(!temp.path().join(local_repo_name(BANNED)).exists());

    // rce-copy duplicates rce, so one of the pair is gone.
    assert_eq!(summary.filters.dedup.removed, 1);
    // tech-detect and mixed live under a nuclei_ directory. banner.yml and
    // banner-grab.yaml do not, even though the mirror's name contains nuclei_.
    assert_eq!(summary.filters.severity.removed, 2);

    let out = snapshot(&temp.path().join("ALL"));
    let names: Vec<&str> = out.keys().map(String::as_str).collect();
    assert_eq!(names.len(), 5);
    assert!(names.contains(&"banner-grab.yaml"));
    assert!(names.contains(&"cve-2021-1234.yaml"));
    assert!(names.contains(&"banner.yml"));
    assert!(names.contains(&"wf.yaml"));
    assert!(!names.contains(&"tech-detect.yaml"));
    assert!(!names.contains(&"mixed.yaml"));
    assert_eq!(summary.filters.aggregate.name_collisions, 1);
}

#[tokio::test]
async fn second_full_run_skips_clones_and_keeps_output_identical() {
    let temp = TempDir::new().unwrap();
    let pipeline = TemplatePipeline::new(config(temp.path())).with_progress(false);

    pipeline.run(backend(), SyncMode::Clone).await.unwrap();
    let first = snapshot(&temp.path().join("ALL"));

    let summary = pipeline.run(backend(), SyncMode::Clone).await.unwrap();
    let second = snapshot(&temp.path().join("ALL"));

    assert_eq!(summary.fleet.skipped(), 3);
    assert!(
        summary
            .fleet
            .results
            .iter()
            .all(|r| matches!(r.outcome, SyncOutcome::Skipped { .. }))
    );
    assert_eq!(first, second);
}

#[tokio::test]
async fn update_run_reports_only_new_templates() {
    let temp = TempDir::new().unwrap();
    let pipeline = TemplatePipeline::new(config(temp.path())).with_progress(false);
    pipeline.run(backend(), SyncMode::Clone).await.unwrap();

    let updating = backend();
    updating.pull_files.lock().unwrap().push((
        "http/cves/cve-2024-9999.yaml",
        "id: fresh\ninfo:\n  severity: critical\n",
    ));

    let summary = pipeline.run(updating, SyncMode::Update).await.unwrap();

    assert_eq!(summary.fleet.succeeded(), 3);
    assert_eq!(
        summary.filters.aggregate.added,
        vec!["cve-2024-9999.yaml".to_string()]
    );
}

#[tokio::test]
async fn update_without_checkouts_only_skips() {
    let temp = TempDir::new().unwrap();
    let pipeline = TemplatePipeline::new(config(temp.path())).with_progress(false);

    let summary = pipeline.run(backend(), SyncMode::Update).await.unwrap();

    assert_eq!(summary.fleet.skipped(), 3);
    assert_eq!(summary.filters.aggregate.total, 0);
}
