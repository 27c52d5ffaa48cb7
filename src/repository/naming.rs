// file: src/repository/naming.rs
// description: derives filesystem-safe local directory names from repository urls
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("NON_WORD regex is valid");
}

/// Maps a repository URL to the directory it is checked out into.
///
/// For `scheme://` URLs the path (without its leading slash) is used. Anything
/// else, scp-style `git@host:owner/repo` included, is used whole. Every run of
/// non-word characters becomes a single `_`, so
/// `https://github.com/projectdiscovery/nuclei-templates` lands in
/// `projectdiscovery_nuclei_templates` and `git@github.com:a/b.git` in
/// `git_github_com_a_b_git`.
pub fn local_repo_name(repo_url: &str) -> String {
    let repo_url = repo_url.trim();
    let path = match gix::url::parse(repo_url.as_bytes().into()) {
        Ok(url) if repo_url.contains("://") => url.path.to_string(),
        _ => repo_url.to_string(),
    };

    NON_WORD
        .replace_all(path.trim_start_matches('/'), "_")
        .into_owned()
}

/// `owner/name` pair for URLs hosted on a forge with that layout.
pub fn owner_and_name(repo_url: &str) -> Option<(String, String)> {
    let url = gix::url::parse(repo_url.trim().as_bytes().into()).ok()?;
    let path = url.path.to_string();
    let mut segments = path
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty());

    let owner = segments.next()?;
    let name = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    let name = name.strip_suffix(".git").unwrap_or(name);
    Some((owner.to_string(), name.to_string()))
}
