//! Maps Vercel deployment details to the GitHub pull request they were built from.
//!
//! The Vercel Git integration has used several metadata key spellings over
//! time, so each field is looked up through an ordered list of rules and the
//! first rule yielding a usable value wins.

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

static PULL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"refs/pull/(\d+)/merge").expect("valid pull ref pattern"));

/// The subset of `GET /v13/deployments/{id}` the relay reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDetails {
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: Map<String, Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub git_source: Option<Map<String, Value>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where a candidate value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupRule {
    /// A key of `meta`.
    Meta(&'static str),
    /// A key of `gitSource`.
    GitSource(&'static str),
    /// The PR id inside a `refs/pull/<n>/merge` ref stored under a `meta` key.
    MetaPullRef(&'static str),
    /// The PR id inside a `refs/pull/<n>/merge` ref stored under a `gitSource` key.
    GitSourcePullRef(&'static str),
}

pub const OWNER_RULES: &[LookupRule] = &[
    LookupRule::Meta("githubOrg"),
    LookupRule::Meta("github-org"),
    LookupRule::Meta("githubCommitOrg"),
    LookupRule::GitSource("org"),
];

pub const REPO_RULES: &[LookupRule] = &[
    LookupRule::Meta("githubRepo"),
    LookupRule::Meta("github-repo"),
    LookupRule::Meta("githubCommitRepo"),
    LookupRule::GitSource("repo"),
];

/// Combined `org/repo` identifiers, consulted only when owner or repo is
/// still missing after the explicit rules.
pub const REPO_PATH_RULES: &[LookupRule] = &[LookupRule::GitSource("repoId")];

pub const PR_RULES: &[LookupRule] = &[
    LookupRule::Meta("githubPrId"),
    LookupRule::Meta("github-pr-id"),
    LookupRule::Meta("githubPullRequestId"),
    LookupRule::GitSource("prId"),
    LookupRule::MetaPullRef("githubCommitRef"),
    LookupRule::GitSourcePullRef("ref"),
];

/// A fully resolved pull request coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubTarget {
    pub owner: String,
    pub repo: String,
    pub pr_number: String,
}

impl fmt::Display for GitHubTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.pr_number)
    }
}

/// Outcome of target resolution. The two unresolved variants are not
/// errors: the deployment simply has nothing to comment on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Target(GitHubTarget),
    NoRepository,
    NoPullRequest,
}

/// Strings are used as-is, numbers by their decimal form.
fn value_as_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn pull_number_from_ref(git_ref: &str) -> Option<String> {
    PULL_REF
        .captures(git_ref)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_pr_number(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// GitHub owner and repository names: ASCII alphanumerics, `.`, `-` and `_`.
/// Anything else could change the shape of the API path the comment is
/// posted to.
pub fn is_repo_name(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate != "."
        && candidate != ".."
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
}

impl DeploymentDetails {
    fn git_source_field(&self, key: &str) -> Option<&Value> {
        self.git_source.as_ref().and_then(|source| source.get(key))
    }

    /// Evaluates a single rule against these details.
    pub fn lookup(&self, rule: LookupRule) -> Option<String> {
        match rule {
            LookupRule::Meta(key) => self.meta.get(key).and_then(value_as_string),
            LookupRule::GitSource(key) => self.git_source_field(key).and_then(value_as_string),
            LookupRule::MetaPullRef(key) => self
                .meta
                .get(key)
                .and_then(value_as_string)
                .and_then(|r| pull_number_from_ref(&r)),
            LookupRule::GitSourcePullRef(key) => self
                .git_source_field(key)
                .and_then(value_as_string)
                .and_then(|r| pull_number_from_ref(&r)),
        }
    }

    /// First rule in `rules` yielding a value accepted by `accept`.
    pub fn first_match(&self, rules: &[LookupRule], accept: fn(&str) -> bool) -> Option<String> {
        rules
            .iter()
            .filter_map(|rule| self.lookup(*rule))
            .find(|value| accept(value))
    }

    /// Splits the first combined identifier into `(owner, repo)`, using its
    /// last two path segments so full URLs work too.
    fn repo_path(&self) -> Option<(String, String)> {
        REPO_PATH_RULES
            .iter()
            .filter_map(|rule| self.lookup(*rule))
            .find_map(|path| {
                let mut segments = path
                    .trim_end_matches('/')
                    .trim_end_matches(".git")
                    .rsplit('/')
                    .filter(|s| !s.is_empty());
                let repo = segments.next()?;
                let owner = segments.next()?;
                (is_repo_name(owner) && is_repo_name(repo))
                    .then(|| (owner.to_string(), repo.to_string()))
            })
    }

    /// Resolves the pull request this deployment was built from.
    pub fn resolve_target(&self) -> Resolution {
        let mut owner = self.first_match(OWNER_RULES, is_repo_name);
        let mut repo = self.first_match(REPO_RULES, is_repo_name);

        if owner.is_none() || repo.is_none() {
            if let Some((path_owner, path_repo)) = self.repo_path() {
                owner = Some(path_owner);
                repo = Some(path_repo);
            }
        }

        let (Some(owner), Some(repo)) = (owner, repo) else {
            return Resolution::NoRepository;
        };

        match self.first_match(PR_RULES, is_pr_number) {
            Some(pr_number) => Resolution::Target(GitHubTarget {
                owner,
                repo,
                pr_number,
            }),
            None => Resolution::NoPullRequest,
        }
    }
}
