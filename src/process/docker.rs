//! Container runtime command lines (docker and docker-compose).

use super::CommandLine;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

pub const DOCKER: &str = "docker";
pub const DOCKER_COMPOSE: &str = "docker-compose";
pub const COMPOSE_PROJECT_ENV: &str = "COMPOSE_PROJECT_NAME";

/// `docker-compose -f <file>... up -d [services]` under the given project name
pub fn compose_up<P: AsRef<Path>>(files: &[P], project: &str, services: &[&str]) -> CommandLine {
    let mut cmd = CommandLine::new(DOCKER_COMPOSE).env(COMPOSE_PROJECT_ENV, project);
    for file in files {
        cmd = cmd.arg("-f").arg(file.as_ref().display().to_string());
    }
    cmd.args(["up", "-d"]).args(services.iter().copied())
}

/// `docker exec [-e K=V]... <container> <argv>...`
pub fn exec<S: AsRef<str>>(container: &str, env: &[(&str, String)], argv: &[S]) -> CommandLine {
    let mut cmd = CommandLine::new(DOCKER).arg("exec");
    for (key, value) in env {
        cmd = cmd.arg("-e").arg(format!("{}={}", key, value));
    }
    cmd.arg(container).args(argv.iter().map(|a| a.as_ref().to_string()))
}

/// Run `inner` inside `container`, forwarding its env as `-e` flags
pub fn exec_in(container: &str, inner: &CommandLine) -> CommandLine {
    let env: Vec<(&str, String)> = inner.env.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
    let argv: Vec<&str> = std::iter::once(inner.program.as_str())
        .chain(inner.args.iter().map(String::as_str))
        .collect();
    exec(container, &env, &argv)
}

pub fn stop(container: &str) -> CommandLine {
    CommandLine::new(DOCKER).args(["stop", container])
}

pub fn remove(container: &str) -> CommandLine {
    CommandLine::new(DOCKER).args(["rm", container])
}

pub fn restart(container: &str) -> CommandLine {
    CommandLine::new(DOCKER).args(["restart", container])
}

pub fn logs(container: &str) -> CommandLine {
    CommandLine::new(DOCKER).args(["logs", container])
}

/// Kinds of runtime resources cleaned up per network domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Container,
    Volume,
    Image,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Container, ResourceKind::Volume, ResourceKind::Image];

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Container => "containers",
            ResourceKind::Volume => "volumes",
            ResourceKind::Image => "images",
        }
    }

    /// Listing that prints `<id> <name>` per line (volumes: just the name)
    pub fn list(&self) -> CommandLine {
        let docker = CommandLine::new(DOCKER);
        match self {
            ResourceKind::Container => docker.args(["ps", "-a", "--format", "{{.ID}} {{.Names}}"]),
            ResourceKind::Volume => docker.args(["volume", "ls", "--format", "{{.Name}}"]),
            ResourceKind::Image => docker.args(["image", "ls", "--format", "{{.ID}} {{.Repository}}"]),
        }
    }

    /// Forced removal of the given ids
    pub fn remove(&self, ids: &[String]) -> CommandLine {
        let docker = CommandLine::new(DOCKER);
        let docker = match self {
            ResourceKind::Container => docker.args(["rm", "-f"]),
            ResourceKind::Volume => docker.args(["volume", "rm", "-f"]),
            ResourceKind::Image => docker.args(["image", "rm", "-f"]),
        };
        docker.args(ids.iter().cloned())
    }
}

/// Matches resource names belonging to `domain`, i.e. containing `.<domain>`
pub fn domain_matcher(domain: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"\.{}", regex::escape(domain)))
}

/// Ids from a listing whose name matches, deduplicated, in first-seen order
pub fn matching_ids(listing: &str, matcher: &Regex) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::new();
    for line in listing.lines() {
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };
        let name = fields.next().unwrap_or(first);
        if matcher.is_match(name) && seen.insert(first.to_string()) {
            ids.push(first.to_string());
        }
    }
    ids
}
