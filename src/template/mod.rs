//! # Template Rendering
//!
//! Renders configuration and compose templates from a [`RenderContext`].
//!
//! ## Syntax
//!
//! ```text
//! ## a comment line, dropped from the output
//! domain: ${DOMAIN}
//! port: ${7050 + ORG_N * 1000}
//! env: $${COMPOSE_PROJECT_NAME}        # renders a literal ${...}
//! % for org in ORGS:
//!   - ${org.name}MSP
//! % endfor
//! % if 'explorer' in ORG.node_roles:
//! explorer: ${EXPLORER_PORT}
//! % else:
//! explorer: none
//! % endif
//! ```
//!
//! Statement lines start with `%` and produce no output of their own.
//! Expressions cover what the shipped templates need: attribute and index
//! access, integer `+` and `*`, string `+`, `==`, `!=`, `in`, `not in`,
//! `not` and `range(...)`. Loops bind `loop.index`, `loop.first`,
//! `loop.last` and `loop.length`.
//!
//! Any reference to a name the context does not define is an error; nothing
//! is silently rendered empty except an explicit `none`.

pub mod context;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use context::RenderContext;

use log::info;
use parser::Node;
use std::fs;
use std::path::{Path, PathBuf};

/// Template loading, parsing, evaluation and output errors
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write rendered output {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{template}:{line}: syntax error: {message}")]
    Syntax {
        template: String,
        line: usize,
        message: String,
    },
    #[error("{template}:{line}: undefined {name}")]
    Undefined {
        template: String,
        line: usize,
        name: String,
    },
    #[error("{template}:{line}: {message}")]
    Type {
        template: String,
        line: usize,
        message: String,
    },
    #[error("Cannot convert context value `{key}`: {source}")]
    Context {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A parsed template, reusable across contexts
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, TemplateError> {
        let name = name.into();
        let nodes = parser::parse_template(&name, source)?;
        Ok(Self { name, nodes })
    }

    /// Read and parse a template file
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path.display().to_string(), &source)
    }

    pub fn render(&self, context: &RenderContext) -> Result<String, TemplateError> {
        let mut scope = eval::Scope::new(&self.name, context.vars());
        let mut out = String::new();
        eval::render_nodes(&self.nodes, &mut scope, &mut out)?;
        Ok(out)
    }
}

/// Render the template at `template_path` to a string
pub fn render(template_path: &Path, context: &RenderContext) -> Result<String, TemplateError> {
    Template::load(template_path)?.render(context)
}

/// Render `src` into `target`, creating parent directories as needed
///
/// The target is only written once rendering has fully succeeded.
pub fn render_to_file(src: &Path, target: &Path, context: &RenderContext) -> Result<(), TemplateError> {
    info!("Process template {}, creating {}", src.display(), target.display());

    let rendered = render(src, context)?;

    let write_err = |source| TemplateError::Write {
        path: target.to_path_buf(),
        source,
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(target, rendered).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context() -> RenderContext {
        let mut ctx = RenderContext::new();
        ctx.insert("DOMAIN", "example.com").unwrap();
        ctx.insert("ORG_N", &1).unwrap();
        ctx.insert("ORG_NAMES", &["org1", "org2"]).unwrap();
        ctx
    }

    const COMPOSE: &str = "\
## orderer compose template
services:
  orderer${ORG_N}.${DOMAIN}:
    environment:
      - ORDERER_GENERAL_LISTENPORT=${7050 + ORG_N * 1000}
      - COMPOSE_PROJECT_NAME=$${COMPOSE_PROJECT_NAME}
% for name in ORG_NAMES:
      - PEER_${loop.index}=peer0.${name}.${DOMAIN}
% endfor
";

    #[test]
    fn test_render_compose_like_template() {
        let template = Template::parse("orderer.yaml", COMPOSE).unwrap();
        let out = template.render(&context()).unwrap();
        assert_eq!(
            out,
            "\
services:
  orderer1.example.com:
    environment:
      - ORDERER_GENERAL_LISTENPORT=8050
      - COMPOSE_PROJECT_NAME=${COMPOSE_PROJECT_NAME}
      - PEER_0=peer0.org1.example.com
      - PEER_1=peer0.org2.example.com
"
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("orderer.yaml");
        fs::write(&src, COMPOSE).unwrap();

        let first = dir.path().join("out/a/orderer.yaml");
        let second = dir.path().join("out/b/orderer.yaml");
        render_to_file(&src, &first, &context()).unwrap();
        render_to_file(&src, &second, &context()).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
        assert_eq!(render(&src, &context()).unwrap(), render(&src, &context()).unwrap());
    }

    #[test]
    fn test_missing_template_file() {
        let dir = TempDir::new().unwrap();
        let err = render_to_file(
            &dir.path().join("absent.yaml"),
            &dir.path().join("out.yaml"),
            &context(),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
        assert!(!dir.path().join("out.yaml").exists());
    }

    #[test]
    fn test_undefined_variable_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("peer.yaml");
        fs::write(&src, "ok: ${DOMAIN}\nport: ${CA_PORT}\n").unwrap();
        let target = dir.path().join("out/peer.yaml");

        let err = render_to_file(&src, &target, &context()).unwrap_err();
        match err {
            TemplateError::Undefined { name, line, .. } => {
                assert_eq!(name, "CA_PORT");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!target.exists());
    }

    #[test]
    fn test_unwritable_target() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("t.yaml");
        fs::write(&src, "x\n").unwrap();
        // A regular file where a parent directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let err = render_to_file(&src, &blocker.join("out.yaml"), &context()).unwrap_err();
        assert!(matches!(err, TemplateError::Write { .. }));
    }
}
