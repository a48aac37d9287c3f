//! Backend fragment templates.
//!
//! Each member renders to one fragment of HAProxy directives. The
//! template is picked by the member's source-port label so operators
//! can shape routing per public port; anything without a matching
//! `<port>.j2` file renders through `default`. A compiled-in default
//! makes the monitor usable with no template directory at all.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{Environment, UndefinedBehavior};

use crate::constants;
use crate::docker::Member;
use crate::error::{Error, Result};

/// Fragment used when no per-port template matches and the directory
/// supplies no `default.j2`.
const DEFAULT_TEMPLATE: &str = include_str!("default.j2");

/// An immutable set of fragment templates for one pass.
///
/// Sets are cheap to build and rebuilt per pass, so template edits
/// take effect on the next event without a restart.
#[derive(Debug)]
pub struct TemplateSet {
    env: Environment<'static>,
    names: Vec<String>,
    domain: String,
}

impl TemplateSet {
    /// Load `*.j2` files from `templates_dir` (keyed by file stem) and
    /// guarantee a `default` template exists.
    ///
    /// A missing directory is treated as empty, not an error; the
    /// daemon must come up before operators have written any
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the directory or a file inside it is
    /// unreadable and [`Error::TemplateSyntax`] when a template fails
    /// to parse.
    pub fn load(templates_dir: Option<&Path>, domain: impl Into<String>) -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        let mut names = Vec::new();

        if let Some(dir) = templates_dir {
            for path in template_files(dir)? {
                let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                    continue;
                };
                let source = fs::read_to_string(&path)
                    .map_err(|source| Error::io(format!("reading template {path:?}"), source))?;
                env.add_template_owned(stem.to_string(), source)
                    .map_err(|source| Error::template_syntax(&path, source))?;
                names.push(stem.to_string());
            }
        }

        if !names
            .iter()
            .any(|name| name == constants::DEFAULT_TEMPLATE_NAME)
        {
            env.add_template_owned(
                constants::DEFAULT_TEMPLATE_NAME.to_string(),
                DEFAULT_TEMPLATE.to_string(),
            )
            .map_err(|source| Error::template_syntax("<built-in>", source))?;
            names.push(constants::DEFAULT_TEMPLATE_NAME.to_string());
        }
        names.sort();

        Ok(Self {
            env,
            names,
            domain: domain.into(),
        })
    }

    /// Names of the loaded templates, sorted.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Render the backend fragment for one member.
    ///
    /// Selection: the member's source-port label value, falling back
    /// to `default`. Variables: the member's namespaced labels with
    /// the prefix stripped, then `name`, `address` and `domain`,
    /// which always win on collision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTemplate`] when neither the keyed nor
    /// the default template exists, and [`Error::Render`] when
    /// rendering fails (undefined variables are strict).
    pub fn resolve(&self, member: &Member) -> Result<String> {
        let key = member
            .template_key()
            .unwrap_or(constants::DEFAULT_TEMPLATE_NAME);
        let template = match self.env.get_template(key) {
            Ok(template) => template,
            Err(_) => self
                .env
                .get_template(constants::DEFAULT_TEMPLATE_NAME)
                .map_err(|_| Error::missing_template(key))?,
        };

        let vars = render_vars(member, &self.domain);
        template
            .render(&vars)
            .map_err(|source| Error::render(template.name(), member.name(), source))
    }
}

/// Build the variable map for one member.
fn render_vars(member: &Member, domain: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for (key, value) in member.labels() {
        if let Some(stripped) = key.strip_prefix(constants::LABEL_NAMESPACE) {
            vars.insert(stripped.to_string(), value.clone());
        }
    }
    // Structural fields override any label of the same name.
    vars.insert("name".to_string(), member.name().to_string());
    vars.insert("address".to_string(), member.address().to_string());
    vars.insert("domain".to_string(), domain.to_string());
    vars
}

/// List `*.j2` files in `dir`, sorted; a missing directory is empty.
fn template_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(Error::io(
                format!("reading template directory {dir:?}"),
                source,
            ));
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| {
            Error::io(format!("reading template directory {dir:?}"), source)
        })?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(constants::TEMPLATE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
