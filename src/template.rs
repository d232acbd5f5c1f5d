//! Command templates: how grid axis values map onto environment variables and positional arguments.

use crate::GridPoint;
use regex::{Captures, Regex};
use std::{fmt, sync::OnceLock};
use thiserror::Error;

//==============
// Errors

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("placeholder `{{{placeholder}}}` in `{text}` does not name an axis")]
    UnknownPlaceholder { placeholder: String, text: String },
}

//=================
// Invocation

/// A fully rendered external process invocation.
///
/// The environment is an overlay applied to the child process only; the harness's own environment is
/// never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.env {
            write!(f, "{k}={v} ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

//=================
// CommandTemplate

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Program, arguments and environment overlay, each of which may contain `{axis}` placeholders that are
/// substituted from a [`GridPoint`].
///
/// ```
/// use mc_sweep::{Axis, CommandTemplate, Grid};
///
/// let tmpl = CommandTemplate::new("./monte-carlo")
///     .arg("-i")
///     .arg("3000")
///     .env("OMP_SCHEDULE", "{schedule},{chunk}");
/// let grid = Grid::default()
///     .with_axis(Axis::texts("schedule", &["guided"]))
///     .with_axis(Axis::ints("chunk", [25]));
/// let point = grid.points().next().unwrap();
/// let inv = tmpl.render(&point).unwrap();
/// assert_eq!(inv.env, vec![("OMP_SCHEDULE".to_owned(), "guided,25".to_owned())]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable for the child; a later setting of the same variable wins.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.env.retain(|(k, _)| *k != key);
        self.env.push((key, value.into()));
        self
    }

    /// Placeholder names used anywhere in the template, in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let texts = std::iter::once(&self.program)
            .chain(&self.args)
            .chain(self.env.iter().map(|(_, v)| v));
        let mut names = Vec::<String>::new();
        for text in texts {
            for cap in placeholder_re().captures_iter(text) {
                let name = &cap[1];
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_owned());
                }
            }
        }
        names
    }

    /// Checks that every placeholder names one of `axes`.
    pub fn validate<'a>(&self, axes: impl IntoIterator<Item = &'a str> + Clone) -> Result<(), TemplateError> {
        for placeholder in self.placeholders() {
            if !axes.clone().into_iter().any(|a| a == placeholder) {
                return Err(TemplateError::UnknownPlaceholder {
                    text: self.to_string(),
                    placeholder,
                });
            }
        }
        Ok(())
    }

    pub fn render(&self, point: &GridPoint) -> Result<Invocation, TemplateError> {
        Ok(Invocation {
            program: substitute(&self.program, point)?,
            args: self
                .args
                .iter()
                .map(|a| substitute(a, point))
                .collect::<Result<_, _>>()?,
            env: self
                .env
                .iter()
                .map(|(k, v)| Ok((k.clone(), substitute(v, point)?)))
                .collect::<Result<_, TemplateError>>()?,
        })
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = Invocation {
            program: self.program.clone(),
            args: self.args.clone(),
            env: self.env.clone(),
        };
        fmt::Display::fmt(&shown, f)
    }
}

fn substitute(text: &str, point: &GridPoint) -> Result<String, TemplateError> {
    let mut unknown = None;
    let rendered = placeholder_re().replace_all(text, |cap: &Captures| match point.get(&cap[1]) {
        Some(value) => value.to_string(),
        None => {
            unknown.get_or_insert_with(|| cap[1].to_owned());
            String::new()
        }
    });
    match unknown {
        Some(placeholder) => Err(TemplateError::UnknownPlaceholder {
            placeholder,
            text: text.to_owned(),
        }),
        None => Ok(rendered.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Axis, Grid};

    #[test]
    fn renders_args_and_env() {
        let tmpl = CommandTemplate::new("mpirun")
            .args(["-n", "{processes}", "./hypred", "-i", "10000"])
            .env("OMP_NUM_THREADS", "{threads}");
        let grid = Grid::default()
            .with_axis(Axis::ints("threads", [2]))
            .with_axis(Axis::ints("processes", [7]));
        let point = grid.points().next().unwrap();

        let inv = tmpl.render(&point).unwrap();
        assert_eq!(inv.args, vec!["-n", "7", "./hypred", "-i", "10000"]);
        assert_eq!(inv.env, vec![("OMP_NUM_THREADS".to_owned(), "2".to_owned())]);
        assert_eq!(
            inv.to_string(),
            "OMP_NUM_THREADS=2 mpirun -n 7 ./hypred -i 10000"
        );
    }

    #[test]
    fn unknown_placeholder_is_reported() {
        let tmpl = CommandTemplate::new("./monte-carlo").args(["-i", "{iterations}"]);
        assert!(tmpl.validate(["iteration"]).is_err());
        assert!(tmpl.validate(["iterations"]).is_ok());

        let grid = Grid::default().with_axis(Axis::ints("iteration", [200]));
        let point = grid.points().next().unwrap();
        assert_eq!(
            tmpl.render(&point),
            Err(TemplateError::UnknownPlaceholder {
                placeholder: "iterations".to_owned(),
                text: "{iterations}".to_owned(),
            })
        );
    }

    #[test]
    fn later_env_setting_wins() {
        let tmpl = CommandTemplate::new("x")
            .env("OMP_SCHEDULE", "static,5")
            .env("OMP_SCHEDULE", "{schedule}");
        assert_eq!(tmpl.placeholders(), vec!["schedule"]);
    }
}
