// project.rs — Project kinds and the closed check-strategy set.
//
// The project-kind detector is an external collaborator: it hands the
// verifier an enumerated kind plus an optional build invocation. The
// verifier maps that onto a closed set of strategies. Adding support for a
// new ecosystem means adding a variant here, not registering a plugin.

use serde::{Deserialize, Serialize};

/// What kind of project the external detector recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    /// A compiled-language project with a build step (e.g., a Cargo crate).
    Compiled,
    /// An interpreted-language project: manifest present, no compile step.
    Interpreted,
    /// Nothing recognized — generic fallback.
    Unrecognized,
}

/// An opaque build invocation supplied by the detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCommand {
    /// Program to run (e.g., "cargo").
    pub program: String,
    /// Arguments (e.g., ["check", "--quiet"]).
    pub args: Vec<String>,
}

/// Detector output: kind plus optional build descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectProfile {
    pub kind: ProjectKind,
    pub build: Option<BuildCommand>,
}

impl ProjectProfile {
    pub fn compiled(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: ProjectKind::Compiled,
            build: Some(BuildCommand {
                program: program.into(),
                args,
            }),
        }
    }

    pub fn interpreted() -> Self {
        Self {
            kind: ProjectKind::Interpreted,
            build: None,
        }
    }

    pub fn unrecognized() -> Self {
        Self {
            kind: ProjectKind::Unrecognized,
            build: None,
        }
    }
}

/// The closed set of check strategies the verifier dispatches on.
#[derive(Debug, Clone)]
pub(crate) enum CheckStrategy {
    /// Run the detector-supplied build against a materialized shadow.
    Build(BuildCommand),
    /// No compile step; parse staged manifests instead.
    ManifestOnly,
    /// Generic fallback: skip compilation entirely.
    Generic,
}

impl CheckStrategy {
    pub(crate) fn select(profile: &ProjectProfile) -> Self {
        match (profile.kind, &profile.build) {
            (ProjectKind::Compiled, Some(command)) => CheckStrategy::Build(command.clone()),
            // Compiled but no invocation descriptor: nothing we can run.
            (ProjectKind::Compiled, None) => CheckStrategy::Generic,
            (ProjectKind::Interpreted, _) => CheckStrategy::ManifestOnly,
            (ProjectKind::Unrecognized, _) => CheckStrategy::Generic,
        }
    }
}
