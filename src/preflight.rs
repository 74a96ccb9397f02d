//! Host tool checks run before provisioning

use std::path::Path;

use tracing::debug;

use localdev_common::{Error, Result};

/// A host tool and where to get it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prerequisite<'a> {
    /// Binary name or path
    pub tool: &'a Path,
    /// Install instructions shown when it is missing
    pub hint: &'static str,
}

const DOCKER_HINT: &str = "Install Docker: https://docs.docker.com/get-docker/";
const KIND_HINT: &str = "Install kind: https://kind.sigs.k8s.io/docs/user/quick-start/#installation";
const KUBECTL_HINT: &str = "Install kubectl: https://kubernetes.io/docs/tasks/tools/";

/// Tools `localdev up` shells out to
pub fn required_tools<'a>(kind: &'a Path, kubectl: &'a Path) -> Vec<Prerequisite<'a>> {
    vec![
        Prerequisite {
            tool: Path::new("docker"),
            hint: DOCKER_HINT,
        },
        Prerequisite {
            tool: kind,
            hint: KIND_HINT,
        },
        Prerequisite {
            tool: kubectl,
            hint: KUBECTL_HINT,
        },
    ]
}

/// Fail on the first tool that cannot be found
pub fn check_prerequisites(tools: &[Prerequisite<'_>]) -> Result<()> {
    for prerequisite in tools {
        match which::which(prerequisite.tool) {
            Ok(path) => debug!(
                tool = %prerequisite.tool.display(),
                path = %path.display(),
                "found"
            ),
            Err(_) => {
                return Err(Error::PrerequisiteNotFound {
                    tool: prerequisite.tool.display().to_string(),
                    hint: prerequisite.hint.to_string(),
                })
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_tools_use_configured_binaries() {
        let tools = required_tools(Path::new("/opt/kind"), Path::new("kubectl"));
        let names: Vec<&Path> = tools.iter().map(|t| t.tool).collect();
        assert_eq!(
            names,
            vec![
                Path::new("docker"),
                Path::new("/opt/kind"),
                Path::new("kubectl")
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_binary_path_is_checked_as_given() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().expect("tempdir should be created");
        let odd = dir.path().join(OsStr::from_bytes(b"kind-\xff"));

        let err = check_prerequisites(&required_tools(&odd, Path::new("kubectl"))[1..2])
            .expect_err("missing odd-named binary should fail");
        match err {
            Error::PrerequisiteNotFound { tool, .. } => {
                assert!(tool.starts_with(&dir.path().display().to_string()));
                assert_ne!(tool, "kind");
            }
            other => panic!("expected PrerequisiteNotFound, got {other:?}"),
        }
    }

    #[test]
    fn missing_tool_reports_install_hint() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let missing = dir.path().join("no-such-kind");

        let err = check_prerequisites(&[Prerequisite {
            tool: &missing,
            hint: KIND_HINT,
        }])
        .expect_err("missing tool should fail");

        match err {
            Error::PrerequisiteNotFound { tool, hint } => {
                assert_eq!(tool, missing.display().to_string());
                assert!(hint.contains("kind.sigs.k8s.io"));
            }
            other => panic!("expected PrerequisiteNotFound, got {other:?}"),
        }
    }

    #[test]
    fn empty_tool_list_passes() {
        assert!(check_prerequisites(&[]).is_ok());
    }
}
