//! `fastapi dev` launcher

use crate::error::{FastDevError, Result};
use crate::plan::{Command, CommandPlan};

use super::Planner;

pub const DEFAULT_PORT: u16 = 8000;
const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

#[derive(Debug, Clone, Default)]
pub struct DevServerPlanner {
    /// Positional argument: an app file, or a port if it is numeric
    pub target: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
}

impl DevServerPlanner {
    /// Port and app file after interpreting the positional argument
    ///
    /// Any integer is taken as a port and must fit in a `u16`.
    fn resolve(&self) -> Result<(Option<u16>, Option<&str>)> {
        let Some(target) = self.target.as_deref() else {
            return Ok((self.port, None));
        };
        match target.parse::<i64>() {
            Ok(number) => u16::try_from(number)
                .map(|port| (Some(port), None))
                .map_err(|_| FastDevError::InvalidInput(format!("Invalid port: {}", target))),
            Err(_) => Ok((self.port, Some(target))),
        }
    }
}

impl Planner for DevServerPlanner {
    fn plan(&self) -> Result<CommandPlan> {
        let (port, file) = self.resolve()?;
        let cmd = Command::new("fastapi")
            .arg("dev")
            .args(file)
            .args(
                port.filter(|p| *p != DEFAULT_PORT)
                    .map(|p| format!("--port={}", p)),
            )
            .args(
                self.host
                    .as_deref()
                    .filter(|h| !h.is_empty() && !LOCAL_HOSTS.contains(h))
                    .map(|h| format!("--host={}", h)),
            );
        Ok(cmd.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(target: Option<&str>, port: Option<u16>, host: Option<&str>) -> String {
        DevServerPlanner {
            target: target.map(str::to_string),
            port,
            host: host.map(str::to_string),
        }
        .plan()
        .unwrap()
        .render()
    }

    #[test]
    fn test_defaults_are_omitted() {
        assert_eq!(render(None, None, None), "fastapi dev");
        assert_eq!(render(None, Some(8000), Some("")), "fastapi dev");
        assert_eq!(render(None, None, Some("127.0.0.1")), "fastapi dev");
        assert_eq!(render(None, None, Some("localhost")), "fastapi dev");
    }

    #[test]
    fn test_port_and_host() {
        assert_eq!(render(None, Some(9000), None), "fastapi dev --port=9000");
        assert_eq!(render(None, None, Some("0.0.0.0")), "fastapi dev --host=0.0.0.0");
        assert_eq!(
            render(None, Some(9000), Some("0.0.0.0")),
            "fastapi dev --port=9000 --host=0.0.0.0"
        );
    }

    #[test]
    fn test_numeric_positional_is_a_port() {
        assert_eq!(render(Some("9000"), None, None), "fastapi dev --port=9000");
        assert_eq!(render(Some("8000"), Some(9000), None), "fastapi dev");
        assert_eq!(
            render(Some("8001"), None, Some("0.0.0.0")),
            "fastapi dev --port=8001 --host=0.0.0.0"
        );
    }

    #[test]
    fn test_out_of_range_port_is_rejected() {
        for target in ["70000", "-1"] {
            let err = DevServerPlanner {
                target: Some(target.to_string()),
                ..DevServerPlanner::default()
            }
            .plan()
            .unwrap_err();
            assert!(matches!(err, FastDevError::InvalidInput(_)));
            assert_eq!(err.to_string(), format!("Invalid port: {}", target));
        }
    }

    #[test]
    fn test_file_positional() {
        assert_eq!(
            render(Some("app/main.py"), Some(9000), None),
            "fastapi dev app/main.py --port=9000"
        );
    }
}
